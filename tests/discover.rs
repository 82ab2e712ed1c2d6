use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use code_explainer::discover::{discover_files, DiscoveryRules};

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "x = 1\n").unwrap();
}

fn rel_paths(root: &Path, rules: &DiscoveryRules) -> Vec<PathBuf> {
    discover_files(root, rules)
        .expect("discovery should succeed")
        .into_iter()
        .map(|f| f.rel_path)
        .collect()
}

#[test]
fn excluded_directories_are_pruned_at_any_depth() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "main.py");
    touch(dir.path(), "node_modules/lib/index.js");
    touch(dir.path(), "src/app/node_modules/dep.js");
    touch(dir.path(), "src/.git/hooks/pre-commit.py");
    touch(dir.path(), "src/__pycache__/mod.py");
    touch(dir.path(), "dist/bundle.js");
    touch(dir.path(), "src/app/view.ts");

    assert_eq!(
        rel_paths(dir.path(), &DiscoveryRules::EXPLAIN),
        vec![PathBuf::from("main.py"), PathBuf::from("src/app/view.ts")]
    );
}

#[test]
fn only_allowed_extensions_are_returned() {
    let dir = tempdir().unwrap();
    for name in ["a.py", "b.JS", "c.rs", "d.md", "e.cpp", "f.c", "Makefile"] {
        touch(dir.path(), name);
    }

    assert_eq!(
        rel_paths(dir.path(), &DiscoveryRules::EXPLAIN),
        vec![PathBuf::from("a.py"), PathBuf::from("b.JS"), PathBuf::from("e.cpp")]
    );
    assert_eq!(
        rel_paths(dir.path(), &DiscoveryRules::COMPLEXITY),
        vec![
            PathBuf::from("a.py"),
            PathBuf::from("b.JS"),
            PathBuf::from("e.cpp"),
            PathBuf::from("f.c"),
        ]
    );
}

#[test]
fn complexity_pass_prunes_its_own_directories() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "venv/lib/site.py");
    touch(dir.path(), ".idea/x.js");
    touch(dir.path(), "build/gen.js");

    // build/ is only excluded from the explanation pass
    assert_eq!(rel_paths(dir.path(), &DiscoveryRules::COMPLEXITY), vec![PathBuf::from("build/gen.js")]);
    assert!(rel_paths(dir.path(), &DiscoveryRules::EXPLAIN).contains(&PathBuf::from("venv/lib/site.py")));
}

#[test]
fn order_is_lexical_and_depth_first() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "b/z.py");
    touch(dir.path(), "a.py");
    touch(dir.path(), "b/a.py");
    touch(dir.path(), "c.py");

    assert_eq!(
        rel_paths(dir.path(), &DiscoveryRules::EXPLAIN),
        vec![
            PathBuf::from("a.py"),
            PathBuf::from("b/a.py"),
            PathBuf::from("b/z.py"),
            PathBuf::from("c.py"),
        ]
    );
}

#[test]
fn root_named_like_an_excluded_dir_is_still_walked() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("build");
    touch(&root, "tool.py");

    assert_eq!(rel_paths(&root, &DiscoveryRules::EXPLAIN), vec![PathBuf::from("tool.py")]);
}

#[test]
fn empty_tree_yields_nothing() {
    let dir = tempdir().unwrap();
    assert!(rel_paths(dir.path(), &DiscoveryRules::EXPLAIN).is_empty());
}

#[cfg(unix)]
#[test]
fn symlinked_files_are_discovered_by_both_passes() {
    use code_explainer::complexity::{analyze_project, HeuristicExtractor};
    use code_explainer::config::FailurePolicy;
    use std::os::unix::fs::symlink;

    let outside = tempdir().unwrap();
    let target = outside.path().join("shared.py");
    fs::write(&target, "def shared():\n    return 1\n").unwrap();

    let dir = tempdir().unwrap();
    touch(dir.path(), "plain.py");
    symlink(&target, dir.path().join("linked.py")).unwrap();
    symlink(outside.path().join("gone.py"), dir.path().join("dangling.py")).unwrap();

    assert_eq!(
        rel_paths(dir.path(), &DiscoveryRules::EXPLAIN),
        vec![PathBuf::from("linked.py"), PathBuf::from("plain.py")]
    );

    let outcome = analyze_project(dir.path(), &HeuristicExtractor, FailurePolicy::FailFast).unwrap();
    assert_eq!(outcome.files_analyzed, 2);
    assert!(outcome.functions.iter().any(|f| f.name == "shared"));
}
