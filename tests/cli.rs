use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::tempdir;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("code-explainer").expect("Binary exists");
    // keep a developer's .env and log level out of the assertions
    cmd.current_dir(std::env::temp_dir()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_positional_argument_exits_with_usage() {
    cli()
        .arg("explain")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn no_subcommand_exits_with_usage() {
    cli().assert().code(1).stderr(predicate::str::contains("Usage"));
}

#[test]
fn unknown_flag_exits_with_status_one() {
    let dir = tempdir().unwrap();
    cli()
        .arg("explain")
        .arg(dir.path())
        .arg("--frobnicate")
        .assert()
        .code(1);
}

#[test]
fn help_succeeds() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("explain").and(predicate::str::contains("report")));
}

#[test]
fn explain_rejects_a_path_that_is_not_a_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("main.py");
    write(&file, "print(1)\n").unwrap();

    cli()
        .arg("explain")
        .arg(&file)
        .env("OPENROUTER_API_KEY", "k")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a valid folder"));
}

#[test]
fn report_rejects_a_missing_path() {
    cli()
        .arg("report")
        .arg("/definitely/not/a/project")
        .env("OPENROUTER_API_KEY", "k")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a valid folder"));
}

#[test]
fn render_rejects_a_directory() {
    let dir = tempdir().unwrap();
    cli()
        .arg("render")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a readable file"));
}

#[test]
fn explain_without_api_key_fails_before_any_work() {
    let project = tempdir().unwrap();
    write(project.path().join("a.py"), "print(1)\n").unwrap();
    let out = tempdir().unwrap();
    let output_dir = out.path().join("pdfs");

    cli()
        .arg("explain")
        .arg(project.path())
        .arg("--output-dir")
        .arg(&output_dir)
        .env_remove("OPENROUTER_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENROUTER_API_KEY"));

    assert!(!output_dir.exists(), "no output should be created without a key");
}
