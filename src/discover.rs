//! Recursive source-file discovery with directory exclusions and an extension
//! allow-list.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::{
    COMPLEXITY_EXCLUDED_DIRS, COMPLEXITY_EXTENSIONS, EXPLAIN_EXCLUDED_DIRS, EXPLAIN_EXTENSIONS,
};
use crate::load_config::{require_directory, ConfigError};

/// Which directories to prune and which extensions to keep.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryRules {
    pub extensions: &'static [&'static str],
    pub excluded_dirs: &'static [&'static str],
}

impl DiscoveryRules {
    pub const EXPLAIN: DiscoveryRules = DiscoveryRules {
        extensions: EXPLAIN_EXTENSIONS,
        excluded_dirs: EXPLAIN_EXCLUDED_DIRS,
    };

    pub const COMPLEXITY: DiscoveryRules = DiscoveryRules {
        extensions: COMPLEXITY_EXTENSIONS,
        excluded_dirs: COMPLEXITY_EXCLUDED_DIRS,
    };

    pub fn allows_extension(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext.as_str()))
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excluded_dirs.contains(&name))
    }
}

/// A file found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub rel_path: PathBuf,
}

/// Lower-cased extension without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
}

/// Regular files, and symlinks that resolve to one. Dangling links are skipped.
fn is_source_file(entry: &DirEntry) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    if entry.path_is_symlink() {
        if entry.path().is_file() {
            return true;
        }
        warn!(path = %entry.path().display(), "Skipping symlink that does not resolve to a file");
    }
    false
}

/// Walks `root` depth-first in lexical order, never entering excluded
/// directories, and returns files whose extension is allowed.
///
/// Symlinked files are returned; symlinked directories are not descended into.
/// The root itself is never subject to the exclusion list.
pub fn discover_files(root: &Path, rules: &DiscoveryRules) -> Result<Vec<DiscoveredFile>, ConfigError> {
    require_directory(root)?;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !rules.is_excluded_dir(entry));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !is_source_file(&entry) || !rules.allows_extension(entry.path()) {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        debug!(path = %rel_path.display(), "Discovered file");
        files.push(DiscoveredFile {
            path: entry.into_path(),
            rel_path,
        });
    }
    Ok(files)
}
