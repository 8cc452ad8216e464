use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// True when `path` is a regular file with at least one execute bit set.
/// Any metadata failure counts as "not executable".
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Looks `name` up in each directory of a PATH-style list, in order.
pub fn find_in_path(name: &str, path_var: Option<&str>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Every executable name in the search path that starts with `prefix`,
/// sorted and without duplicates. Unreadable directories are skipped.
pub fn search_executables(prefix: &str, path_var: Option<&str>) -> Vec<String> {
    let Some(path_var) = path_var else {
        return Vec::new();
    };

    let mut names = BTreeSet::new();
    for dir in env::split_paths(path_var) {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with(prefix) && is_executable(&entry.path()) {
                names.insert(name.to_string());
            }
        }
    }
    names.into_iter().collect()
}
