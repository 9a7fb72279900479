//! Watch options and the `/...` recursion marker.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Final path component that requests a recursive watch (`/tmp/x/...`).
pub const RECURSIVE_MARKER: &str = "...";

/// Options a watch was established with.
///
/// Built by the caller with the builder methods; the recursion flag is never
/// set directly but derived from the [`RECURSIVE_MARKER`] in the added path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    recurse: bool,
    send_create: bool,
    flags: BTreeMap<String, String>,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit synthetic `CREATE` events for entries that already exist when a
    /// recursive watch is established or extended.
    pub fn send_create(mut self, enabled: bool) -> Self {
        self.send_create = enabled;
        self
    }

    /// Attach a backend-specific flag. The recursive watcher never interprets
    /// these; they are handed to the backend untouched.
    pub fn backend_flag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(key.into(), value.into());
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recurse
    }

    pub fn sends_create(&self) -> bool {
        self.send_create
    }

    /// Look up a backend-specific flag.
    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub(crate) fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Copy handed to a backend for a single, non-recursive path.
    pub fn for_backend(&self) -> Self {
        self.clone().with_recurse(false)
    }
}

/// Lexically clean a path: drop `.` components and trailing separators and
/// fold `name/..` pairs. An empty result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Split the recursion marker off `path`.
///
/// Returns the cleaned root and whether the marker was present.
pub fn split_recursive(path: &Path) -> (PathBuf, bool) {
    let cleaned = clean_path(path);
    if cleaned.file_name() != Some(OsStr::new(RECURSIVE_MARKER)) {
        return (cleaned, false);
    }

    let root = cleaned
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    (root, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_recursive_marker() {
        assert_eq!(
            split_recursive(Path::new("/tmp/x/...")),
            (PathBuf::from("/tmp/x"), true)
        );
        assert_eq!(
            split_recursive(Path::new("/tmp/x")),
            (PathBuf::from("/tmp/x"), false)
        );
        assert_eq!(split_recursive(Path::new("...")), (PathBuf::from("."), true));
        assert_eq!(split_recursive(Path::new("/...")), (PathBuf::from("/"), true));
    }

    #[test]
    fn test_split_recursive_cleans() {
        assert_eq!(
            split_recursive(Path::new("/tmp/./x/")),
            (PathBuf::from("/tmp/x"), false)
        );
        assert_eq!(
            split_recursive(Path::new("/tmp/y/../x/.../")),
            (PathBuf::from("/tmp/x"), true)
        );
    }

    #[test]
    fn test_clean_path_parent_dirs() {
        assert_eq!(clean_path(Path::new("a/b/../c")), PathBuf::from("a/c"));
        assert_eq!(clean_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(clean_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(clean_path(Path::new("")), PathBuf::from("."));
    }

    #[test]
    fn test_options_builder() {
        let opts = WatchOptions::new()
            .send_create(true)
            .backend_flag("buffer", "4096");
        assert!(opts.sends_create());
        assert!(!opts.is_recursive());
        assert_eq!(opts.flag("buffer"), Some("4096"));
        assert_eq!(opts.flag("missing"), None);
    }

    #[test]
    fn test_for_backend_clears_recursion() {
        let opts = WatchOptions::new().send_create(true).with_recurse(true);
        let backend = opts.for_backend();
        assert!(!backend.is_recursive());
        assert!(backend.sends_create());
        assert!(opts.is_recursive());
    }
}
