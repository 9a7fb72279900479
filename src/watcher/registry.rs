//! Registry of watched roots and the options they were added with.
//!
//! Events arrive for arbitrary paths below a root, so lookups resolve a path
//! to its most specific registered ancestor rather than requiring an exact
//! match.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::WatchError;
use super::options::WatchOptions;

/// Root path -> options for every watch established through the adapter.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    roots: HashMap<PathBuf, WatchOptions>,
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the options for `root`.
    pub fn register(&mut self, root: PathBuf, options: WatchOptions) {
        self.roots.insert(root, options);
    }

    /// Remove `root`, returning the options it was registered with.
    pub fn unregister(&mut self, root: &Path) -> Result<WatchOptions, WatchError> {
        self.roots
            .remove(root)
            .ok_or_else(|| WatchError::NonExistentWatch {
                path: root.to_path_buf(),
            })
    }

    /// Options of the most specific registered ancestor of `path`.
    ///
    /// A path counts as its own ancestor. Ancestry is component-wise, so
    /// `/a` is not an ancestor of `/ab`. Walking `path.ancestors()` from the
    /// leaf upwards makes the first hit the longest match.
    pub fn resolve(&self, path: &Path) -> Result<&WatchOptions, WatchError> {
        path.ancestors()
            .find_map(|ancestor| self.roots.get(ancestor))
            .ok_or_else(|| WatchError::NonExistentWatch {
                path: path.to_path_buf(),
            })
    }

    /// Check if `root` is registered exactly.
    pub fn contains(&self, root: &Path) -> bool {
        self.roots.contains_key(root)
    }

    /// All registered roots, sorted.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.roots.keys().cloned().collect();
        roots.sort();
        roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
