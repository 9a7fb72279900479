//! Single-path watch providers.
//!
//! A backend watches individual paths and reports what happens to them on two
//! channels handed to it at construction. It knows nothing about trees; the
//! [`RecursiveWatcher`](super::RecursiveWatcher) builds recursion on top.

mod memory;
mod native;

use std::path::{Path, PathBuf};

use super::error::WatchError;
use super::event::Op;
use super::options::WatchOptions;

pub use memory::{BackendCall, MemoryBackend};
pub use native::NotifyBackend;

/// Features a backend may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A single watch covers a whole directory tree, so per-directory
    /// watches are not needed.
    NativeRecursion,
    /// The backend can report events carrying this operation.
    Op(Op),
}

/// Trait for non-recursive watch providers.
///
/// Methods take `&self` so a backend can be shared between the caller and
/// the event pipeline thread.
pub trait Backend: Send + Sync {
    /// Watch `path` with default options.
    fn add(&self, path: &Path) -> Result<(), WatchError> {
        self.add_with(path, &WatchOptions::default())
    }

    /// Watch `path`. Recursive options are only passed when the backend
    /// reports [`Capability::NativeRecursion`].
    fn add_with(&self, path: &Path, options: &WatchOptions) -> Result<(), WatchError>;

    /// Stop watching `path`.
    fn remove(&self, path: &Path) -> Result<(), WatchError>;

    /// Release all resources. Must disconnect the event and error senders the
    /// backend was created with. Calling it twice is not an error.
    fn close(&self) -> Result<(), WatchError>;

    /// Paths currently watched.
    fn watch_list(&self) -> Vec<PathBuf>;

    fn supports(&self, capability: Capability) -> bool;
}
