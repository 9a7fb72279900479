//! Tree walks that install and tear down per-directory watches.

use std::cmp::Ordering;
use std::path::Path;

use crossbeam_channel::{Sender, TryRecvError, select};
use walkdir::{DirEntry, WalkDir};

use super::backend::{Backend, Capability};
use super::error::WatchError;
use super::event::Event;
use super::options::WatchOptions;
use super::recursive::Shared;

/// What started a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WalkOrigin {
    /// A root named by the caller of `add_with`. A root that is a plain file
    /// gets a watch of its own.
    Root,
    /// A path the pipeline saw being created below a recursive root.
    Discovered,
}

/// Pre-order walk, files before subdirectories, each group by name.
///
/// `walkdir` lists a directory as soon as it yields it, so this is only fit
/// for tearing watches down. Installing uses [`children`] one level at a time.
fn walk(root: &Path) -> walkdir::IntoIter {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by(files_first)
        .into_iter()
}

/// Entries directly inside `dir`, files before subdirectories.
fn children(dir: &Path) -> Result<Vec<DirEntry>, walkdir::Error> {
    WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .max_depth(1)
        .sort_by(files_first)
        .into_iter()
        .collect()
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

impl<B: Backend> Shared<B> {
    /// True once shutdown has been raised.
    pub(super) fn is_closed(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Send `event`, blocking while the consumer is not receiving.
    ///
    /// Returns `false` without sending once the watcher is closed.
    pub(super) fn send_event(&self, events: &Sender<Event>, event: Event) -> bool {
        if self.is_closed() {
            return false;
        }
        select! {
            recv(self.done) -> _ => false,
            send(events, event) -> res => res.is_ok(),
        }
    }

    /// Error counterpart of [`send_event`](Self::send_event).
    pub(super) fn send_error(&self, errors: &Sender<WatchError>, error: WatchError) -> bool {
        if self.is_closed() {
            return false;
        }
        select! {
            recv(self.done) -> _ => false,
            send(errors, error) -> res => res.is_ok(),
        }
    }

    /// Watch every directory below `root` and, if requested, report every
    /// entry below it as created.
    ///
    /// Each directory is announced, then watched, then listed. Anything
    /// created inside it after the listing is seen by the new watch, so no
    /// entry falls between the two. `root` itself is never reported. On error
    /// the walk stops; watches installed so far stay in place.
    ///
    /// With native recursion the caller installs the root watch first and
    /// this only reports what already exists.
    pub(super) fn install_tree(
        &self,
        root: &Path,
        options: &WatchOptions,
        origin: WalkOrigin,
        events: &Sender<Event>,
    ) -> Result<(), WatchError> {
        let native = self.backend.supports(Capability::NativeRecursion);
        if native && !options.sends_create() {
            return Ok(());
        }

        let Some(top) = WalkDir::new(root).max_depth(0).into_iter().next() else {
            return Ok(());
        };
        let top = top?;

        let walker = TreeInstall {
            shared: self,
            options,
            backend_options: options.for_backend(),
            native,
            events,
        };

        if top.file_type().is_dir() {
            walker.directory(root, false)
        } else if !native && origin == WalkOrigin::Root {
            walker.watch(root)
        } else {
            Ok(())
        }
    }

    /// Remove the watch on every directory below `root`, `root` included.
    pub(super) fn remove_tree(&self, root: &Path) -> Result<(), WatchError> {
        for entry in walk(root) {
            let entry = entry?;
            if entry.file_type().is_dir() || entry.depth() == 0 {
                self.backend.remove(entry.path())?;
            }
        }
        Ok(())
    }
}

/// One `install_tree` run.
struct TreeInstall<'a, B> {
    shared: &'a Shared<B>,
    options: &'a WatchOptions,
    backend_options: WatchOptions,
    native: bool,
    events: &'a Sender<Event>,
}

impl<B: Backend> TreeInstall<'_, B> {
    fn announce(&self, path: &Path) -> Result<(), WatchError> {
        if !self.options.sends_create() {
            return Ok(());
        }
        if self.shared.send_event(self.events, Event::create(path)) {
            Ok(())
        } else {
            Err(WatchError::Closed)
        }
    }

    fn watch(&self, path: &Path) -> Result<(), WatchError> {
        if self.native {
            return Ok(());
        }
        self.shared.backend.add_with(path, &self.backend_options)
    }

    fn directory(&self, dir: &Path, report: bool) -> Result<(), WatchError> {
        if report {
            self.announce(dir)?;
        }
        self.watch(dir)?;

        for entry in children(dir)? {
            if entry.file_type().is_dir() {
                self.directory(entry.path(), true)?;
            } else {
                self.announce(entry.path())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f"), "").unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("d/g"), "").unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        dir
    }

    #[test]
    fn test_walk_files_before_directories() {
        let dir = sample_tree();
        let order: Vec<PathBuf> = walk(dir.path())
            .map(|entry| entry.unwrap().into_path())
            .collect();

        assert_eq!(
            order,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("a"),
                dir.path().join("f"),
                dir.path().join("d"),
                dir.path().join("d/g"),
            ]
        );
    }

    #[test]
    fn test_children_lists_one_level() {
        let dir = sample_tree();
        let names: Vec<PathBuf> = children(dir.path())
            .unwrap()
            .into_iter()
            .map(|entry| entry.into_path())
            .collect();

        assert_eq!(
            names,
            vec![
                dir.path().join("a"),
                dir.path().join("f"),
                dir.path().join("d"),
            ]
        );
    }

    #[test]
    fn test_walk_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let mut entries = walk(&dir.path().join("missing"));
        assert!(entries.next().unwrap().is_err());
    }
}
