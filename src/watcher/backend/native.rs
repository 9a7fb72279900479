//! Backend over the platform watcher picked by `notify`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Sender;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::{Backend, Capability};
use crate::watcher::error::WatchError;
use crate::watcher::event::{Event, Op};
use crate::watcher::options::WatchOptions;

/// Non-recursive watches through `notify::RecommendedWatcher`.
///
/// The handler runs on notify's own thread, which also services watch and
/// unwatch requests, so the senders given to [`NotifyBackend::new`] must not
/// block (the recursive watcher hands it unbounded channels).
pub struct NotifyBackend {
    /// `None` once closed. Dropping the watcher drops the handler and with it
    /// the event and error senders.
    watcher: Mutex<Option<RecommendedWatcher>>,
    /// Paths with an active watch. Shared with the handler, which forgets
    /// paths reported as removed.
    watches: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl NotifyBackend {
    pub fn new(events: Sender<Event>, errors: Sender<WatchError>) -> Result<Self, WatchError> {
        let watches = Arc::new(Mutex::new(BTreeSet::new()));
        let handler_watches = Arc::clone(&watches);

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in translate(event) {
                        if event.has(Op::REMOVE) {
                            handler_watches.lock().remove(&event.path);
                        }
                        if events.send(event).is_err() {
                            // Receiver gone, the watcher is shutting down
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = errors.send(WatchError::from(e));
                }
            }
        })
        .map_err(|e| WatchError::InitFailed {
            reason: e.to_string(),
        })?;

        Ok(Self {
            watcher: Mutex::new(Some(watcher)),
            watches,
        })
    }
}

impl Backend for NotifyBackend {
    fn add_with(&self, path: &Path, options: &WatchOptions) -> Result<(), WatchError> {
        let mode = if options.is_recursive() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        let mut guard = self.watcher.lock();
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;
        watcher.watch(path, mode)?;
        self.watches.lock().insert(path.to_path_buf());

        crate::debug_event!("notify", "watching", "{}", path.display());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), WatchError> {
        let mut guard = self.watcher.lock();
        let watcher = guard.as_mut().ok_or(WatchError::Closed)?;
        watcher.unwatch(path)?;
        self.watches.lock().remove(path);

        crate::debug_event!("notify", "unwatched", "{}", path.display());
        Ok(())
    }

    fn close(&self) -> Result<(), WatchError> {
        if self.watcher.lock().take().is_some() {
            self.watches.lock().clear();
            crate::debug_event!("notify", "closed");
        }
        Ok(())
    }

    fn watch_list(&self) -> Vec<PathBuf> {
        self.watches.lock().iter().cloned().collect()
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::NativeRecursion => false,
            Capability::Op(op) => Op::all().contains(op),
        }
    }
}

/// Map a notify event onto one [`Event`] per affected path.
///
/// A rename reports the old name as `RENAME` and the new one as `CREATE`.
/// Combined rename notifications repeat what their from/to halves already
/// reported and are skipped.
fn translate(event: notify::Event) -> Vec<Event> {
    let op = match event.kind {
        EventKind::Create(_) => Op::CREATE,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Op::CREATE,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => Op::RENAME,
        EventKind::Modify(ModifyKind::Metadata(_)) => Op::CHMOD,
        EventKind::Modify(_) => Op::WRITE,
        EventKind::Remove(_) => Op::REMOVE,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| Event::new(path, op))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    fn notify_event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_translate_create_and_remove() {
        let events = translate(notify_event(
            EventKind::Create(CreateKind::Folder),
            &["/tmp/x/d"],
        ));
        assert_eq!(events, vec![Event::create("/tmp/x/d")]);

        let events = translate(notify_event(
            EventKind::Remove(RemoveKind::File),
            &["/tmp/x/f"],
        ));
        assert_eq!(events, vec![Event::new("/tmp/x/f", Op::REMOVE)]);
    }

    #[test]
    fn test_translate_modify() {
        let events = translate(notify_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/tmp/x/f"],
        ));
        assert_eq!(events[0].op, Op::WRITE);

        let events = translate(notify_event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/tmp/x/f"],
        ));
        assert_eq!(events[0].op, Op::CHMOD);
    }

    #[test]
    fn test_translate_rename() {
        let from = translate(notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/tmp/x/old"],
        ));
        assert_eq!(from, vec![Event::new("/tmp/x/old", Op::RENAME)]);

        let to = translate(notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/tmp/x/new"],
        ));
        assert_eq!(to, vec![Event::create("/tmp/x/new")]);

        let both = translate(notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/tmp/x/old", "/tmp/x/new"],
        ));
        assert!(both.is_empty());
    }

    #[test]
    fn test_translate_drops_access() {
        let events = translate(notify_event(
            EventKind::Access(AccessKind::Read),
            &["/tmp/x/f"],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn test_capabilities() {
        let (events, _) = crossbeam_channel::unbounded();
        let (errors, _) = crossbeam_channel::unbounded();
        let backend = NotifyBackend::new(events, errors).unwrap();

        assert!(!backend.supports(Capability::NativeRecursion));
        assert!(backend.supports(Capability::Op(Op::CREATE | Op::RENAME)));
        backend.close().unwrap();
    }

    #[test]
    fn test_closed_backend_rejects_add() {
        let dir = tempfile::TempDir::new().unwrap();
        let (events, _) = crossbeam_channel::unbounded();
        let (errors, _) = crossbeam_channel::unbounded();
        let backend = NotifyBackend::new(events, errors).unwrap();

        backend.add(dir.path()).unwrap();
        assert_eq!(backend.watch_list(), vec![dir.path().to_path_buf()]);

        backend.close().unwrap();
        backend.close().unwrap();
        assert!(backend.watch_list().is_empty());
        assert!(matches!(backend.add(dir.path()), Err(WatchError::Closed)));
    }
}
