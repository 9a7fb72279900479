//! In-process backend driven by hand.
//!
//! Nothing is watched for real: the backend records which paths it was asked
//! to watch and delivers whatever events and errors are injected into it.
//! Useful for exercising the recursive watcher without timing dependencies on
//! the operating system.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::{Backend, Capability};
use crate::watcher::error::WatchError;
use crate::watcher::event::{Event, Op};
use crate::watcher::options::WatchOptions;

/// A call made on a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Add { path: PathBuf, recursive: bool },
    Remove { path: PathBuf },
}

struct Senders {
    events: Sender<Event>,
    errors: Sender<WatchError>,
}

pub struct MemoryBackend {
    senders: Mutex<Option<Senders>>,
    watches: Mutex<BTreeSet<PathBuf>>,
    calls: Mutex<Vec<BackendCall>>,
    /// Paths whose next `add_with` fails with the stored reason.
    failures: Mutex<HashMap<PathBuf, String>>,
    native_recursion: bool,
    close_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(events: Sender<Event>, errors: Sender<WatchError>) -> Self {
        Self {
            senders: Mutex::new(Some(Senders { events, errors })),
            watches: Mutex::new(BTreeSet::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            native_recursion: false,
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Report [`Capability::NativeRecursion`].
    pub fn with_native_recursion(mut self) -> Self {
        self.native_recursion = true;
        self
    }

    /// Deliver an event as if the operating system had reported it.
    ///
    /// Returns `false` once the backend is closed or disconnected.
    pub fn inject(&self, event: Event) -> bool {
        let events = match self.senders.lock().as_ref() {
            Some(senders) => senders.events.clone(),
            None => return false,
        };
        events.send(event).is_ok()
    }

    /// Deliver an asynchronous error.
    pub fn inject_error(&self, error: WatchError) -> bool {
        let errors = match self.senders.lock().as_ref() {
            Some(senders) => senders.errors.clone(),
            None => return false,
        };
        errors.send(error).is_ok()
    }

    /// Drop the event and error senders without going through `close`, as a
    /// backend that died on its own would.
    pub fn disconnect(&self) {
        self.senders.lock().take();
    }

    /// Make the next `add_with` for `path` fail.
    pub fn fail_on(&self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.failures.lock().insert(path.into(), reason.into());
    }

    /// Every add/remove call so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// How many times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watches.lock().contains(path)
    }
}

impl Backend for MemoryBackend {
    fn add_with(&self, path: &Path, options: &WatchOptions) -> Result<(), WatchError> {
        self.calls.lock().push(BackendCall::Add {
            path: path.to_path_buf(),
            recursive: options.is_recursive(),
        });

        if let Some(reason) = self.failures.lock().remove(path) {
            return Err(WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason,
            });
        }

        self.watches.lock().insert(path.to_path_buf());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), WatchError> {
        self.calls.lock().push(BackendCall::Remove {
            path: path.to_path_buf(),
        });

        if self.watches.lock().remove(path) {
            Ok(())
        } else {
            Err(WatchError::NonExistentWatch {
                path: path.to_path_buf(),
            })
        }
    }

    fn close(&self) -> Result<(), WatchError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.senders.lock().take();
        self.watches.lock().clear();
        Ok(())
    }

    fn watch_list(&self) -> Vec<PathBuf> {
        self.watches.lock().iter().cloned().collect()
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::NativeRecursion => self.native_recursion,
            Capability::Op(op) => Op::all().contains(op),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_memory_backend_records_calls() {
        let (events, _) = unbounded();
        let (errors, _) = unbounded();
        let backend = MemoryBackend::new(events, errors);

        backend.add(Path::new("/a")).unwrap();
        backend.remove(Path::new("/a")).unwrap();
        assert!(backend.remove(Path::new("/a")).is_err());

        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Add {
                    path: PathBuf::from("/a"),
                    recursive: false
                },
                BackendCall::Remove {
                    path: PathBuf::from("/a")
                },
                BackendCall::Remove {
                    path: PathBuf::from("/a")
                },
            ]
        );
    }

    #[test]
    fn test_memory_backend_injected_failure() {
        let (events, _) = unbounded();
        let (errors, _) = unbounded();
        let backend = MemoryBackend::new(events, errors);

        backend.fail_on("/a", "permission denied");
        assert!(matches!(
            backend.add(Path::new("/a")),
            Err(WatchError::PathWatchFailed { .. })
        ));
        assert!(!backend.is_watching(Path::new("/a")));

        // Only the next add fails
        backend.add(Path::new("/a")).unwrap();
        assert!(backend.is_watching(Path::new("/a")));
    }

    #[test]
    fn test_memory_backend_close_disconnects() {
        let (events, events_rx) = unbounded();
        let (errors, errors_rx) = unbounded();
        let backend = MemoryBackend::new(events, errors);

        assert!(backend.inject(Event::create("/a/b")));
        assert_eq!(events_rx.recv().unwrap(), Event::create("/a/b"));

        backend.close().unwrap();
        assert!(!backend.inject(Event::create("/a/c")));
        assert!(events_rx.recv().is_err());
        assert!(errors_rx.recv().is_err());
        assert_eq!(backend.close_calls(), 1);
    }
}
