//! Recursive watcher over a non-recursive backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;

use super::backend::{Backend, Capability, NotifyBackend};
use super::error::WatchError;
use super::event::Event;
use super::options::{WatchOptions, split_recursive};
use super::pipeline::Pipeline;
use super::registry::WatchRegistry;
use super::walk::WalkOrigin;

/// State shared between the watcher handle and the pipeline thread.
pub(super) struct Shared<B> {
    pub(super) backend: B,
    pub(super) registry: Mutex<WatchRegistry>,
    /// Disconnects when shutdown is raised. Nothing is ever sent on it.
    pub(super) done: Receiver<()>,
}

/// The adapter's own senders for the public channels.
struct Outputs {
    events: Sender<Event>,
    /// Only held so the error channel disconnects on close and not before.
    _errors: Sender<WatchError>,
}

/// Watches whole directory trees on top of a backend that only watches
/// single paths.
///
/// Adding `/some/dir/...` watches `dir` and everything below it, including
/// directories created later. With [`WatchOptions::send_create`] every entry
/// that already exists below the root is reported as a `CREATE`, so a
/// consumer sees a consistent snapshot followed by live changes.
///
/// Events and errors are read from [`events`](Self::events) and
/// [`errors`](Self::errors). Both channels are bounded; a consumer that stops
/// reading stalls the watcher rather than losing events.
///
/// # Example
///
/// ```no_run
/// use treewatch::{RecursiveWatcher, WatchOptions};
///
/// let watcher = RecursiveWatcher::with_capacity(64)?;
/// watcher.add_with("/tmp/project/...", WatchOptions::new().send_create(true))?;
///
/// for event in watcher.events().iter().take(10) {
///     println!("{event}");
/// }
/// watcher.close()?;
/// # Ok::<(), treewatch::WatchError>(())
/// ```
pub struct RecursiveWatcher<B: Backend + 'static = NotifyBackend> {
    shared: Arc<Shared<B>>,
    events: Receiver<Event>,
    errors: Receiver<WatchError>,
    /// `None` once closed.
    outputs: Mutex<Option<Outputs>>,
    /// Dropping the sender raises shutdown. The lock serialises check-and-raise.
    done: Mutex<Option<Sender<()>>>,
    /// Disconnects once the pipeline thread has stopped.
    done_resp: Receiver<()>,
    pipeline: Mutex<Option<JoinHandle<()>>>,
}

impl RecursiveWatcher<NotifyBackend> {
    /// Watcher over the platform's native facility with unbuffered channels.
    pub fn new() -> Result<Self, WatchError> {
        Self::with_capacity(0)
    }

    /// Watcher over the platform's native facility whose public channels
    /// buffer up to `capacity` items.
    pub fn with_capacity(capacity: usize) -> Result<Self, WatchError> {
        Self::with_backend(capacity, NotifyBackend::new)
    }
}

impl<B: Backend + 'static> RecursiveWatcher<B> {
    /// Watcher over a custom backend.
    ///
    /// `factory` receives the senders the backend must report raw events and
    /// errors on. Those channels are unbounded; `capacity` applies to the
    /// public channels (`0` makes them rendezvous channels).
    pub fn with_backend<F>(capacity: usize, factory: F) -> Result<Self, WatchError>
    where
        F: FnOnce(Sender<Event>, Sender<WatchError>) -> Result<B, WatchError>,
    {
        let (raw_events_tx, raw_events) = unbounded();
        let (raw_errors_tx, raw_errors) = unbounded();
        let backend = factory(raw_events_tx, raw_errors_tx)?;

        let (events_tx, events) = bounded(capacity);
        let (errors_tx, errors) = bounded(capacity);
        let (done_tx, done_rx) = bounded::<()>(0);
        let (ack_tx, done_resp) = bounded::<()>(0);

        let shared = Arc::new(Shared {
            backend,
            registry: Mutex::new(WatchRegistry::new()),
            done: done_rx,
        });

        let pipeline = Pipeline {
            shared: Arc::clone(&shared),
            raw_events,
            raw_errors,
            events: events_tx.clone(),
            errors: errors_tx.clone(),
            ack: ack_tx,
        };

        let handle = match thread::Builder::new()
            .name("treewatch-pipeline".to_string())
            .spawn(move || pipeline.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                let _ = shared.backend.close();
                return Err(WatchError::InitFailed {
                    reason: format!("failed to start event pipeline: {e}"),
                });
            }
        };

        Ok(Self {
            shared,
            events,
            errors,
            outputs: Mutex::new(Some(Outputs {
                events: events_tx,
                _errors: errors_tx,
            })),
            done: Mutex::new(Some(done_tx)),
            done_resp,
            pipeline: Mutex::new(Some(handle)),
        })
    }

    /// Channel of file system events, including synthetic creations.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Channel of asynchronous errors reported by the backend or raised while
    /// extending a recursive watch.
    pub fn errors(&self) -> &Receiver<WatchError> {
        &self.errors
    }

    /// The backend this watcher drives.
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// Watch `path` with default options. See [`add_with`](Self::add_with).
    pub fn add(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        self.add_with(path, WatchOptions::default())
    }

    /// Watch `path`.
    ///
    /// A trailing `/...` watches the directory and its whole subtree. If the
    /// walk over an existing tree fails part way, the error is returned and
    /// the watches installed before the failure are kept.
    ///
    /// With `send_create`, this call blocks while the event channel is full.
    pub fn add_with(&self, path: impl AsRef<Path>, options: WatchOptions) -> Result<(), WatchError> {
        let events = self.event_sender()?;
        let (root, recurse) = split_recursive(path.as_ref());
        let options = options.with_recurse(recurse);

        self.shared
            .registry
            .lock()
            .register(root.clone(), options.clone());

        if !recurse {
            self.shared.backend.add_with(&root, &options)?;
            crate::debug_event!("watcher", "watching", "{}", root.display());
            return Ok(());
        }

        // A native recursive watch goes live before the tree is reported
        if self.shared.backend.supports(Capability::NativeRecursion) {
            self.shared.backend.add_with(&root, &options)?;
        }
        self.shared
            .install_tree(&root, &options, WalkOrigin::Root, &events)?;

        crate::log_event!("watcher", "watching", "{}/...", root.display());
        Ok(())
    }

    /// Stop watching `path`.
    ///
    /// `path` must carry `/...` only if it was added with it. Removing a
    /// recursive watch walks the tree again and removes every directory's
    /// watch.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        if self.shared.is_closed() {
            return Err(WatchError::Closed);
        }
        let (root, recurse) = split_recursive(path.as_ref());

        let options = {
            let mut registry = self.shared.registry.lock();
            let options = registry.resolve(&root)?.clone();
            if recurse && !options.is_recursive() {
                return Err(WatchError::RecursionMismatch { path: root });
            }
            registry.unregister(&root)?;
            options
        };

        if options.is_recursive() && !self.shared.backend.supports(Capability::NativeRecursion) {
            self.shared.remove_tree(&root)?;
        } else {
            self.shared.backend.remove(&root)?;
        }

        crate::debug_event!("watcher", "removed", "{}", root.display());
        Ok(())
    }

    /// Paths the backend is currently watching.
    pub fn watch_list(&self) -> Vec<PathBuf> {
        self.shared.backend.watch_list()
    }

    /// Roots added through this watcher, sorted.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.shared.registry.lock().roots()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.shared.backend.supports(capability)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop the watcher.
    ///
    /// Waits for the pipeline thread to stop, then disconnects the public
    /// channels, then closes the backend and returns its result. Only the
    /// first call does anything; later and concurrent calls return `Ok(())`
    /// immediately.
    pub fn close(&self) -> Result<(), WatchError> {
        {
            let mut done = self.done.lock();
            if done.take().is_none() {
                return Ok(());
            }
        }

        // Never sent on; returns once the pipeline drops its end.
        let _ = self.done_resp.recv();
        if let Some(handle) = self.pipeline.lock().take() {
            if handle.join().is_err() {
                tracing::error!("[watcher] event pipeline panicked");
            }
        }

        self.outputs.lock().take();
        crate::log_event!("watcher", "closed");

        self.shared.backend.close()
    }

    fn event_sender(&self) -> Result<Sender<Event>, WatchError> {
        self.outputs
            .lock()
            .as_ref()
            .map(|outputs| outputs.events.clone())
            .ok_or(WatchError::Closed)
    }
}

impl<B: Backend + 'static> Drop for RecursiveWatcher<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("[watcher] close on drop failed: {e}");
        }
    }
}
