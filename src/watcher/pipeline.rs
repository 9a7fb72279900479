//! Background thread between the backend and the public channels.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, select};

use super::backend::Backend;
use super::error::WatchError;
use super::event::{Event, Op};
use super::recursive::Shared;
use super::walk::WalkOrigin;

/// Forwards backend events and errors, extending recursive watches to
/// directories as they appear.
///
/// Owns clones of both public senders. They are dropped before `ack`, so by
/// the time the shutdown coordinator sees the acknowledgment this thread no
/// longer touches any channel.
pub(super) struct Pipeline<B> {
    pub(super) shared: Arc<Shared<B>>,
    pub(super) raw_events: Receiver<Event>,
    pub(super) raw_errors: Receiver<WatchError>,
    pub(super) events: Sender<Event>,
    pub(super) errors: Sender<WatchError>,
    /// Dropped on exit; never sent on.
    pub(super) ack: Sender<()>,
}

impl<B: Backend> Pipeline<B> {
    pub(super) fn run(self) {
        crate::debug_event!("pipeline", "started");

        loop {
            select! {
                recv(self.shared.done) -> _ => {
                    crate::debug_event!("pipeline", "shutdown requested");
                    break;
                }
                recv(self.raw_events) -> msg => match msg {
                    Ok(event) => self.handle_event(event),
                    Err(_) => {
                        crate::debug_event!("pipeline", "backend event channel closed");
                        break;
                    }
                },
                recv(self.raw_errors) -> msg => match msg {
                    Ok(error) => {
                        self.shared.send_error(&self.errors, error);
                    }
                    Err(_) => {
                        crate::debug_event!("pipeline", "backend error channel closed");
                        break;
                    }
                },
            }
        }

        let Pipeline {
            events,
            errors,
            ack,
            ..
        } = self;
        drop(events);
        drop(errors);
        drop(ack);
    }

    /// Forward `event`; for a creation under a recursive root, watch the new
    /// subtree too.
    fn handle_event(&self, event: Event) {
        let created = event.has(Op::CREATE).then(|| event.path.clone());
        if !self.shared.send_event(&self.events, event) {
            return;
        }
        let Some(path) = created else {
            return;
        };

        let options = match self.shared.registry.lock().resolve(&path) {
            Ok(options) if options.is_recursive() => options.clone(),
            _ => return,
        };

        crate::debug_event!("pipeline", "extending", "{}", path.display());
        let result =
            self.shared
                .install_tree(&path, &options, WalkOrigin::Discovered, &self.events);

        match result {
            Ok(()) | Err(WatchError::Closed) => {}
            Err(e) if e.is_vanished() => {
                crate::debug_event!("pipeline", "vanished", "{}: {e}", path.display());
            }
            Err(e) => {
                tracing::warn!("[pipeline] failed to extend watch to {}: {e}", path.display());
                self.shared.send_error(&self.errors, e);
            }
        }
    }
}
