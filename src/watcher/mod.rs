//! Recursive file watching on top of single-path backends.
//!
//! A backend watches individual paths. The recursive watcher turns a path
//! ending in `/...` into a watch on the whole tree below it, and keeps that
//! watch complete as directories come and go.
//!
//! # Architecture
//!
//! ```text
//! caller ── add_with / remove ──> RecursiveWatcher ── walk ──> Backend
//!                                   │        │                   │
//!                               registry   close            raw events
//!                                   │        │                   │
//!                                   └──── Pipeline thread <──────┘
//!                                              │
//!                               public events / errors channels
//! ```
//!
//! - `WatchRegistry` maps each root to the options it was added with.
//! - The pipeline forwards backend events and, on `CREATE` below a recursive
//!   root, walks the new subtree to watch it as well.
//! - `close` stops the pipeline before the public channels and the backend
//!   are closed.

pub mod backend;
mod error;
mod event;
mod options;
mod pipeline;
mod recursive;
mod registry;
mod walk;

pub use backend::{Backend, BackendCall, Capability, MemoryBackend, NotifyBackend};
pub use error::WatchError;
pub use event::{Event, Op};
pub use options::{RECURSIVE_MARKER, WatchOptions, clean_path, split_recursive};
pub use recursive::RecursiveWatcher;
pub use registry::WatchRegistry;
