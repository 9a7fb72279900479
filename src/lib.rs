pub mod config;
pub mod logging;
pub mod watcher;

pub use config::{LoggingConfig, Settings, WatchConfig};
pub use watcher::{
    Backend, Capability, Event, MemoryBackend, NotifyBackend, Op, RecursiveWatcher, WatchError,
    WatchOptions,
};
