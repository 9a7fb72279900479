//! Tracing setup for the `treewatch` binary and tests.
//!
//! Log lines go to stderr so the event stream on stdout can be piped. Levels
//! come from `[logging]` in the settings file, for example
//! `modules = { "treewatch::watcher" = "debug" }`; a valid `RUST_LOG` replaces
//! them entirely (`RUST_LOG=treewatch=trace treewatch watch ./src/...`).

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// `HH:MM:SS.mmm` in local time.
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default,module=level,...` as understood by [`EnvFilter`].
fn filter_directives(config: &LoggingConfig) -> String {
    config
        .modules
        .iter()
        .fold(config.default.clone(), |mut directives, (module, level)| {
            directives.push_str(&format!(",{module}={level}"));
            directives
        })
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

        let stderr = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(CompactTime)
            .with_filter(filter);

        tracing_subscriber::registry().with(stderr).init();
    });
}

/// [`init_with_config`] with warnings only.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// `info!` as `[component] event` or `[component] event: detail`, e.g.
/// `log_event!("watcher", "watching", "{}/...", root.display())`.
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// [`log_event!`] at debug level.
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
