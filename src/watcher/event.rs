//! Change events delivered by backends and by the recursive watcher.

use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

bitflags! {
    /// Operations that triggered an event.
    ///
    /// A single event may carry more than one bit when a backend coalesces
    /// notifications.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Op: u32 {
        /// A new path was created (or moved into a watched directory).
        const CREATE = 1 << 0;
        /// The contents of a file changed.
        const WRITE = 1 << 1;
        /// The path was removed.
        const REMOVE = 1 << 2;
        /// The path was renamed away; a `CREATE` follows for the new name if
        /// it is still watched.
        const RENAME = 1 << 3;
        /// Attributes changed (permissions, timestamps, ownership).
        const CHMOD = 1 << 4;
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("[no events]");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        f.write_str(&names.join("|"))
    }
}

/// A single file system change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    /// Path the change happened to.
    pub path: PathBuf,
    /// What happened.
    pub op: Op,
}

impl Event {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Shorthand for a `CREATE` event.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Op::CREATE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the event includes any bit of `op`.
    pub fn has(&self, op: Op) -> bool {
        self.op.intersects(op)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<13} {:?}", self.op.to_string(), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_display() {
        assert_eq!(Op::CREATE.to_string(), "CREATE");
        assert_eq!((Op::WRITE | Op::CHMOD).to_string(), "WRITE|CHMOD");
        assert_eq!(Op::empty().to_string(), "[no events]");
    }

    #[test]
    fn test_event_has() {
        let event = Event::new("/tmp/x", Op::CREATE | Op::WRITE);
        assert!(event.has(Op::CREATE));
        assert!(event.has(Op::WRITE | Op::REMOVE));
        assert!(!event.has(Op::RENAME));
    }

    #[test]
    fn test_event_display() {
        let event = Event::create("/tmp/x/f");
        assert_eq!(event.to_string(), "CREATE        \"/tmp/x/f\"");
    }
}
