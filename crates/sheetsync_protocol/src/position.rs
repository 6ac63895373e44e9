//! Change-log resume position.

use std::fmt;

/// A position in the store's change log.
///
/// Captured once at startup and handed to the replication stream so that
/// ingestion starts exactly at "now". It only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPosition {
    /// Log file identifier.
    pub file: String,
    /// Offset inside the log; records strictly after it are new.
    pub offset: u64,
}

impl SyncPosition {
    /// Creates a position.
    pub fn new(file: impl Into<String>, offset: u64) -> Self {
        Self {
            file: file.into(),
            offset,
        }
    }

    /// Returns a position advanced to `offset`, never moving backwards.
    pub fn advanced_to(&self, offset: u64) -> Self {
        Self {
            file: self.file.clone(),
            offset: self.offset.max(offset),
        }
    }
}

impl fmt::Display for SyncPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let pos = SyncPosition::new("change_log", 42);
        assert_eq!(pos.to_string(), "change_log:42");
    }

    #[test]
    fn never_rewinds() {
        let pos = SyncPosition::new("change_log", 10);
        assert_eq!(pos.advanced_to(15).offset, 15);
        assert_eq!(pos.advanced_to(3).offset, 10);
    }
}
