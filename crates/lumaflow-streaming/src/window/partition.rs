use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies the per-key state of one window. Handed to the state store, which
/// materializes it while the window is active and discards it once the window closes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionId {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub key: String,
}

impl PartitionId {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, key: impl Into<String>) -> Self {
        Self {
            start,
            end,
            key: key.into(),
        }
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.start.timestamp_millis(),
            self.end.timestamp_millis(),
            self.key
        )
    }
}
