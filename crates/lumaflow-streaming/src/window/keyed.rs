//! Keyed windows
//!
//! A keyed window associates the keys seen so far with one interval window.
//! Each key identifies a partitioned set of events within that window.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{IntervalWindow, PartitionId};

/// Association between a set of keys and a window. All partitions of the window
/// are closed together once the watermark passes its end.
#[derive(Debug)]
pub struct KeyedWindow {
    window: IntervalWindow,
    keys: RwLock<HashSet<String>>,
}

impl KeyedWindow {
    pub fn new(window: IntervalWindow) -> Self {
        Self {
            window,
            keys: RwLock::new(HashSet::new()),
        }
    }

    pub fn window(&self) -> &IntervalWindow {
        &self.window
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.window.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.window.end
    }

    /// Adds a key to the window. Adding a key twice is a no-op.
    pub fn add_key(&self, key: &str) {
        if self.keys.read().contains(key) {
            return;
        }
        let mut keys = self.keys.write();
        if !keys.contains(key) {
            keys.insert(key.to_string());
        }
    }

    /// One partition per registered key, in no particular order.
    pub fn partitions(&self) -> Vec<PartitionId> {
        let keys = self.keys.read();
        keys.iter()
            .map(|key| PartitionId::new(self.window.start, self.window.end, key.as_str()))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.read().iter().cloned().collect()
    }

    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }
}
