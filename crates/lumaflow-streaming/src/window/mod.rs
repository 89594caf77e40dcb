//! Event-time windowing
//!
//! A windower assigns event times to [`IntervalWindow`]s and tracks the set of
//! active [`KeyedWindow`]s of one vertex. Windows are closed once the watermark
//! has moved past their end.

pub mod fixed;
pub mod keyed;
pub mod partition;

pub use fixed::Fixed;
pub use keyed::KeyedWindow;
pub use partition::PartitionId;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lumaflow_common::{Error, Result};

/// Half-open time range `[start, end)` with `start < end`.
///
/// Ordered by start, then end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct IntervalWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for IntervalWindow {
    type Error = Error;

    fn try_from(raw: RawWindow) -> Result<Self> {
        Self::try_new(raw.start, raw.end)
    }
}

impl IntervalWindow {
    /// # Panics
    ///
    /// If `start` is not before `end`. Use [`IntervalWindow::try_new`] for
    /// untrusted bounds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start < end, "window start must be before end");
        Self { start, end }
    }

    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidWindow {
                start_ms: start.timestamp_millis(),
                end_ms: end.timestamp_millis(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Left inclusive, right exclusive.
    pub fn contains(&self, event_time: DateTime<Utc>) -> bool {
        self.start <= event_time && event_time < self.end
    }
}

impl fmt::Display for IntervalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.timestamp_millis(),
            self.end.timestamp_millis()
        )
    }
}

/// Lifecycle operations over the active windows of a vertex.
///
/// Callers look a window up with [`Windower::get_window`] and only create it on a miss.
pub trait Windower: Send + Sync {
    /// Windows the event time belongs to.
    fn assign_window(&self, event_time: DateTime<Utc>) -> Vec<IntervalWindow>;

    /// Returns the active window with the given bounds, creating it if needed.
    fn create_window(&self, window: &IntervalWindow) -> Arc<KeyedWindow>;

    fn get_window(&self, window: &IntervalWindow) -> Option<Arc<KeyedWindow>>;

    /// Removes and returns every window whose end is strictly before the watermark.
    fn remove_windows(&self, watermark: DateTime<Utc>) -> Vec<Arc<KeyedWindow>>;
}
