//! Watermark fetch layer
//!
//! Every vertex reads the watermark published by the processors of the previous
//! vertex through two watched KV buckets per buffer: processor heartbeats and
//! offset timelines. The head watermark of a vertex is the smallest event time
//! reported by the upstream processors that are still alive.

pub mod generic;
pub mod store;
pub mod vertex;

pub use generic::{build_fetch_watchers, FetchWatchers, GenericFetch};
pub use store::{KvWatch, MemoryBucket, MemoryKvStore, WatchFactory};
pub use vertex::{VertexWatermarkFetchers, SINK_SUFFIX};

use chrono::{DateTime, TimeDelta, Utc};

/// Event time such that no earlier event is expected anymore.
pub type Watermark = DateTime<Utc>;

/// Watermark reported before any processor has published one (-1ms).
pub fn initial_watermark() -> Watermark {
    DateTime::<Utc>::default() - TimeDelta::milliseconds(1)
}

/// Reads the current head watermark of one buffer.
pub trait Fetcher: Send + Sync {
    fn head_watermark(&self) -> Watermark;
}
