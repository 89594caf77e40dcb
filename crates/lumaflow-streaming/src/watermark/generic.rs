//! Generic watermark fetch over a heartbeat and an offset-timeline bucket.
//!
//! Heartbeat values are the processor's last heartbeat as big-endian i64 unix
//! seconds. Offset-timeline values are the processor's latest acknowledged event
//! time as big-endian i64 milliseconds.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::store::KvWatch;
use super::{initial_watermark, Fetcher, Watermark};

/// The two watched views a fetcher reads from.
#[derive(Clone)]
pub struct FetchWatchers {
    pub heartbeat: Arc<dyn KvWatch>,
    pub offset_timeline: Arc<dyn KvWatch>,
}

pub fn build_fetch_watchers(
    heartbeat: Arc<dyn KvWatch>,
    offset_timeline: Arc<dyn KvWatch>,
) -> FetchWatchers {
    FetchWatchers {
        heartbeat,
        offset_timeline,
    }
}

pub fn heartbeat_value(at: DateTime<Utc>) -> Bytes {
    encode_i64(at.timestamp())
}

pub fn offset_timeline_value(watermark: Watermark) -> Bytes {
    encode_i64(watermark.timestamp_millis())
}

fn encode_i64(value: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(8);
    buf.put_i64(value);
    buf.freeze()
}

fn decode_i64(value: &Bytes) -> Option<i64> {
    if value.len() != 8 {
        return None;
    }
    Some(value.clone().get_i64())
}

/// Head watermark of one buffer: the minimum event time over the live processors.
pub struct GenericFetch {
    vertex: String,
    watchers: FetchWatchers,
    heartbeat_timeout: Duration,
}

impl GenericFetch {
    pub fn new(vertex: impl Into<String>, watchers: FetchWatchers, heartbeat_timeout: Duration) -> Self {
        Self {
            vertex: vertex.into(),
            watchers,
            heartbeat_timeout,
        }
    }

    pub fn vertex(&self) -> &str {
        &self.vertex
    }

    /// Processors whose last heartbeat is within the timeout of `now`.
    pub fn live_processors(&self, now: DateTime<Utc>) -> Vec<String> {
        let timeout = i64::try_from(self.heartbeat_timeout.as_secs()).unwrap_or(i64::MAX);
        let now = now.timestamp();

        self.watchers
            .heartbeat
            .entries()
            .into_iter()
            .filter_map(|(processor, value)| {
                let Some(last) = decode_i64(&value) else {
                    warn!(vertex = %self.vertex, %processor, "malformed heartbeat");
                    return None;
                };
                if now.saturating_sub(last) > timeout {
                    debug!(vertex = %self.vertex, %processor, last, "stale processor");
                    return None;
                }
                Some(processor)
            })
            .collect()
    }

    pub fn head_watermark_at(&self, now: DateTime<Utc>) -> Watermark {
        self.live_processors(now)
            .iter()
            .filter_map(|processor| {
                self.watchers
                    .offset_timeline
                    .get(processor)
                    .and_then(|value| decode_i64(&value))
            })
            .min()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(initial_watermark)
    }
}

impl Fetcher for GenericFetch {
    fn head_watermark(&self) -> Watermark {
        self.head_watermark_at(Utc::now())
    }
}
