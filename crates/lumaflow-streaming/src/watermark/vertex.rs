//! Per-vertex watermark fetchers of a pipeline.
//!
//! Each fetcher is tied to the incoming edge buffer of its vertex (Vn) and reads
//! the watermark propagated by the previous vertex (Vn-1). Source vertices read
//! their source buffer instead. Sink vertices get a second fetcher on their sink
//! buffer, registered as `<vertex>_SINK`, to observe the watermark leaving the
//! pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::info;

use lumaflow_common::{Error, Result};

use super::generic::{build_fetch_watchers, GenericFetch};
use super::store::WatchFactory;
use super::Fetcher;
use crate::pipeline::{offset_timeline_bucket, processor_bucket, Pipeline};

pub const SINK_SUFFIX: &str = "_SINK";

/// A fetcher to build: the map key, the vertex it belongs to and the buffer it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherTarget {
    pub key: String,
    pub vertex: String,
    pub buffer: String,
}

/// Resolves the buffer every fetcher reads from. Only one incoming edge per
/// non-source vertex is supported; joins need a fetcher that merges edges.
/// Fetcher keys must be unique across the pipeline.
pub fn resolve_fetcher_targets(pipeline: &Pipeline) -> Result<Vec<FetcherTarget>> {
    let mut targets = Vec::with_capacity(pipeline.spec.vertices.len());
    let mut keys = HashSet::with_capacity(pipeline.spec.vertices.len());
    let mut push = |target: FetcherTarget| {
        if !keys.insert(target.key.clone()) {
            return Err(Error::DuplicateVertex(target.key));
        }
        targets.push(target);
        Ok(())
    };

    for vertex in &pipeline.spec.vertices {
        let buffer = if vertex.is_source() {
            pipeline.source_buffer_name(&vertex.name)
        } else {
            match pipeline.get_from_edges(&vertex.name).as_slice() {
                [edge] => pipeline.edge_buffer_name(&edge.from, &edge.to),
                [] => return Err(Error::NoIncomingEdge(vertex.name.clone())),
                edges => {
                    return Err(Error::UnsupportedTopology {
                        vertex: vertex.name.clone(),
                        edges: edges.len(),
                    })
                }
            }
        };

        if vertex.is_sink() {
            push(FetcherTarget {
                key: format!("{}{}", vertex.name, SINK_SUFFIX),
                vertex: vertex.name.clone(),
                buffer: pipeline.sink_buffer_name(&vertex.name),
            })?;
        }
        push(FetcherTarget {
            key: vertex.name.clone(),
            vertex: vertex.name.clone(),
            buffer,
        })?;
    }

    Ok(targets)
}

async fn create_watermark_fetcher(
    factory: &dyn WatchFactory,
    pipeline: &str,
    target: &FetcherTarget,
    heartbeat_timeout: Duration,
) -> Result<Arc<dyn Fetcher>> {
    let hb_bucket = processor_bucket(pipeline, &target.buffer);
    let hb_watch = factory.new_watch(pipeline, &hb_bucket).await?;

    let ot_bucket = offset_timeline_bucket(pipeline, &target.buffer);
    let ot_watch = factory.new_watch(pipeline, &ot_bucket).await?;

    let watchers = build_fetch_watchers(hb_watch, ot_watch);
    Ok(Arc::new(GenericFetch::new(
        target.vertex.as_str(),
        watchers,
        heartbeat_timeout,
    )))
}

/// Vertex name to fetcher, built once per pipeline and read-only afterwards.
pub struct VertexWatermarkFetchers {
    fetch_map: HashMap<String, Arc<dyn Fetcher>>,
    watermark_enabled: bool,
}

impl VertexWatermarkFetchers {
    /// Builds one fetcher per vertex, plus one per sink buffer. Either every
    /// fetcher is built or none is.
    pub async fn new(
        pipeline: &Pipeline,
        factory: &dyn WatchFactory,
        heartbeat_timeout: Duration,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<Self> {
        if !pipeline.spec.watermark.propagate {
            info!(pipeline = %pipeline.name, "watermark propagation disabled");
            return Ok(Self::disabled());
        }

        let targets = resolve_fetcher_targets(pipeline)?;
        let build = try_join_all(targets.iter().map(|target| {
            create_watermark_fetcher(factory, &pipeline.name, target, heartbeat_timeout)
        }));

        let fetchers = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            built = tokio::time::timeout(timeout, build) => {
                built.map_err(|_| Error::Timeout(timeout))??
            }
        };

        let fetch_map: HashMap<_, _> = targets
            .into_iter()
            .map(|target| target.key)
            .zip(fetchers)
            .collect();

        info!(
            pipeline = %pipeline.name,
            fetchers = fetch_map.len(),
            "built vertex watermark fetchers"
        );
        Ok(Self {
            fetch_map,
            watermark_enabled: true,
        })
    }

    pub fn disabled() -> Self {
        Self {
            fetch_map: HashMap::new(),
            watermark_enabled: false,
        }
    }

    pub fn from_fetchers(fetch_map: HashMap<String, Arc<dyn Fetcher>>, watermark_enabled: bool) -> Self {
        Self {
            fetch_map,
            watermark_enabled,
        }
    }

    pub fn is_watermark_enabled(&self) -> bool {
        self.watermark_enabled
    }

    pub fn get(&self, vertex: &str) -> Option<&Arc<dyn Fetcher>> {
        self.fetch_map.get(vertex)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.fetch_map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fetch_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetch_map.is_empty()
    }
}
