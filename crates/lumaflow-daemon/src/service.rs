//! Pipeline metadata queries exposed by the daemon service.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::error;

use lumaflow_common::config::WatermarkConfig;
use lumaflow_common::metric_names::WATERMARK_QUERIES;
use lumaflow_common::{Error, Result};
use lumaflow_streaming::watermark::{VertexWatermarkFetchers, WatchFactory};
use lumaflow_streaming::Pipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVertexWatermarkRequest {
    pub vertex: String,
}

impl GetVertexWatermarkRequest {
    pub fn new(vertex: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexWatermark {
    pub pipeline: String,
    pub vertex: String,
    /// Unix seconds
    pub watermark: i64,
    pub is_watermark_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVertexWatermarkResponse {
    pub vertex_watermark: VertexWatermark,
}

/// Answers metadata queries about one pipeline.
pub struct PipelineMetadataQuery {
    pipeline: Pipeline,
    vertex_watermark: VertexWatermarkFetchers,
}

impl PipelineMetadataQuery {
    pub fn new(pipeline: Pipeline, vertex_watermark: VertexWatermarkFetchers) -> Self {
        Self {
            pipeline,
            vertex_watermark,
        }
    }

    /// Builds the vertex fetchers of the pipeline. Fails if any watch cannot be
    /// opened, in which case the daemon must not start.
    pub async fn bootstrap(
        pipeline: Pipeline,
        factory: &dyn WatchFactory,
        config: &WatermarkConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let fetchers = VertexWatermarkFetchers::new(
            &pipeline,
            factory,
            config.heartbeat_timeout(),
            cancel,
            config.build_timeout(),
        )
        .await?;
        Ok(Self::new(pipeline, fetchers))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Head watermark of a vertex. With propagation disabled every vertex, known
    /// or not, reports the epoch and `is_watermark_enabled = false`.
    pub fn get_vertex_watermark(
        &self,
        request: &GetVertexWatermarkRequest,
    ) -> Result<GetVertexWatermarkResponse> {
        if !self.vertex_watermark.is_watermark_enabled() {
            metrics::counter!(WATERMARK_QUERIES, "status" => "disabled").increment(1);
            return Ok(self.response(&request.vertex, 0, false));
        }

        let Some(fetcher) = self.vertex_watermark.get(&request.vertex) else {
            error!(
                pipeline = %self.pipeline.name,
                vertex = %request.vertex,
                "watermark fetcher not available for vertex in the fetcher map"
            );
            metrics::counter!(WATERMARK_QUERIES, "status" => "not_found").increment(1);
            return Err(Error::VertexNotFound(request.vertex.clone()));
        };

        let watermark = fetcher.head_watermark().timestamp();
        metrics::counter!(WATERMARK_QUERIES, "status" => "ok").increment(1);
        Ok(self.response(&request.vertex, watermark, true))
    }

    fn response(&self, vertex: &str, watermark: i64, enabled: bool) -> GetVertexWatermarkResponse {
        GetVertexWatermarkResponse {
            vertex_watermark: VertexWatermark {
                pipeline: self.pipeline.name.clone(),
                vertex: vertex.to_string(),
                watermark,
                is_watermark_enabled: enabled,
            },
        }
    }
}
