//! Resolved pipeline specification and buffer naming

use serde::{Deserialize, Serialize};

use lumaflow_common::Result;

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub spec: PipelineSpec,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSpec {
    pub vertices: Vec<AbstractVertex>,
    pub edges: Vec<Edge>,
    pub watermark: WatermarkSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSpec {
    /// Whether watermarks are propagated through the pipeline
    pub propagate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractVertex {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<Sink>,
}

/// Marks a vertex that reads from outside the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Source {}

/// Marks a vertex that writes out of the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sink {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl AbstractVertex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            sink: None,
        }
    }

    pub fn source(name: impl Into<String>) -> Self {
        Self {
            source: Some(Source::default()),
            ..Self::new(name)
        }
    }

    pub fn sink(name: impl Into<String>) -> Self {
        Self {
            sink: Some(Sink::default()),
            ..Self::new(name)
        }
    }

    pub fn is_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_sink(&self) -> bool {
        self.sink.is_some()
    }
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Pipeline {
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn vertex(&self, name: &str) -> Option<&AbstractVertex> {
        self.spec.vertices.iter().find(|v| v.name == name)
    }

    /// Edges ending at the given vertex.
    pub fn get_from_edges(&self, vertex: &str) -> Vec<&Edge> {
        self.spec.edges.iter().filter(|e| e.to == vertex).collect()
    }

    pub fn edge_buffer_name(&self, from: &str, to: &str) -> String {
        format!("{}-{}-{}-{}", self.namespace, self.name, from, to)
    }

    pub fn source_buffer_name(&self, vertex: &str) -> String {
        format!("{}-{}-{}_SOURCE", self.namespace, self.name, vertex)
    }

    pub fn sink_buffer_name(&self, vertex: &str) -> String {
        format!("{}-{}-{}_SINK", self.namespace, self.name, vertex)
    }
}

/// Bucket holding the heartbeats of the processors writing into a buffer.
pub fn processor_bucket(pipeline: &str, buffer: &str) -> String {
    format!("{}-{}_PROCESSORS", pipeline, buffer)
}

/// Bucket holding the offset timeline of the processors writing into a buffer.
pub fn offset_timeline_bucket(pipeline: &str, buffer: &str) -> String {
    format!("{}-{}_OT", pipeline, buffer)
}
