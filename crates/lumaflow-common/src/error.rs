//! Error types shared across LumaFlow crates

use std::time::Duration;

use thiserror::Error;

/// Core error type for windowing and watermark operations
#[derive(Error, Debug)]
pub enum Error {
    /// A watched KV view could not be built for a bucket.
    #[error("failed to watch bucket {bucket}: {reason}")]
    Watch { bucket: String, reason: String },

    /// More than one incoming edge on a non-source vertex.
    #[error("vertex {vertex} has {edges} incoming edges, only one is supported")]
    UnsupportedTopology { vertex: String, edges: usize },

    #[error("vertex {0} is not a source and has no incoming edge")]
    NoIncomingEdge(String),

    /// Two fetchers resolve to the same vertex key, e.g. a duplicate vertex name
    /// or a vertex named like another vertex's sink entry.
    #[error("duplicate watermark fetcher for vertex key {0}")]
    DuplicateVertex(String),

    #[error("invalid window [{start_ms}, {end_ms}): start must be before end")]
    InvalidWindow { start_ms: i64, end_ms: i64 },

    /// No fetcher is registered for the vertex while propagation is enabled.
    #[error("watermark not available for given vertex, {0}")]
    VertexNotFound(String),

    #[error("invalid window length: {0:?}")]
    InvalidWindowLength(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML Error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML Error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn watch(bucket: impl Into<String>, reason: impl ToString) -> Self {
        Error::Watch {
            bucket: bucket.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors that must abort pipeline startup.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::VertexNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
