//! LumaFlow daemon services
//!
//! Metadata queries served by the pipeline daemon. Transport is left to the
//! embedding server; handlers here are plain request/response functions.

pub mod service;

pub use service::{
    GetVertexWatermarkRequest, GetVertexWatermarkResponse, PipelineMetadataQuery, VertexWatermark,
};
