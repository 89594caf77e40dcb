//! LumaFlow common utilities
//!
//! Error taxonomy, configuration, logging bootstrap and metric names shared by
//! the streaming core and the daemon.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};

/// Metric names emitted through the `metrics` facade.
pub mod metric_names {
    pub const WINDOWS_CREATED: &str = "lumaflow_windows_created_total";
    pub const WINDOWS_CLOSED: &str = "lumaflow_windows_closed_total";
    pub const WATERMARK_QUERIES: &str = "lumaflow_watermark_queries_total";
}
