//! LumaFlow streaming core
//!
//! Windowing engine and watermark fetch layer of a pipeline vertex:
//!
//! - [`window`]: interval and keyed windows, and the fixed windower that keeps the
//!   active windows of a vertex ordered by start time
//! - [`watermark`]: per-vertex fetchers computing the head watermark from the
//!   processors of the upstream buffer
//! - [`pipeline`]: the resolved pipeline topology the fetchers are built from

pub mod pipeline;
pub mod watermark;
pub mod window;

pub use pipeline::Pipeline;
pub use watermark::{Fetcher, VertexWatermarkFetchers, Watermark};
pub use window::{Fixed, IntervalWindow, KeyedWindow, PartitionId, Windower};
