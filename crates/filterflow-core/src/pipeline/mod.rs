//! Module: pipeline
//! Responsibility: expand virtual-field declarations into aggregation stages
//! Does not own: filter compilation or schema validation

mod resolve;
mod spec;

pub use resolve::{PipelineResolver, PipelineStage};
pub use spec::{VirtualFieldSpec, VirtualObjectSpec};
