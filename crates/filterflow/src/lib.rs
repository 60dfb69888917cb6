//! ## Crate layout
//! - `core`: expression model, textual parser, coercion, schema validation,
//!   criteria compilation, and pipeline synthesis.
//!
//! The `prelude` module mirrors the surface most callers need: build or parse
//! a filter tree, extract control directives, compile against a schema.

pub use filterflow_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        compile::{Compiler, Criteria, OperatorRegistry, default_registry},
        error::{FilterError, RegistryError},
        model::{
            FilterComponent, FilterGroup, FilterOperator, FilterOptions, FilterRequest, LogicMode,
            OperatorCategory, ProjectionOptions,
        },
        parser::{parse_expression, parse_single_expression},
        pipeline::{PipelineResolver, PipelineStage, VirtualFieldSpec, VirtualObjectSpec},
        schema::{EntitySchema, FieldDescriptor, FieldKind},
        value::Value,
    };
}
