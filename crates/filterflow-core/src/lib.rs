//! Core runtime for FilterFlow: the filter-expression model, textual parser,
//! type coercion, schema validation, criteria compilation, and pipeline
//! synthesis, with the ergonomics exported via the `prelude`.
#![warn(unreachable_pub)]

pub mod coerce;
pub mod compile;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Maximum structural depth of a filter tree accepted by the compiler.
///
/// Filter groups own their children, so a tree can never contain itself; the
/// depth ceiling bounds pathological nesting from untrusted input instead.
pub const MAX_FILTER_DEPTH: usize = 100;

/// Maximum number of tokens consumed while accumulating a single bracketed
/// list or unquoted multi-token value in the textual parser.
pub const MAX_VALUE_TOKENS: usize = 100;

/// Compiled regex patterns retained by the pattern cache. Once full, new
/// patterns compile without being cached.
pub const MAX_CACHED_PATTERNS: usize = 500;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No caches, registries, or internal helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        compile::{Compiler, Criteria, OperatorRegistry},
        error::FilterError,
        model::{
            FilterComponent, FilterGroup, FilterOperator, FilterOptions, FilterRequest, LogicMode,
        },
        parser::parse_expression,
        pipeline::{PipelineResolver, VirtualFieldSpec, VirtualObjectSpec},
        schema::{EntitySchema, FieldDescriptor, FieldKind},
        value::Value,
    };
}
