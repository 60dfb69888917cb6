//! Module: compile
//! Responsibility: turn validated filter trees into filter documents
//! Does not own: parsing, schema resolution, or value coercion

mod compiler;
mod criteria;
mod global;
mod pattern;
mod registry;

pub use compiler::Compiler;
pub use criteria::{Criteria, FieldCriteria};
pub use global::resolve_global_search;
pub use pattern::{compile_pattern, wildcard_to_regex};
pub use registry::{OperatorHandler, OperatorRegistry, default_registry};
