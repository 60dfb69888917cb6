//! Module: schema
//! Responsibility: registered entity descriptor tables, dotted-path field
//! resolution, and the operator/shape validation boundary between user
//! filters and compilation.
//! Does not own: value conversion or criteria emission.

mod descriptor;
mod resolve;
mod validate;

pub use descriptor::{EntitySchema, FieldDescriptor, FieldKind};
pub use resolve::resolve_field;
pub use validate::{allowed_operators, validate_expr_value, validate_operation};
