//! Module: model
//! Responsibility: the filter-expression vocabulary of operators, leaf
//! conditions, composite groups, and execution options.
//! Does not own: parsing, validation, coercion, or compilation.

mod component;
mod group;
mod logic;
mod operator;
mod options;
mod request;

pub use component::FilterComponent;
pub use group::FilterGroup;
pub use logic::LogicMode;
pub use operator::{FilterOperator, OperatorCategory, grouped_operators_message};
pub use options::{FilterOptions, ProjectionOptions};
pub use request::FilterRequest;
