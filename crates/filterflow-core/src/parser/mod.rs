//! Module: parser
//! Responsibility: turn textual filter expressions into filter trees
//! Does not own: field resolution, validation, or compilation

mod parse;
mod token;

pub use parse::{parse_expression, parse_single_expression};
pub use token::tokenize;
