//! Module: coerce
//! Responsibility: converting raw filter values toward declared field kinds
//! and lifting values into their backend-comparable form, with process-wide
//! memoization.
//! Does not own: operator validation or criteria emission.

mod cache;
mod convert;
mod temporal;

pub use cache::{CacheStats, stats};
pub use convert::{
    convert_range_to_expected_type, convert_to_expected_type, is_compatible_type, to_comparable,
};
pub use temporal::{looks_temporal, parse_date, parse_date_time, parse_time, parse_timestamp};
