use crate::{
    error::FilterError,
    model::{FilterOperator, LogicMode},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// FilterRequest
///
/// A single leaf condition: one field path, one operator, one value, plus the
/// connective it contributes under its parent group.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub logic: LogicMode,
}

impl FilterRequest {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            logic: LogicMode::And,
        }
    }

    #[must_use]
    pub fn with_logic(mut self, logic: LogicMode) -> Self {
        self.logic = logic;
        self
    }

    // --- Equality ---

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Equals, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::NotEquals, value)
    }

    // --- Ordering ---

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::GreaterThanEqual, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThan, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::LessThanEqual, value)
    }

    pub fn between(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::new(
            field,
            FilterOperator::Between,
            Value::List(vec![low.into(), high.into()]),
        )
    }

    // --- Text ---

    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::StartsWith, value)
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::EndsWith, value)
    }

    pub fn like(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Like, value)
    }

    pub fn regex(field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Regex, pattern)
    }

    pub fn contains_word(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::ContainsWord, value)
    }

    // --- Collections ---

    pub fn in_iter<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field,
            FilterOperator::In,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn not_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field,
            FilterOperator::NotIn,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    // --- Existence ---

    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Self::new(field, FilterOperator::Exists, present)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, Value::Null)
    }

    // --- Special ---

    /// Keyword search expanded across the schema's searchable fields.
    pub fn global(keyword: impl Into<Value>) -> Self {
        Self::new("", FilterOperator::Global, keyword)
    }

    /// Raw aggregation expression, validated for shape at compile time.
    pub fn expr(expression: impl Into<Value>) -> Self {
        Self::new("", FilterOperator::Expr, expression)
    }

    /// Execution directive consumed by option extraction before compilation.
    pub fn control(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Control, value)
    }

    /// Structural invariants every leaf must satisfy before compilation.
    pub fn check(&self) -> Result<(), FilterError> {
        if self.field.trim().is_empty() && !self.operator.allows_missing_field() {
            return Err(FilterError::structure(format!(
                "{} condition requires a field path",
                self.operator
            )));
        }
        if self.value.is_null() && !self.operator.allows_missing_value() {
            return Err(FilterError::validation(
                &self.field,
                self.operator.name(),
                "value is required",
            ));
        }

        Ok(())
    }
}

impl fmt::Display for FilterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.symbol(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_operator_and_default_logic() {
        let req = FilterRequest::gte("age", 18);
        assert_eq!(req.operator, FilterOperator::GreaterThanEqual);
        assert_eq!(req.logic, LogicMode::And);
        assert_eq!(req.value, Value::Int(18));
    }

    #[test]
    fn check_rejects_blank_field_for_ordinary_operators() {
        let req = FilterRequest::eq("", 1);
        assert!(matches!(req.check(), Err(FilterError::Structure { .. })));
    }

    #[test]
    fn check_allows_missing_value_for_null_operators() {
        assert!(FilterRequest::is_null("deleted_at").check().is_ok());
        assert!(FilterRequest::global("smith").check().is_ok());
    }

    #[test]
    fn check_rejects_missing_value_for_comparisons() {
        let req = FilterRequest::new("age", FilterOperator::GreaterThan, Value::Null);
        assert!(matches!(req.check(), Err(FilterError::Validation { .. })));
    }

    #[test]
    fn serde_round_trip() {
        let req = FilterRequest::in_iter("city", ["NY", "LA"]).with_logic(LogicMode::Or);
        let json = serde_json::to_string(&req).unwrap();
        let back: FilterRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }
}
