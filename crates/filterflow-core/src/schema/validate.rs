use crate::{
    coerce,
    error::FilterError,
    model::FilterOperator,
    schema::FieldKind,
    value::Value,
};

use FilterOperator as Op;

const TEXT_OPS: &[Op] = &[
    Op::Equals,
    Op::NotEquals,
    Op::StartsWith,
    Op::EndsWith,
    Op::In,
    Op::NotIn,
    Op::IsNull,
    Op::IsNotNull,
    Op::Like,
    Op::Regex,
    Op::ContainsWord,
];

const NUMERIC_OPS: &[Op] = &[
    Op::Equals,
    Op::NotEquals,
    Op::LessThan,
    Op::LessThanEqual,
    Op::GreaterThan,
    Op::GreaterThanEqual,
    Op::In,
    Op::NotIn,
    Op::IsNull,
    Op::IsNotNull,
    Op::Between,
    Op::NotBetween,
];

const TEMPORAL_OPS: &[Op] = &[
    Op::Equals,
    Op::NotEquals,
    Op::LessThan,
    Op::LessThanEqual,
    Op::GreaterThan,
    Op::GreaterThanEqual,
    Op::IsNull,
    Op::IsNotNull,
    Op::Between,
    Op::NotBetween,
];

const BOOL_OPS: &[Op] = &[Op::Equals, Op::NotEquals, Op::IsNull, Op::IsNotNull];

const ENUM_OPS: &[Op] = &[
    Op::Equals,
    Op::NotEquals,
    Op::In,
    Op::NotIn,
    Op::IsNull,
    Op::IsNotNull,
];

const MAP_OPS: &[Op] = &[
    Op::Expr,
    Op::MapKeyEquals,
    Op::MapValueEquals,
    Op::MapValueContains,
    Op::MapValueExists,
];

const COLLECTION_OPS: &[Op] = &[Op::In, Op::NotIn, Op::IsNull, Op::IsNotNull];

/// Operators permitted on a field of the given kind. `None` means strict
/// validation is skipped (untyped fields).
#[must_use]
pub fn allowed_operators(kind: &FieldKind) -> Option<&'static [Op]> {
    match kind {
        FieldKind::Text => Some(TEXT_OPS),
        FieldKind::Int | FieldKind::Float => Some(NUMERIC_OPS),
        FieldKind::Date | FieldKind::Time | FieldKind::DateTime | FieldKind::Timestamp => {
            Some(TEMPORAL_OPS)
        }
        FieldKind::Bool => Some(BOOL_OPS),
        FieldKind::Enum { .. } => Some(ENUM_OPS),
        FieldKind::Map { .. } => Some(MAP_OPS),
        FieldKind::List(_) => Some(COLLECTION_OPS),
        FieldKind::Object(_) | FieldKind::Any => None,
    }
}

/// Check a leaf against the operator matrix and per-operator shape rules.
/// EXISTS is presence-only and always passes; untyped fields skip the matrix
/// but still get shape checks.
pub fn validate_operation(
    field: &str,
    kind: &FieldKind,
    operator: Op,
    value: &Value,
) -> Result<(), FilterError> {
    if operator == Op::Exists {
        return Ok(());
    }

    if let Some(allowed) = allowed_operators(kind)
        && !allowed.contains(&operator)
    {
        let names: Vec<&str> = allowed.iter().map(|op| op.name()).collect();
        return Err(FilterError::validation(
            field,
            operator.name(),
            format!("not allowed on {kind} field; allowed: {}", names.join(", ")),
        ));
    }

    if matches!(kind, FieldKind::Map { .. }) {
        return validate_map_shape(field, operator, value);
    }

    match operator {
        Op::Regex => validate_regex(field, value),
        Op::Between | Op::NotBetween => validate_between(field, kind, operator, value),
        Op::ContainsWord => validate_contains_word(field, value),
        Op::In | Op::NotIn => validate_in(field, kind, operator, value),
        Op::Expr => validate_expr_value(field, value),
        _ => Ok(()),
    }
}

fn validate_regex(field: &str, value: &Value) -> Result<(), FilterError> {
    let Value::Text(pattern) = value else {
        return Err(FilterError::validation(
            field,
            Op::Regex.name(),
            format!("expects a string pattern, got {}", value.type_name()),
        ));
    };
    // Compiles through the shared pattern cache; retag the error with the
    // offending field.
    crate::compile::compile_pattern(pattern).map_err(|e| match e {
        FilterError::Validation { message, .. } => {
            FilterError::validation(field, Op::Regex.name(), message)
        }
        other => other,
    })?;

    Ok(())
}

fn validate_contains_word(field: &str, value: &Value) -> Result<(), FilterError> {
    if matches!(value, Value::Text(_)) {
        Ok(())
    } else {
        Err(FilterError::validation(
            field,
            Op::ContainsWord.name(),
            format!("expects a string, got {}", value.type_name()),
        ))
    }
}

fn validate_between(
    field: &str,
    kind: &FieldKind,
    operator: Op,
    value: &Value,
) -> Result<(), FilterError> {
    let range = value.clone().into_list();
    if range.len() != 2 {
        return Err(FilterError::validation(
            field,
            operator.name(),
            format!("requires exactly 2 values, got {}", range.len()),
        ));
    }
    if range.iter().all(Value::is_null) {
        return Err(FilterError::validation(
            field,
            operator.name(),
            "requires at least one non-null bound",
        ));
    }
    if !(kind.is_numeric() || kind.is_temporal() || matches!(kind, FieldKind::Any)) {
        return Err(FilterError::validation(
            field,
            operator.name(),
            format!("{kind} field has no ordering"),
        ));
    }

    for bound in range.iter().filter(|v| !v.is_null()) {
        if !coerce::is_compatible_type(bound, kind) {
            return Err(FilterError::validation(
                field,
                operator.name(),
                format!("bound '{bound}' is not comparable to {kind}"),
            ));
        }
    }

    Ok(())
}

fn validate_in(
    field: &str,
    kind: &FieldKind,
    operator: Op,
    value: &Value,
) -> Result<(), FilterError> {
    let items = value.clone().into_list();
    if items.is_empty() {
        return Err(FilterError::validation(
            field,
            operator.name(),
            "requires a non-empty list",
        ));
    }

    // Collections compare their element kind.
    let target = match kind {
        FieldKind::List(elem) => elem,
        other => other,
    };

    for item in &items {
        if !item.is_null() && !coerce::is_compatible_type(item, target) {
            return Err(FilterError::validation(
                field,
                operator.name(),
                format!("element '{item}' is not compatible with {target}"),
            ));
        }
    }

    Ok(())
}

fn validate_map_shape(field: &str, operator: Op, value: &Value) -> Result<(), FilterError> {
    match operator {
        Op::MapValueEquals | Op::MapValueContains => match value {
            Value::Map(entries) if entries.len() == 1 => Ok(()),
            Value::Map(entries) => Err(FilterError::validation(
                field,
                operator.name(),
                format!("requires a single key-value pair, got {}", entries.len()),
            )),
            other => Err(FilterError::validation(
                field,
                operator.name(),
                format!("expects a map value, got {}", other.type_name()),
            )),
        },
        Op::MapValueExists => match value {
            Value::Text(_) | Value::Bool(_) => Ok(()),
            other => Err(FilterError::validation(
                field,
                operator.name(),
                format!("expects a string key or boolean, got {}", other.type_name()),
            )),
        },
        Op::MapKeyEquals => match value {
            Value::Text(_) => Ok(()),
            other => Err(FilterError::validation(
                field,
                operator.name(),
                format!("expects a string key, got {}", other.type_name()),
            )),
        },
        Op::Expr => validate_expr_value(field, value),
        other => Err(FilterError::validation(
            field,
            other.name(),
            "not allowed on map field",
        )),
    }
}

/// EXPR payloads must be flat, string-keyed structures whose operator keys
/// start with `$`. Primitives are valid as-is; lists and nested maps are
/// checked recursively.
pub fn validate_expr_value(field: &str, value: &Value) -> Result<(), FilterError> {
    match value {
        Value::Map(entries) => {
            for (key, nested) in entries {
                if !key.starts_with('$') {
                    return Err(FilterError::validation(
                        field,
                        Op::Expr.name(),
                        format!("invalid key '{key}'; expression keys must start with '$'"),
                    ));
                }
                validate_expr_value(field, nested)?;
            }
            Ok(())
        }
        Value::List(items) => {
            for item in items {
                validate_expr_value(field, item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_is_rejected_on_numeric_fields() {
        let err =
            validate_operation("age", &FieldKind::Int, Op::Like, &Value::Text("1*".into()))
                .unwrap_err();
        assert!(err.to_string().contains("not allowed on int"));
        assert!(err.to_string().contains("BETWEEN"));
    }

    #[test]
    fn exists_passes_everywhere() {
        assert!(validate_operation("x", &FieldKind::Bool, Op::Exists, &Value::Bool(true)).is_ok());
        assert!(
            validate_operation("x", &FieldKind::Map { value: Box::new(FieldKind::Any) }, Op::Exists, &Value::Bool(false))
                .is_ok()
        );
    }

    #[test]
    fn regex_pattern_must_compile() {
        assert!(
            validate_operation("name", &FieldKind::Text, Op::Regex, &Value::Text("^a.*".into()))
                .is_ok()
        );
        let err =
            validate_operation("name", &FieldKind::Text, Op::Regex, &Value::Text("([".into()))
                .unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn between_requires_two_bounds_one_non_null() {
        let ok = Value::List(vec![Value::Int(100), Value::Int(500)]);
        assert!(validate_operation("price", &FieldKind::Int, Op::Between, &ok).is_ok());

        let one = Value::List(vec![Value::Int(100)]);
        assert!(validate_operation("price", &FieldKind::Int, Op::Between, &one).is_err());

        let both_null = Value::List(vec![Value::Null, Value::Null]);
        assert!(validate_operation("price", &FieldKind::Int, Op::Between, &both_null).is_err());

        let half_open = Value::List(vec![Value::Int(100), Value::Null]);
        assert!(validate_operation("price", &FieldKind::Int, Op::Between, &half_open).is_ok());
    }

    #[test]
    fn in_rejects_empty_and_incompatible_elements() {
        let empty = Value::List(vec![]);
        assert!(validate_operation("city", &FieldKind::Text, Op::In, &empty).is_err());

        let mixed = Value::List(vec![Value::Int(1), Value::Text("x".into())]);
        let err = validate_operation("age", &FieldKind::Int, Op::In, &mixed).unwrap_err();
        assert!(err.to_string().contains('x'));
    }

    #[test]
    fn map_value_equals_requires_single_entry() {
        let kind = FieldKind::Map { value: Box::new(FieldKind::Text) };
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("a".to_string(), Value::Text("1".into()));
        assert!(
            validate_operation("attrs", &kind, Op::MapValueEquals, &Value::Map(entries.clone()))
                .is_ok()
        );

        entries.insert("b".to_string(), Value::Text("2".into()));
        assert!(
            validate_operation("attrs", &kind, Op::MapValueEquals, &Value::Map(entries)).is_err()
        );
    }

    #[test]
    fn expr_keys_must_be_operator_prefixed() {
        let mut inner = std::collections::BTreeMap::new();
        inner.insert("$gt".to_string(), Value::Int(5));
        assert!(validate_expr_value("f", &Value::Map(inner.clone())).is_ok());

        inner.insert("bad".to_string(), Value::Int(1));
        assert!(validate_expr_value("f", &Value::Map(inner)).is_err());
    }
}
