use crate::{
    coerce::{cache, temporal},
    error::FilterError,
    schema::FieldKind,
    value::Value,
};

/// Convert a raw filter value toward a field's declared kind.
///
/// Applied in order: identity, temporal cross-conversion, numeric
/// widening/narrowing, string parsing (numeric, strict boolean, enum variant,
/// JSON-shaped structures), collection coercion (comma-split strings or
/// element-wise conversion), and map coercion. Nulls pass through. Any other
/// combination fails with a coercion error naming source and target.
pub fn convert_to_expected_type(value: &Value, target: &FieldKind) -> Result<Value, FilterError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let scalar = !matches!(value, Value::List(_) | Value::Map(_));
    let value_key = value.canonical_string();
    let target_key = cache_tag(target);

    if scalar && let Some(cached) = cache::get_conversion(&value_key, &target_key) {
        return Ok(cached);
    }

    let converted = do_convert(value, target)?;

    if scalar {
        cache::insert_conversion(value_key, target_key, converted.clone());
    }

    Ok(converted)
}

// Cache key for the target kind. `label()` renders every enum as a bare
// "enum", which would let fields with different variant sets share entries;
// the tag spells the variants out.
fn cache_tag(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Enum { variants } => format!("enum<{}>", variants.join("|")),
        FieldKind::List(elem) => format!("list<{}>", cache_tag(elem)),
        FieldKind::Map { value } => format!("map<{}>", cache_tag(value)),
        other => other.label(),
    }
}

fn do_convert(value: &Value, target: &FieldKind) -> Result<Value, FilterError> {
    if matches!(target, FieldKind::Any) || matches_kind(value, target) {
        return Ok(value.clone());
    }

    if let Some(cross) = temporal::cross_convert(value, target) {
        return Ok(cross);
    }

    match (value, target) {
        (Value::Int(i), FieldKind::Float) => {
            // i64 above 2^53 loses precision as f64; filters never carry
            // values that large in practice.
            #[allow(clippy::cast_precision_loss)]
            Ok(Value::Float(*i as f64))
        }
        (Value::Float(f), FieldKind::Int) if f.fract() == 0.0 => {
            #[allow(clippy::cast_possible_truncation)]
            Ok(Value::Int(*f as i64))
        }
        (Value::Text(s), _) => convert_text(s, value, target),
        (_, FieldKind::List(elem)) => {
            let items = value
                .clone()
                .into_list()
                .iter()
                .map(|item| convert_to_expected_type(item, elem))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(items))
        }
        // Membership lists (IN, NOT_IN) against a scalar kind convert
        // element-wise.
        (Value::List(items), _) => {
            let items = items
                .iter()
                .map(|item| convert_to_expected_type(item, target))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(items))
        }
        _ => Err(coercion_error(value, target, "no conversion available")),
    }
}

fn convert_text(s: &str, original: &Value, target: &FieldKind) -> Result<Value, FilterError> {
    match target {
        FieldKind::Int => s.trim().parse::<i64>().map(Value::Int).map_err(|e| {
            coercion_error(original, target, format!("not a valid integer: {e}"))
        }),
        FieldKind::Float => s.trim().parse::<f64>().map(Value::Float).map_err(|e| {
            coercion_error(original, target, format!("not a valid number: {e}"))
        }),
        FieldKind::Bool => match s.trim() {
            t if t.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            t if t.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(coercion_error(original, target, "expected 'true' or 'false'")),
        },
        FieldKind::Enum { variants } => {
            if variants.iter().any(|v| v == s) {
                Ok(Value::Text(s.to_string()))
            } else {
                Err(coercion_error(
                    original,
                    target,
                    format!("not a variant; expected one of: {}", variants.join(", ")),
                ))
            }
        }
        FieldKind::Date | FieldKind::Time | FieldKind::DateTime | FieldKind::Timestamp => {
            if temporal::looks_temporal(s) && let Some(parsed) = temporal::parse_to_kind(s, target)
            {
                return Ok(parsed);
            }
            Err(coercion_error(original, target, "not a recognized date/time"))
        }
        FieldKind::List(elem) => {
            // JSON-shaped strings parse structurally; everything else splits
            // on commas.
            let parts: Vec<Value> = if is_json_shaped(s) {
                match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(serde_json::Value::Array(items)) => {
                        items.iter().map(Value::from_json).collect()
                    }
                    _ => {
                        return Err(coercion_error(original, target, "malformed JSON array"));
                    }
                }
            } else {
                s.split(',')
                    .map(|part| Value::Text(part.trim().to_string()))
                    .collect()
            };

            let items = parts
                .iter()
                .map(|part| convert_to_expected_type(part, elem))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(items))
        }
        FieldKind::Map { .. } | FieldKind::Object(_) => {
            if is_json_shaped(s) {
                match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(json @ serde_json::Value::Object(_)) => Ok(Value::from_json(&json)),
                    _ => Err(coercion_error(original, target, "malformed JSON object")),
                }
            } else {
                Err(coercion_error(original, target, "expected a JSON object string"))
            }
        }
        FieldKind::Text | FieldKind::Any => Ok(Value::Text(s.to_string())),
    }
}

/// BETWEEN ranges: a two-element list, or a JSON array string of two
/// elements. Bounds convert element-wise; nulls pass through for half-open
/// ranges.
pub fn convert_range_to_expected_type(
    value: &Value,
    target: &FieldKind,
) -> Result<Vec<Value>, FilterError> {
    let range = match value {
        Value::List(items) => items.clone(),
        Value::Text(s) if is_json_shaped(s) => match serde_json::from_str::<serde_json::Value>(s) {
            Ok(serde_json::Value::Array(items)) => items.iter().map(Value::from_json).collect(),
            _ => {
                return Err(coercion_error(value, target, "malformed range string"));
            }
        },
        other => {
            return Err(coercion_error(
                other,
                target,
                "range requires a list or JSON array string",
            ));
        }
    };

    if range.len() != 2 {
        return Err(coercion_error(
            value,
            target,
            format!("range requires exactly 2 values, got {}", range.len()),
        ));
    }

    range
        .iter()
        .map(|bound| convert_to_expected_type(bound, target))
        .collect()
}

/// Same classification as `convert_to_expected_type`, without converting.
#[must_use]
pub fn is_compatible_type(value: &Value, target: &FieldKind) -> bool {
    if value.is_null() || matches!(target, FieldKind::Any) || matches_kind(value, target) {
        return true;
    }

    match (value, target) {
        (Value::Int(_) | Value::Float(_), k) if k.is_numeric() => true,
        (v, k) if v.is_temporal() && k.is_temporal() => {
            temporal::cross_convert(v, k).is_some()
        }
        (Value::Text(s), FieldKind::Int) => s.trim().parse::<i64>().is_ok(),
        (Value::Text(s), FieldKind::Float) => s.trim().parse::<f64>().is_ok(),
        (Value::Text(s), FieldKind::Bool) => {
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
        }
        (Value::Text(s), FieldKind::Enum { variants }) => variants.iter().any(|v| v == s),
        (Value::Text(s), k) if k.is_temporal() => temporal::looks_temporal(s),
        (Value::List(items), FieldKind::List(elem)) => {
            items.iter().all(|item| is_compatible_type(item, elem))
        }
        (Value::Map(_), FieldKind::Map { .. } | FieldKind::Object(_)) => true,
        _ => false,
    }
}

/// Lift a value into its directly backend-comparable form: temporal-looking
/// strings parse into timestamps and naive temporals gain a UTC zone, so the
/// emitted document compares against stored dates instead of raw text.
#[must_use]
pub fn to_comparable(value: &Value) -> Value {
    match value {
        Value::Text(s) if temporal::looks_temporal(s) => {
            let key = value.canonical_string();
            if let Some(cached) = cache::get_comparable(&key) {
                return cached;
            }
            let lifted = temporal::parse_timestamp(s).map_or_else(|| value.clone(), Value::Timestamp);
            cache::insert_comparable(key, lifted.clone());
            lifted
        }
        Value::Date(_) | Value::Time(_) | Value::DateTime(_) => {
            temporal::cross_convert(value, &FieldKind::Timestamp).unwrap_or_else(|| value.clone())
        }
        Value::List(items) => Value::List(items.iter().map(to_comparable).collect()),
        other => other.clone(),
    }
}

fn matches_kind(value: &Value, target: &FieldKind) -> bool {
    match (value, target) {
        (Value::Bool(_), FieldKind::Bool)
        | (Value::Int(_), FieldKind::Int)
        | (Value::Float(_), FieldKind::Float)
        | (Value::Text(_), FieldKind::Text)
        | (Value::Date(_), FieldKind::Date)
        | (Value::Time(_), FieldKind::Time)
        | (Value::DateTime(_), FieldKind::DateTime)
        | (Value::Timestamp(_), FieldKind::Timestamp)
        | (Value::Map(_), FieldKind::Object(_)) => true,
        (Value::Text(s), FieldKind::Enum { variants }) => variants.iter().any(|v| v == s),
        (Value::List(items), FieldKind::List(elem)) => {
            items.iter().all(|item| matches_kind(item, elem))
        }
        (Value::Map(entries), FieldKind::Map { value }) => entries
            .values()
            .all(|v| v.is_null() || matches_kind(v, value)),
        _ => false,
    }
}

fn is_json_shaped(s: &str) -> bool {
    let t = s.trim();
    (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}

fn coercion_error(value: &Value, target: &FieldKind, message: impl Into<String>) -> FilterError {
    FilterError::coercion(value.to_string(), target.label(), message)
}
