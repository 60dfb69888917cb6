use crate::{
    error::FilterError,
    schema::{EntitySchema, FieldKind},
};
use std::{
    collections::BTreeMap,
    sync::{Mutex, OnceLock},
};

// Resolution results recur heavily within one compiled tree and across
// requests against the same schema, so they are memoized process-wide.
// Entries are immutable once written; schemas are expected to be registered
// once at startup.
static CACHE: OnceLock<Mutex<BTreeMap<(String, String), FieldKind>>> = OnceLock::new();

const CACHE_DISABLED: bool = cfg!(test);

/// Resolve a dotted field path against a registered schema.
///
/// Each segment descends one level: collections and maps are transparent
/// (the next segment resolves against their element or value kind), `Object`
/// descends into the nested schema, and `Any` swallows the rest of the path.
/// Unknown segments and fields flagged transient/ignored/deprecated fail
/// with a field-resolution error listing the schema's filterable fields.
pub fn resolve_field(schema: &EntitySchema, path: &str) -> Result<FieldKind, FilterError> {
    if path.trim().is_empty() {
        return Err(FilterError::structure("field path cannot be empty"));
    }

    let key = (schema.name.clone(), path.to_string());
    if !CACHE_DISABLED
        && let Some(kind) = cache().lock().ok().and_then(|c| c.get(&key).cloned())
    {
        return Ok(kind);
    }

    let kind = resolve_uncached(schema, path)?;

    if !CACHE_DISABLED && let Ok(mut cache) = cache().lock() {
        cache.insert(key, kind.clone());
    }

    Ok(kind)
}

fn resolve_uncached(schema: &EntitySchema, path: &str) -> Result<FieldKind, FilterError> {
    let mut current = FieldKind::Object(std::sync::Arc::new(schema.clone()));
    let mut previous = schema.name.clone();

    for raw in path.split('.') {
        // Positional markers like "items[0]" address the same element kind.
        let segment = strip_index_suffix(raw);

        current = match unwrap_lists(current) {
            FieldKind::Object(nested) => {
                let descriptor =
                    nested
                        .field(segment)
                        .ok_or_else(|| FilterError::FieldResolution {
                            field: segment.to_string(),
                            schema: nested.name.clone(),
                            valid_fields: nested.filterable_field_names(),
                        })?;

                if !descriptor.is_filterable() {
                    let reason = if descriptor.transient {
                        "transient"
                    } else if descriptor.ignored {
                        "ignored"
                    } else {
                        "deprecated"
                    };
                    return Err(FilterError::validation(
                        segment,
                        "FIELD",
                        format!("field is marked {reason} and cannot be used for filtering"),
                    ));
                }

                descriptor.kind.clone()
            }
            // Map keys are free-form; the segment addresses the value kind.
            FieldKind::Map { value } => *value,
            // Untyped from here on; remaining segments resolve to Any.
            FieldKind::Any => return Ok(FieldKind::Any),
            other => {
                return Err(FilterError::validation(
                    path,
                    "FIELD",
                    format!("'{previous}' is a {other} and has no nested field"),
                ));
            }
        };

        previous = segment.to_string();
    }

    Ok(current)
}

/// Lists are transparent to path descent; each segment addresses the
/// element kind.
fn unwrap_lists(kind: FieldKind) -> FieldKind {
    match kind {
        FieldKind::List(elem) => unwrap_lists(*elem),
        other => other,
    }
}

fn strip_index_suffix(segment: &str) -> &str {
    segment.find('[').map_or(segment, |i| &segment[..i])
}

fn cache() -> &'static Mutex<BTreeMap<(String, String), FieldKind>> {
    CACHE.get_or_init(|| Mutex::new(BTreeMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;
    use std::sync::Arc;

    fn address_schema() -> EntitySchema {
        EntitySchema::new("Address", "addresses")
            .with_kind("city", FieldKind::Text)
            .with_kind("zip", FieldKind::Text)
    }

    fn user_schema() -> EntitySchema {
        EntitySchema::new("User", "users")
            .with_kind("age", FieldKind::Int)
            .with_kind("name", FieldKind::Text)
            .with_kind("address", FieldKind::Object(Arc::new(address_schema())))
            .with_kind("tags", FieldKind::List(Box::new(FieldKind::Text)))
            .with_kind(
                "attributes",
                FieldKind::Map {
                    value: Box::new(FieldKind::Int),
                },
            )
            .with_kind("extra", FieldKind::Any)
            .with_field("cached_score", FieldDescriptor::new(FieldKind::Int).transient())
    }

    #[test]
    fn resolves_scalar_and_nested_paths() {
        let schema = user_schema();
        assert_eq!(resolve_field(&schema, "age").unwrap(), FieldKind::Int);
        assert_eq!(resolve_field(&schema, "address.city").unwrap(), FieldKind::Text);
    }

    #[test]
    fn containers_are_transparent() {
        let schema = EntitySchema::new("Order", "orders").with_kind(
            "items",
            FieldKind::List(Box::new(FieldKind::Object(Arc::new(
                EntitySchema::new("Item", "").with_kind("sku", FieldKind::Text),
            )))),
        );
        assert_eq!(resolve_field(&schema, "items.sku").unwrap(), FieldKind::Text);
        assert_eq!(resolve_field(&schema, "items[0].sku").unwrap(), FieldKind::Text);
    }

    #[test]
    fn map_keys_resolve_to_the_value_kind() {
        let schema = user_schema();
        assert_eq!(resolve_field(&schema, "attributes").unwrap(), FieldKind::Map {
            value: Box::new(FieldKind::Int)
        });
        assert_eq!(resolve_field(&schema, "attributes.score").unwrap(), FieldKind::Int);
    }

    #[test]
    fn any_swallows_remaining_segments() {
        let schema = user_schema();
        assert_eq!(resolve_field(&schema, "extra.whatever.deep").unwrap(), FieldKind::Any);
    }

    #[test]
    fn unknown_field_lists_valid_fields() {
        let schema = user_schema();
        let err = resolve_field(&schema, "agee").unwrap_err();
        match err {
            FilterError::FieldResolution { valid_fields, .. } => {
                assert!(valid_fields.contains(&"age".to_string()));
                assert!(!valid_fields.contains(&"cached_score".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transient_field_is_rejected() {
        let schema = user_schema();
        let err = resolve_field(&schema, "cached_score").unwrap_err();
        assert!(err.to_string().contains("transient"));
    }

    #[test]
    fn scalar_with_trailing_segments_is_rejected() {
        let schema = user_schema();
        assert!(resolve_field(&schema, "age.nested").is_err());
    }
}
