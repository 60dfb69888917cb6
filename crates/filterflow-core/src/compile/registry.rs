use serde_json::json;
use std::{
    collections::BTreeMap,
    fmt::Write,
    sync::OnceLock,
};

use crate::{
    compile::{
        Criteria,
        pattern::{
            compile_pattern, ends_with_regex, starts_with_regex, wildcard_to_regex, word_regex,
        },
    },
    error::{FilterError, RegistryError},
    model::{FilterOperator, OperatorCategory},
    value::Value,
};

/// Builds the criteria fragment for one validated, coerced leaf.
pub type OperatorHandler = fn(&str, &Value) -> Result<Criteria, FilterError>;

///
/// OperatorRegistry
///
/// Maps operator names to compile handlers. The default registry covers the
/// built-in vocabulary; callers may register additional handlers under new
/// names. Reserved operators (GLOBAL, EXPR, CONTROL) are compiled by the
/// compiler itself and cannot be overridden.
///

pub struct OperatorRegistry {
    handlers: BTreeMap<String, Registration>,
}

struct Registration {
    category: OperatorCategory,
    handler: OperatorHandler,
}

impl OperatorRegistry {
    /// A registry preloaded with every built-in, non-reserved operator.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            handlers: BTreeMap::new(),
        };
        for op in FilterOperator::ALL {
            if op.is_reserved() {
                continue;
            }
            registry.handlers.insert(
                op.name().to_string(),
                Registration {
                    category: op.category(),
                    handler: default_handler(op),
                },
            );
        }
        registry
    }

    /// Register a custom operator. Fails on reserved names and on names
    /// already present.
    pub fn register(
        &mut self,
        name: &str,
        category: OperatorCategory,
        handler: OperatorHandler,
    ) -> Result<(), RegistryError> {
        let key = name.to_ascii_uppercase();
        if FilterOperator::ALL
            .iter()
            .any(|op| op.is_reserved() && op.name() == key)
        {
            return Err(RegistryError::ReservedOperator(key));
        }
        if self.handlers.contains_key(&key) {
            return Err(RegistryError::DuplicateOperator(key));
        }

        self.handlers.insert(key, Registration { category, handler });
        Ok(())
    }

    #[must_use]
    pub fn handler(&self, operator: FilterOperator) -> Option<OperatorHandler> {
        self.handler_by_name(operator.name())
    }

    #[must_use]
    pub fn handler_by_name(&self, name: &str) -> Option<OperatorHandler> {
        self.handlers
            .get(&name.to_ascii_uppercase())
            .map(|reg| reg.handler)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered operator names grouped by category, for help output.
    #[must_use]
    pub fn grouped_names(&self) -> String {
        let mut by_category: BTreeMap<OperatorCategory, Vec<&str>> = BTreeMap::new();
        for (name, reg) in &self.handlers {
            by_category.entry(reg.category).or_default().push(name);
        }

        let mut out = String::new();
        for (category, names) in by_category {
            let _ = writeln!(out, "{category}: {}", names.join(", "));
        }
        out
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Shared default registry, built once.
pub fn default_registry() -> &'static OperatorRegistry {
    static DEFAULT: OnceLock<OperatorRegistry> = OnceLock::new();
    DEFAULT.get_or_init(OperatorRegistry::with_defaults)
}

fn default_handler(op: FilterOperator) -> OperatorHandler {
    match op {
        FilterOperator::Equals => handle_equals,
        FilterOperator::NotEquals => handle_not_equals,
        FilterOperator::GreaterThan => handle_greater_than,
        FilterOperator::GreaterThanEqual => handle_greater_than_equal,
        FilterOperator::LessThan => handle_less_than,
        FilterOperator::LessThanEqual => handle_less_than_equal,
        FilterOperator::ContainsWord => handle_contains_word,
        FilterOperator::StartsWith => handle_starts_with,
        FilterOperator::EndsWith => handle_ends_with,
        FilterOperator::Like => handle_like,
        FilterOperator::In => handle_in,
        FilterOperator::NotIn => handle_not_in,
        FilterOperator::Exists => handle_exists,
        FilterOperator::IsNull => handle_is_null,
        FilterOperator::IsNotNull => handle_is_not_null,
        FilterOperator::Regex => handle_regex,
        FilterOperator::Between => handle_between,
        FilterOperator::NotBetween => handle_not_between,
        FilterOperator::MapValueEquals => handle_map_value_equals,
        FilterOperator::MapValueContains => handle_map_value_contains,
        FilterOperator::MapValueExists => handle_map_value_exists,
        FilterOperator::MapKeyEquals => handle_map_key_equals,
        FilterOperator::Expr | FilterOperator::Global | FilterOperator::Control => {
            handle_reserved
        }
    }
}

//
// comparison
//

fn handle_equals(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).is(value))
}

fn handle_not_equals(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).ne(value))
}

fn handle_greater_than(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).gt(value))
}

fn handle_greater_than_equal(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).gte(value))
}

fn handle_less_than(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).lt(value))
}

fn handle_less_than_equal(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).lte(value))
}

//
// string matching
//

fn handle_contains_word(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let text = expect_text(field, FilterOperator::ContainsWord, value)?;
    Ok(Criteria::where_field(field).regex(&word_regex(text), "i"))
}

fn handle_starts_with(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let text = expect_text(field, FilterOperator::StartsWith, value)?;
    Ok(Criteria::where_field(field).regex(&starts_with_regex(text), "i"))
}

fn handle_ends_with(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let text = expect_text(field, FilterOperator::EndsWith, value)?;
    Ok(Criteria::where_field(field).regex(&ends_with_regex(text), "i"))
}

fn handle_like(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let text = expect_text(field, FilterOperator::Like, value)?;
    Ok(Criteria::where_field(field).regex(&wildcard_to_regex(text), "i"))
}

fn handle_regex(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let text = expect_text(field, FilterOperator::Regex, value)?;
    compile_pattern(text)?;
    Ok(Criteria::where_field(field).regex(text, "i"))
}

//
// existence
//

/// Array-aware presence. A plain `$exists` reports an empty array or an
/// explicit null as present; here existence means the path is set, non-null,
/// and (for arrays) holds at least one element. A non-boolean value reads as
/// `true`.
fn handle_exists(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let should_exist = match value {
        Value::Bool(b) => *b,
        _ => true,
    };

    if should_exist {
        // BSON type 4 is an array; `field.0` checks for a first element.
        let not_array = Criteria::with_condition(field, json!({ "$not": { "$type": 4 } }));
        let non_empty = Criteria::where_field(format!("{field}.0")).exists(true);
        Ok(Criteria::and_operator(vec![
            Criteria::where_field(field).exists(true),
            Criteria::where_field(field).ne(&Value::Null),
            Criteria::or_operator(vec![not_array, non_empty]),
        ]))
    } else {
        Ok(Criteria::or_operator(vec![
            Criteria::where_field(field).exists(false),
            Criteria::where_field(field).is(&Value::Null),
        ]))
    }
}

fn handle_is_null(field: &str, _value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).is(&Value::Null))
}

fn handle_is_not_null(field: &str, _value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).ne(&Value::Null))
}

//
// collections
//

fn handle_in(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).in_list(&value.clone().into_list()))
}

fn handle_not_in(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    Ok(Criteria::where_field(field).nin(&value.clone().into_list()))
}

//
// ranges
//

fn handle_between(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let (low, high) = expect_bounds(field, FilterOperator::Between, value)?;
    let condition = match (low.is_null(), high.is_null()) {
        (false, false) => json!({ "$gte": low.to_json(), "$lte": high.to_json() }),
        (false, true) => json!({ "$gte": low.to_json() }),
        (true, false) => json!({ "$lte": high.to_json() }),
        (true, true) => {
            return Err(FilterError::validation(
                field,
                FilterOperator::Between.name(),
                "requires at least one bound",
            ));
        }
    };
    Ok(Criteria::with_condition(field, condition))
}

fn handle_not_between(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let (low, high) = expect_bounds(field, FilterOperator::NotBetween, value)?;
    let criteria = match (low.is_null(), high.is_null()) {
        (false, false) => Criteria::or_operator(vec![
            Criteria::where_field(field).lt(low),
            Criteria::where_field(field).gt(high),
        ]),
        (false, true) => Criteria::where_field(field).lt(low),
        (true, false) => Criteria::where_field(field).gt(high),
        (true, true) => {
            return Err(FilterError::validation(
                field,
                FilterOperator::NotBetween.name(),
                "requires at least one bound",
            ));
        }
    };
    Ok(criteria)
}

//
// maps
//

fn handle_map_value_equals(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let (key, entry) = expect_map_entry(field, FilterOperator::MapValueEquals, value)?;
    Ok(Criteria::where_field(format!("{field}.{key}")).is(entry))
}

fn handle_map_value_contains(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let (key, entry) = expect_map_entry(field, FilterOperator::MapValueContains, value)?;
    let needle = regex::escape(&entry.canonical_string());
    Ok(Criteria::where_field(format!("{field}.{key}")).regex(&needle, "i"))
}

fn handle_map_value_exists(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    match value {
        Value::Text(key) => Ok(Criteria::where_field(format!("{field}.{key}")).exists(true)),
        Value::Bool(should_exist) => Ok(Criteria::where_field(field).exists(*should_exist)),
        other => Err(FilterError::validation(
            field,
            FilterOperator::MapValueExists.name(),
            format!("expects a string key or boolean, got {}", other.type_name()),
        )),
    }
}

fn handle_map_key_equals(field: &str, value: &Value) -> Result<Criteria, FilterError> {
    let text = expect_text(field, FilterOperator::MapKeyEquals, value)?;
    Ok(Criteria::where_field(format!("{field}.{text}")).exists(true))
}

fn handle_reserved(field: &str, _value: &Value) -> Result<Criteria, FilterError> {
    Err(FilterError::structure(format!(
        "reserved operator reached the registry for field '{field}'"
    )))
}

//
// shape helpers
//

fn expect_text<'a>(
    field: &str,
    operator: FilterOperator,
    value: &'a Value,
) -> Result<&'a str, FilterError> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(FilterError::validation(
            field,
            operator.name(),
            format!("expects a string value, got {}", other.type_name()),
        )),
    }
}

fn expect_bounds<'a>(
    field: &str,
    operator: FilterOperator,
    value: &'a Value,
) -> Result<(&'a Value, &'a Value), FilterError> {
    match value {
        Value::List(items) if items.len() == 2 => Ok((&items[0], &items[1])),
        other => Err(FilterError::validation(
            field,
            operator.name(),
            format!("expects exactly two bounds, got {}", other.type_name()),
        )),
    }
}

fn expect_map_entry<'a>(
    field: &str,
    operator: FilterOperator,
    value: &'a Value,
) -> Result<(&'a str, &'a Value), FilterError> {
    match value {
        Value::Map(entries) if entries.len() == 1 => {
            let (key, entry) = entries
                .iter()
                .next()
                .ok_or_else(|| FilterError::structure("empty map entry"))?;
            Ok((key.as_str(), entry))
        }
        other => Err(FilterError::validation(
            field,
            operator.name(),
            format!(
                "expects a single key-value pair, got {}",
                other.type_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_non_reserved_operator() {
        let registry = OperatorRegistry::with_defaults();
        for op in FilterOperator::ALL {
            assert_eq!(
                registry.handler(op).is_some(),
                !op.is_reserved(),
                "{}",
                op.name()
            );
        }
    }

    #[test]
    fn reserved_names_cannot_be_registered() {
        let mut registry = OperatorRegistry::with_defaults();
        let err = registry
            .register("GLOBAL", OperatorCategory::Special, handle_equals)
            .unwrap_err();
        assert!(matches!(err, RegistryError::ReservedOperator(_)));
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let mut registry = OperatorRegistry::with_defaults();
        let err = registry
            .register("equals", OperatorCategory::Comparison, handle_equals)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateOperator(_)));
    }

    #[test]
    fn custom_operator_resolves_by_name() {
        let mut registry = OperatorRegistry::with_defaults();
        registry
            .register("near", OperatorCategory::Comparison, handle_equals)
            .unwrap();
        assert!(registry.handler_by_name("NEAR").is_some());
        assert!(registry.handler_by_name("near").is_some());
    }

    #[test]
    fn between_builds_a_closed_range() {
        let value = Value::List(vec![Value::Int(1), Value::Int(9)]);
        let criteria = handle_between("age", &value).unwrap();
        assert_eq!(
            criteria.into_document(),
            json!({ "age": { "$gte": 1, "$lte": 9 } })
        );
    }

    #[test]
    fn between_open_sides_drop_the_missing_bound() {
        let value = Value::List(vec![Value::Null, Value::Int(9)]);
        let criteria = handle_between("age", &value).unwrap();
        assert_eq!(criteria.into_document(), json!({ "age": { "$lte": 9 } }));
    }

    #[test]
    fn not_between_is_an_or_of_strict_bounds() {
        let value = Value::List(vec![Value::Int(1), Value::Int(9)]);
        let criteria = handle_not_between("age", &value).unwrap();
        assert_eq!(
            criteria.into_document(),
            json!({ "$or": [ { "age": { "$lt": 1 } }, { "age": { "$gt": 9 } } ] })
        );
    }

    #[test]
    fn like_translates_wildcards() {
        let criteria = handle_like("name", &Value::from("jo*")).unwrap();
        assert_eq!(
            criteria.into_document(),
            json!({ "name": { "$regex": "^jo.*$", "$options": "i" } })
        );
    }

    #[test]
    fn regex_compiles_case_insensitive_and_rejects_bad_patterns() {
        let criteria = handle_regex("name", &Value::from("^J.*n$")).unwrap();
        assert_eq!(
            criteria.into_document(),
            json!({ "name": { "$regex": "^J.*n$", "$options": "i" } })
        );

        assert!(handle_regex("name", &Value::from("[unclosed")).is_err());
    }

    #[test]
    fn in_wraps_a_scalar_into_a_singleton_list() {
        let criteria = handle_in("city", &Value::from("NY")).unwrap();
        assert_eq!(
            criteria.into_document(),
            json!({ "city": { "$in": ["NY"] } })
        );
    }

    #[test]
    fn map_value_equals_targets_the_dotted_path() {
        let mut entries = BTreeMap::new();
        entries.insert("color".to_string(), Value::from("red"));
        let criteria = handle_map_value_equals("attrs", &Value::Map(entries)).unwrap();
        assert_eq!(criteria.into_document(), json!({ "attrs.color": "red" }));
    }

    #[test]
    fn exists_true_requires_a_set_non_null_non_empty_value() {
        let present = handle_exists("tags", &Value::Bool(true)).unwrap().into_document();
        assert_eq!(
            present,
            json!({ "$and": [
                { "tags": { "$exists": true } },
                { "tags": { "$ne": null } },
                { "$or": [
                    { "tags": { "$not": { "$type": 4 } } },
                    { "tags.0": { "$exists": true } }
                ] }
            ] })
        );

        // A bare `field exists` condition carries no operand.
        let bare = handle_exists("tags", &Value::Null).unwrap().into_document();
        assert_eq!(bare, present);
    }

    #[test]
    fn exists_false_matches_missing_or_null() {
        let absent = handle_exists("tags", &Value::Bool(false)).unwrap();
        assert_eq!(
            absent.into_document(),
            json!({ "$or": [
                { "tags": { "$exists": false } },
                { "tags": null }
            ] })
        );
    }

    #[test]
    fn grouped_names_mention_each_category() {
        let listing = OperatorRegistry::with_defaults().grouped_names();
        assert!(listing.contains("Comparison"));
        assert!(listing.contains("EQUALS"));
        assert!(listing.contains("Map-Specific"));
    }
}
