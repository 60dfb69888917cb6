use log::debug;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, OnceLock},
};

use crate::{
    coerce::{looks_temporal, parse_timestamp},
    compile::Criteria,
    error::FilterError,
    model::{FilterOperator, FilterOptions},
    schema::{EntitySchema, FieldKind},
    value::Value,
};

///
/// SearchableFields
///
/// The flattened field paths a global keyword fans out over, split by how
/// the keyword can match them.
///

#[derive(Clone, Debug, Default)]
struct SearchableFields {
    text: Vec<String>,
    numeric: Vec<String>,
    temporal: Vec<String>,
}

static SEARCHABLE: OnceLock<Mutex<BTreeMap<(String, usize), SearchableFields>>> = OnceLock::new();

fn searchable_cache() -> &'static Mutex<BTreeMap<(String, usize), SearchableFields>> {
    SEARCHABLE.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Expand a GLOBAL keyword into an OR across every searchable field of the
/// schema. Text fields get a case-insensitive contains match; numeric and
/// temporal fields get an equality match when the keyword parses as one.
pub fn resolve_global_search(
    schema: &EntitySchema,
    keyword: &Value,
    options: &FilterOptions,
) -> Result<Criteria, FilterError> {
    let keyword = keyword.canonical_string();
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(FilterError::validation(
            "<global>",
            FilterOperator::Global.name(),
            "search keyword must not be empty",
        ));
    }

    let fields = searchable_fields(schema, options.global_search_depth);
    let mut parts: Vec<Criteria> = Vec::new();

    for path in &fields.text {
        if !field_permitted(path, options) {
            continue;
        }
        parts.push(Criteria::where_field(path.as_str()).regex(&regex::escape(keyword), "i"));
    }

    if let Some(numeric) = parse_numeric(keyword) {
        for path in &fields.numeric {
            if !field_permitted(path, options) {
                continue;
            }
            parts.push(Criteria::where_field(path.as_str()).is(&numeric));
        }
    }

    if looks_temporal(keyword)
        && let Some(instant) = parse_timestamp(keyword)
    {
        let instant = Value::Timestamp(instant);
        for path in &fields.temporal {
            if !field_permitted(path, options) {
                continue;
            }
            parts.push(Criteria::where_field(path.as_str()).is(&instant));
        }
    }

    debug!(
        "global search on '{}': {} branches for keyword '{keyword}'",
        schema.name,
        parts.len()
    );

    if parts.is_empty() {
        return Err(FilterError::validation(
            "<global>",
            FilterOperator::Global.name(),
            format!("no searchable fields on schema '{}'", schema.name),
        ));
    }

    Ok(Criteria::or_operator(parts))
}

fn field_permitted(path: &str, options: &FilterOptions) -> bool {
    if options.excluded_global_search_fields.contains(path) {
        return false;
    }
    options.allowed_global_search_fields.is_empty()
        || options.allowed_global_search_fields.contains(path)
}

fn parse_numeric(keyword: &str) -> Option<Value> {
    if let Ok(i) = keyword.parse::<i64>() {
        return Some(Value::Int(i));
    }
    keyword.parse::<f64>().ok().map(Value::Float)
}

fn searchable_fields(schema: &EntitySchema, depth: usize) -> SearchableFields {
    let key = (schema.name.clone(), depth);
    if let Ok(cache) = searchable_cache().lock()
        && let Some(fields) = cache.get(&key)
    {
        return fields.clone();
    }

    let mut fields = SearchableFields::default();
    let mut visiting = BTreeSet::new();
    collect_fields(schema, "", depth, &mut visiting, &mut fields);

    if let Ok(mut cache) = searchable_cache().lock() {
        cache.insert(key, fields.clone());
    }
    fields
}

fn collect_fields(
    schema: &EntitySchema,
    prefix: &str,
    remaining_depth: usize,
    visiting: &mut BTreeSet<String>,
    out: &mut SearchableFields,
) {
    if remaining_depth == 0 || !visiting.insert(schema.name.clone()) {
        return;
    }

    for (name, descriptor) in &schema.fields {
        if !descriptor.is_filterable() {
            continue;
        }
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        classify(&descriptor.kind, &path, remaining_depth, visiting, out);
    }

    visiting.remove(&schema.name);
}

fn classify(
    kind: &FieldKind,
    path: &str,
    remaining_depth: usize,
    visiting: &mut BTreeSet<String>,
    out: &mut SearchableFields,
) {
    match kind {
        FieldKind::Text | FieldKind::Enum { .. } => out.text.push(path.to_string()),
        FieldKind::Int | FieldKind::Float => out.numeric.push(path.to_string()),
        FieldKind::Date | FieldKind::Time | FieldKind::DateTime | FieldKind::Timestamp => {
            out.temporal.push(path.to_string());
        }
        FieldKind::List(inner) | FieldKind::Map { value: inner } => {
            classify(inner, path, remaining_depth, visiting, out);
        }
        FieldKind::Object(nested) => {
            collect_fields(nested, path, remaining_depth - 1, visiting, out);
        }
        FieldKind::Bool | FieldKind::Any => {}
    }
}
