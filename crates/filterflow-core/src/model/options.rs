use crate::{
    coerce,
    error::FilterError,
    model::{FilterComponent, FilterGroup, FilterOperator},
    schema::FieldKind,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const DEFAULT_GLOBAL_SEARCH_DEPTH: usize = 4;

/// Control keys accepted by `#` directives, in wire spelling.
const ALLOWED_CONTROL_KEYS: &[&str] = &[
    "debug",
    "resolveVirtualFields",
    "skipCount",
    "parallel",
    "failFast",
    "projection",
    "allowedGlobalSearchFields",
    "excludedGlobalSearchFields",
    "globalSearchDepth",
];

///
/// ProjectionOptions
///
/// Field lists applied as a projection stage by the execution layer.
/// Addressable from control directives as `projection.include` /
/// `projection.exclude`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProjectionOptions {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

///
/// FilterOptions
///
/// Execution configuration carried alongside a filter tree. Built from
/// defaults, then overridden by `#` control directives lifted out of the
/// tree before compilation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterOptions {
    pub debug: bool,
    pub resolve_virtual_fields: bool,
    pub skip_count: bool,
    pub parallel: bool,
    pub fail_fast: bool,
    pub projection: ProjectionOptions,
    pub allowed_global_search_fields: BTreeSet<String>,
    pub excluded_global_search_fields: BTreeSet<String>,
    pub global_search_depth: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            debug: false,
            resolve_virtual_fields: false,
            skip_count: false,
            parallel: false,
            fail_fast: false,
            projection: ProjectionOptions::default(),
            allowed_global_search_fields: BTreeSet::new(),
            excluded_global_search_fields: BTreeSet::new(),
            global_search_depth: DEFAULT_GLOBAL_SEARCH_DEPTH,
        }
    }
}

impl FilterOptions {
    /// Build options from the control directives embedded in a filter tree.
    ///
    /// Every CONTROL leaf is removed from the tree and applied as an option
    /// override; sub-groups left empty by the removal are pruned. An unknown
    /// control key fails the whole request.
    pub fn from_filter_group(group: &mut FilterGroup) -> Result<Self, FilterError> {
        let mut options = Self::default();
        options.extract_from_filter_group(group)?;
        Ok(options)
    }

    /// Same extraction applied over existing options.
    pub fn extract_from_filter_group(&mut self, group: &mut FilterGroup) -> Result<(), FilterError> {
        let mut directives = Vec::new();
        extract_controls(group, &mut directives);

        for (key, value) in directives {
            self.apply(&key, &value)?;
        }

        Ok(())
    }

    fn apply(&mut self, key: &str, value: &Value) -> Result<(), FilterError> {
        match key {
            "debug" => self.debug = as_bool(key, value)?,
            "resolveVirtualFields" | "resolveVF" => {
                self.resolve_virtual_fields = as_bool(key, value)?;
            }
            "skipCount" => self.skip_count = as_bool(key, value)?,
            "parallel" => self.parallel = as_bool(key, value)?,
            "failFast" => self.fail_fast = as_bool(key, value)?,
            "projection.include" => self.projection.include = as_string_list(key, value)?,
            "projection.exclude" => self.projection.exclude = as_string_list(key, value)?,
            "allowedGlobalSearchFields" => {
                self.allowed_global_search_fields = as_string_list(key, value)?.into_iter().collect();
            }
            "excludedGlobalSearchFields" => {
                self.excluded_global_search_fields =
                    as_string_list(key, value)?.into_iter().collect();
            }
            "globalSearchDepth" => {
                let depth = as_int(key, value)?;
                self.global_search_depth = usize::try_from(depth).map_err(|_| {
                    FilterError::validation(key, FilterOperator::Control.name(), "depth must be non-negative")
                })?;
            }
            unknown => {
                return Err(FilterError::validation(
                    unknown,
                    FilterOperator::Control.name(),
                    format!(
                        "unknown control key; allowed: {}",
                        ALLOWED_CONTROL_KEYS.join(", ")
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Remove every CONTROL leaf, collecting (key, value) pairs, and prune
/// sub-groups the removal left empty. The root group is kept even if empty.
fn extract_controls(group: &mut FilterGroup, out: &mut Vec<(String, Value)>) {
    let components = std::mem::take(&mut group.components);

    for mut component in components {
        match component {
            FilterComponent::Leaf(leaf) if leaf.operator == FilterOperator::Control => {
                out.push((leaf.field, leaf.value));
            }
            FilterComponent::Group(ref mut nested) => {
                extract_controls(nested, out);
                if !nested.is_empty() {
                    group.components.push(component);
                }
            }
            leaf => group.components.push(leaf),
        }
    }
}

fn as_bool(key: &str, value: &Value) -> Result<bool, FilterError> {
    match coerce::convert_to_expected_type(value, &FieldKind::Bool)? {
        Value::Bool(b) => Ok(b),
        other => Err(control_type_error(key, "boolean", &other)),
    }
}

fn as_int(key: &str, value: &Value) -> Result<i64, FilterError> {
    match coerce::convert_to_expected_type(value, &FieldKind::Int)? {
        Value::Int(i) => Ok(i),
        other => Err(control_type_error(key, "integer", &other)),
    }
}

fn as_string_list(key: &str, value: &Value) -> Result<Vec<String>, FilterError> {
    let converted =
        coerce::convert_to_expected_type(value, &FieldKind::List(Box::new(FieldKind::Text)))?;
    match converted {
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Text(s) => Ok(s),
                other => Err(control_type_error(key, "list of strings", &other)),
            })
            .collect(),
        other => Err(control_type_error(key, "list of strings", &other)),
    }
}

fn control_type_error(key: &str, expected: &str, got: &Value) -> FilterError {
    FilterError::validation(
        key,
        FilterOperator::Control.name(),
        format!("expected {expected}, got {}", got.type_name()),
    )
}
