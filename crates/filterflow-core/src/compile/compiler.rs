use log::debug;

use crate::{
    MAX_FILTER_DEPTH,
    coerce::{convert_range_to_expected_type, convert_to_expected_type, to_comparable},
    compile::{Criteria, OperatorRegistry, global::resolve_global_search},
    error::FilterError,
    model::{FilterComponent, FilterGroup, FilterOperator, FilterOptions, FilterRequest, LogicMode},
    schema::{EntitySchema, FieldKind, resolve_field, validate_expr_value, validate_operation},
    value::Value,
};

///
/// Compiler
///
/// Walks a filter tree and produces the filter document: every leaf is
/// resolved against the schema, validated, coerced, and handed to its
/// operator handler; groups bucket their compiled children by logic mode.
///

pub struct Compiler<'a> {
    schema: &'a EntitySchema,
    registry: &'a OperatorRegistry,
}

impl<'a> Compiler<'a> {
    #[must_use]
    pub const fn new(schema: &'a EntitySchema, registry: &'a OperatorRegistry) -> Self {
        Self { schema, registry }
    }

    /// Compile a whole filter tree. With `fail_fast` set the first invalid
    /// leaf aborts; otherwise every error is collected and reported at once.
    pub fn compile(
        &self,
        group: &FilterGroup,
        options: &FilterOptions,
    ) -> Result<Criteria, FilterError> {
        let mut errors = Vec::new();
        let criteria = self.compile_group(group, options, 0, &mut errors)?;

        if !errors.is_empty() {
            return Err(FilterError::structure(format!(
                "{} invalid condition(s): {}",
                errors.len(),
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            )));
        }

        if options.debug {
            debug!(
                "compiled filter for '{}': {}",
                self.schema.name,
                criteria.to_readable_expression()
            );
        }

        Ok(criteria)
    }

    fn compile_group(
        &self,
        group: &FilterGroup,
        options: &FilterOptions,
        depth: usize,
        errors: &mut Vec<FilterError>,
    ) -> Result<Criteria, FilterError> {
        if depth >= MAX_FILTER_DEPTH {
            return Err(FilterError::structure(format!(
                "filter nesting exceeds {MAX_FILTER_DEPTH} levels"
            )));
        }

        let mut buckets: [Vec<Criteria>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];

        for component in &group.components {
            let compiled = match component {
                FilterComponent::Leaf(request) => {
                    match self.compile_leaf(request, options) {
                        Ok(criteria) => criteria,
                        Err(err) if options.fail_fast => return Err(err),
                        Err(err) => {
                            errors.push(err);
                            continue;
                        }
                    }
                }
                FilterComponent::Group(sub) => {
                    self.compile_group(sub, options, depth + 1, errors)?
                }
            };

            if !compiled.is_empty() {
                buckets[component.logic().index()].push(compiled);
            }
        }

        let mut parts: Vec<Criteria> = Vec::new();
        for mode in LogicMode::ALL {
            let bucket = std::mem::take(&mut buckets[mode.index()]);
            if bucket.is_empty() {
                continue;
            }
            parts.push(match mode {
                LogicMode::And => Criteria::and_operator(bucket),
                LogicMode::Or => Criteria::or_operator(bucket),
                LogicMode::Nor => Criteria::nor_operator(bucket),
                LogicMode::Not => Criteria::not_all(bucket),
            });
        }

        Ok(match parts.len() {
            0 => Criteria::new(),
            1 => parts.remove(0),
            _ => Criteria::and_operator(parts),
        })
    }

    fn compile_leaf(
        &self,
        request: &FilterRequest,
        options: &FilterOptions,
    ) -> Result<Criteria, FilterError> {
        request.check()?;

        match request.operator {
            FilterOperator::Control => {
                return Err(FilterError::structure(format!(
                    "control directive '{}' must be extracted before compiling",
                    request.field
                )));
            }
            FilterOperator::Global => {
                return resolve_global_search(self.schema, &request.value, options);
            }
            FilterOperator::Expr => {
                validate_expr_value(&request.field, &request.value)?;
                return Ok(Criteria::with_entry("$expr", request.value.to_json()));
            }
            _ => {}
        }

        let kind = if request.operator.allows_missing_field() {
            FieldKind::Any
        } else {
            resolve_field(self.schema, &request.field)?
        };

        validate_operation(&request.field, &kind, request.operator, &request.value)?;

        let coerced = match request.operator {
            FilterOperator::Between | FilterOperator::NotBetween => {
                Value::List(convert_range_to_expected_type(&request.value, &kind)?)
            }
            FilterOperator::Exists | FilterOperator::IsNull | FilterOperator::IsNotNull => {
                request.value.clone()
            }
            _ => convert_to_expected_type(&request.value, &kind)?,
        };
        let comparable = to_comparable(&coerced);

        let handler = self.registry.handler(request.operator).ok_or_else(|| {
            FilterError::validation(
                &request.field,
                request.operator.name(),
                "no handler registered",
            )
        })?;

        handler(&request.field, &comparable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compile::registry::default_registry,
        test_fixtures::user_schema,
        value::Value,
    };
    use serde_json::json;

    fn compile(group: &FilterGroup) -> Result<Criteria, FilterError> {
        let schema = user_schema();
        Compiler::new(&schema, default_registry()).compile(group, &FilterOptions::default())
    }

    #[test]
    fn single_condition_compiles_to_its_document() {
        let group = FilterGroup::from_requests(vec![FilterRequest::gte("age", Value::Int(18))]);
        let doc = compile(&group).unwrap().into_document();
        assert_eq!(doc, json!({ "age": { "$gte": 18 } }));
    }

    #[test]
    fn and_bucket_flattens_peers() {
        let group = FilterGroup::from_requests(vec![
            FilterRequest::gte("age", Value::Int(18)),
            FilterRequest::eq("active", Value::Bool(true)),
        ]);
        let doc = compile(&group).unwrap().into_document();
        assert_eq!(
            doc,
            json!({ "$and": [ { "age": { "$gte": 18 } }, { "active": true } ] })
        );
    }

    #[test]
    fn or_components_land_in_the_or_bucket() {
        let mut group = FilterGroup::new(LogicMode::Or);
        group.add_request(FilterRequest::eq("city", "NY").with_logic(LogicMode::Or));
        group.add_request(FilterRequest::eq("city", "LA").with_logic(LogicMode::Or));
        let doc = compile(&group).unwrap().into_document();
        assert_eq!(doc, json!({ "$or": [ { "city": "NY" }, { "city": "LA" } ] }));
    }

    #[test]
    fn string_values_coerce_to_the_field_type() {
        let group = FilterGroup::from_requests(vec![FilterRequest::gt("age", Value::from("21"))]);
        let doc = compile(&group).unwrap().into_document();
        assert_eq!(doc, json!({ "age": { "$gt": 21 } }));
    }

    #[test]
    fn unknown_field_names_the_schema() {
        let group = FilterGroup::from_requests(vec![FilterRequest::eq("nope", Value::Int(1))]);
        let err = compile(&group).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn control_leaf_is_a_structural_error() {
        let group =
            FilterGroup::from_requests(vec![FilterRequest::control("debug", Value::Bool(true))]);
        let err = compile(&group).unwrap_err();
        assert!(err.to_string().contains("control"));
    }

    #[test]
    fn expr_passes_through_validated() {
        let mut payload = std::collections::BTreeMap::new();
        payload.insert(
            "$gt".to_string(),
            Value::List(vec![Value::Text("$a".into()), Value::Text("$b".into())]),
        );
        let group = FilterGroup::from_requests(vec![FilterRequest::expr(Value::Map(payload))]);
        let doc = compile(&group).unwrap().into_document();
        assert_eq!(doc, json!({ "$expr": { "$gt": ["$a", "$b"] } }));
    }

    #[test]
    fn collected_errors_name_every_bad_leaf() {
        let group = FilterGroup::from_requests(vec![
            FilterRequest::eq("nope", Value::Int(1)),
            FilterRequest::eq("missing", Value::Int(2)),
        ]);
        let err = compile(&group).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("2 invalid"));
        assert!(message.contains("nope") && message.contains("missing"));
    }

    #[test]
    fn fail_fast_stops_at_the_first_error() {
        let schema = user_schema();
        let group = FilterGroup::from_requests(vec![
            FilterRequest::eq("nope", Value::Int(1)),
            FilterRequest::eq("missing", Value::Int(2)),
        ]);
        let options = FilterOptions {
            fail_fast: true,
            ..FilterOptions::default()
        };
        let err = Compiler::new(&schema, default_registry())
            .compile(&group, &options)
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(!err.to_string().contains("missing"));
    }

    #[test]
    fn nested_group_compiles_under_its_connective() {
        let mut or_group = FilterGroup::new(LogicMode::Or);
        or_group.add_request(FilterRequest::eq("city", "NY").with_logic(LogicMode::Or));
        or_group.add_request(FilterRequest::eq("city", "LA").with_logic(LogicMode::Or));

        let mut group = FilterGroup::new(LogicMode::And);
        group.add_request(FilterRequest::gte("age", Value::Int(18)));
        group.add_component(FilterComponent::Group(or_group));

        let doc = compile(&group).unwrap().into_document();
        assert_eq!(
            doc,
            json!({ "$and": [
                { "age": { "$gte": 18 } },
                { "$or": [ { "city": "NY" }, { "city": "LA" } ] }
            ] })
        );
    }

    #[test]
    fn empty_group_compiles_to_an_empty_document() {
        let group = FilterGroup::new(LogicMode::And);
        let doc = compile(&group).unwrap().into_document();
        assert_eq!(doc, json!({}));
    }
}
