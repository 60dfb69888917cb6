use log::debug;
use serde_json::{Map, Value as Json, json};
use std::collections::BTreeSet;

use crate::{
    error::FilterError,
    model::FilterOptions,
    pipeline::{VirtualFieldSpec, VirtualObjectSpec},
    schema::{EntitySchema, FieldKind},
};

/// One aggregation stage document.
pub type PipelineStage = Json;

///
/// PipelineResolver
///
/// Expands the virtual-field and virtual-object declarations of a schema
/// into the aggregation stages that materialize them. Stage order per
/// virtual field: optional local-field conversions, the join, then exactly
/// one shaping step and its cleanup.
///

pub struct PipelineResolver<'a> {
    options: &'a FilterOptions,
}

impl<'a> PipelineResolver<'a> {
    #[must_use]
    pub const fn new(options: &'a FilterOptions) -> Self {
        Self { options }
    }

    pub fn resolve(&self, schema: &EntitySchema) -> Result<Vec<PipelineStage>, FilterError> {
        if !self.options.resolve_virtual_fields {
            return Ok(Vec::new());
        }

        let mut stages = Vec::new();
        let mut converted_locals = BTreeSet::new();

        for (field, descriptor) in &schema.fields {
            if let Some(spec) = &descriptor.virtual_field {
                resolve_virtual_field(
                    field,
                    &descriptor.kind,
                    spec,
                    &mut converted_locals,
                    &mut stages,
                )?;
            }
            if let Some(spec) = &descriptor.virtual_object {
                resolve_virtual_object(field, spec, &mut converted_locals, &mut stages);
            }
        }

        debug!(
            "resolved {} pipeline stage(s) for '{}'",
            stages.len(),
            schema.name
        );
        Ok(stages)
    }
}

fn resolve_virtual_field(
    field: &str,
    kind: &FieldKind,
    spec: &VirtualFieldSpec,
    converted_locals: &mut BTreeSet<String>,
    stages: &mut Vec<PipelineStage>,
) -> Result<(), FilterError> {
    // Remap mode rewrites stored variants in place; no join involved.
    if let Some(mapping) = &spec.remap {
        stages.push(remap_stage(field, &spec.local_field, mapping));
        return Ok(());
    }

    if spec.count && spec.recursive {
        return Err(FilterError::structure(format!(
            "virtual field '{field}' cannot be both count and recursive"
        )));
    }

    let mut local = spec.local_field.clone();
    if spec.local_field_as_object_id {
        local = object_id_conversion(&local, converted_locals, stages);
    }

    if spec.recursive {
        stages.push(json!({ "$graphLookup": {
            "from": spec.from_collection,
            "startWith": format!("${local}"),
            "connectFromField": spec.children_field,
            "connectToField": spec.foreign_field,
            "as": field,
        }}));
        return Ok(());
    }

    if spec.count {
        // Joining on a stringified copy keeps mixed-type keys comparable.
        let stringified = format!("{local}_str");
        stages.push(json!({ "$addFields": {
            (&stringified): { "$toString": format!("${local}") }
        }}));
        local = stringified;
    }

    let needs_temp = spec.count || spec.expression.is_some() || spec.project_field.is_some();
    let target = if needs_temp {
        format!("{field}_vf")
    } else {
        field.to_string()
    };

    stages.push(lookup_stage(spec, &local, &target));

    if spec.count {
        stages.push(json!({ "$addFields": {
            field: { "$size": { "$ifNull": [format!("${target}"), []] } }
        }}));
        stages.push(json!({ "$project": { (&target): 0, (&local): 0 } }));
        return Ok(());
    }

    if let Some(expression) = &spec.expression {
        let shaped = if matches!(kind, FieldKind::List(_)) {
            json!({ "$map": {
                "input": format!("${target}"),
                "as": "item",
                "in": rewrite_refs(expression, "$$item."),
            }})
        } else {
            rewrite_refs(expression, &format!("${target}."))
        };
        stages.push(json!({ "$addFields": { field: shaped } }));
        stages.push(json!({ "$project": { (&target): 0 } }));
    } else if let Some(projected) = &spec.project_field {
        let shaped = if matches!(kind, FieldKind::List(_)) {
            json!(format!("${target}.{projected}"))
        } else {
            json!({ "$first": format!("${target}.{projected}") })
        };
        stages.push(json!({ "$addFields": { field: shaped } }));
        stages.push(json!({ "$project": { (&target): 0 } }));
    }

    Ok(())
}

fn resolve_virtual_object(
    field: &str,
    spec: &VirtualObjectSpec,
    converted_locals: &mut BTreeSet<String>,
    stages: &mut Vec<PipelineStage>,
) {
    let mut local = spec.local_field.clone();
    if spec.local_field_as_object_id {
        local = object_id_conversion(&local, converted_locals, stages);
    }

    let alias = spec.alias.as_deref().unwrap_or(field);

    // Array-safe equality: a scalar local value is lifted into a singleton
    // list so $in covers both shapes.
    let mut pipeline = vec![
        json!({ "$match": { "$expr": { "$in": [
            format!("${}", spec.foreign_field),
            { "$cond": [
                { "$isArray": "$$local" },
                "$$local",
                ["$$local"],
            ]},
        ]}}}),
        json!({ "$limit": 1 }),
    ];

    if !spec.project_fields.is_empty() {
        let mut projection = Map::new();
        for name in &spec.project_fields {
            projection.insert(name.clone(), json!(1));
        }
        pipeline.push(Json::Object(
            [("$project".to_string(), Json::Object(projection))]
                .into_iter()
                .collect(),
        ));
    }

    stages.push(json!({ "$lookup": {
        "from": spec.from_collection,
        "let": { "local": format!("${local}") },
        "pipeline": pipeline,
        "as": alias,
    }}));
    stages.push(json!({ "$unwind": {
        "path": format!("${alias}"),
        "preserveNullAndEmptyArrays": true,
    }}));
}

fn lookup_stage(spec: &VirtualFieldSpec, local: &str, target: &str) -> PipelineStage {
    if let Some(criteria) = &spec.criteria {
        let equality = json!({ "$eq": [format!("${}", spec.foreign_field), "$$local"] });
        json!({ "$lookup": {
            "from": spec.from_collection,
            "let": { "local": format!("${local}") },
            "pipeline": [
                { "$match": { "$expr": { "$and": [equality, criteria] } } },
            ],
            "as": target,
        }})
    } else {
        json!({ "$lookup": {
            "from": spec.from_collection,
            "localField": local,
            "foreignField": spec.foreign_field,
            "as": target,
        }})
    }
}

fn object_id_conversion(
    local: &str,
    converted_locals: &mut BTreeSet<String>,
    stages: &mut Vec<PipelineStage>,
) -> String {
    let converted = format!("{local}_oid");
    if converted_locals.insert(local.to_string()) {
        stages.push(json!({ "$addFields": {
            (&converted): { "$toObjectId": format!("${local}") }
        }}));
    }
    converted
}

fn remap_stage(
    field: &str,
    local: &str,
    mapping: &std::collections::BTreeMap<String, String>,
) -> PipelineStage {
    let branches: Vec<Json> = mapping
        .iter()
        .map(|(variant, display)| {
            json!({
                "case": { "$eq": [format!("${local}"), variant] },
                "then": display,
            })
        })
        .collect();

    json!({ "$addFields": {
        field: { "$switch": { "branches": branches, "default": Json::Null } }
    }})
}

/// Rewrite `$ref` strings in a declared expression so they read from the
/// lookup output. `$$` variables and operator keys are untouched.
fn rewrite_refs(expression: &Json, prefix: &str) -> Json {
    match expression {
        Json::String(s) if s.starts_with('$') && !s.starts_with("$$") => {
            Json::String(format!("{prefix}{}", &s[1..]))
        }
        Json::Array(items) => {
            Json::Array(items.iter().map(|item| rewrite_refs(item, prefix)).collect())
        }
        Json::Object(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), rewrite_refs(value, prefix)))
                .collect(),
        ),
        other => other.clone(),
    }
}
