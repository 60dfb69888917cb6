//! End-to-end: textual expression in, filter document out.

use serde_json::json;

use filterflow_core::{
    coerce,
    compile::{Compiler, default_registry},
    model::{FilterGroup, FilterOperator, FilterOptions, FilterRequest, LogicMode},
    parser::{parse_expression, parse_single_expression},
    schema::{EntitySchema, FieldKind},
    value::Value,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn user_schema() -> EntitySchema {
    init_logging();
    EntitySchema::new("user", "users")
        .with_kind("name", FieldKind::Text)
        .with_kind("age", FieldKind::Int)
        .with_kind("city", FieldKind::Text)
        .with_kind("active", FieldKind::Bool)
        .with_kind("created", FieldKind::Timestamp)
        .with_kind("tags", FieldKind::List(Box::new(FieldKind::Text)))
}

fn compile(group: &FilterGroup) -> serde_json::Value {
    let schema = user_schema();
    Compiler::new(&schema, default_registry())
        .compile(group, &FilterOptions::default())
        .expect("compile should succeed")
        .into_document()
}

#[test]
fn parsed_and_built_trees_compile_to_the_same_document() {
    let parsed = parse_expression("age >= 18 && active == true").unwrap();

    let built = FilterGroup::from_requests(vec![
        FilterRequest::gte("age", Value::Int(18)),
        FilterRequest::eq("active", Value::Bool(true)),
    ]);

    assert_eq!(compile(&parsed), compile(&built));
}

#[test]
fn mixed_connectives_compile_to_nested_documents() {
    let parsed = parse_expression("age >= 18 && (city == 'NY' || city == 'LA')").unwrap();
    let doc = compile(&parsed);

    assert_eq!(
        doc,
        json!({ "$and": [
            { "age": { "$gte": 18 } },
            { "$or": [ { "city": "NY" }, { "city": "LA" } ] }
        ] })
    );
}

#[test]
fn every_comparison_symbol_round_trips() {
    for (expr, expected) in [
        ("age == 21", json!({ "age": 21 })),
        ("age != 21", json!({ "age": { "$ne": 21 } })),
        ("age > 21", json!({ "age": { "$gt": 21 } })),
        ("age >= 21", json!({ "age": { "$gte": 21 } })),
        ("age < 21", json!({ "age": { "$lt": 21 } })),
        ("age <= 21", json!({ "age": { "$lte": 21 } })),
    ] {
        let parsed = parse_expression(expr).unwrap();
        assert_eq!(compile(&parsed), expected, "for {expr}");
    }
}

#[test]
fn string_operand_coerces_to_the_declared_field_type() {
    let parsed = parse_expression("age > '21'").unwrap();
    assert_eq!(compile(&parsed), json!({ "age": { "$gt": 21 } }));
}

#[test]
fn in_list_compiles_with_typed_elements() {
    let parsed = parse_expression("age in [18, 21, 30]").unwrap();
    assert_eq!(
        compile(&parsed),
        json!({ "age": { "$in": [18, 21, 30] } })
    );
}

#[test]
fn between_compiles_to_a_closed_range() {
    let parsed = parse_expression("age between [18, 30]").unwrap();
    assert_eq!(
        compile(&parsed),
        json!({ "age": { "$gte": 18, "$lte": 30 } })
    );
}

#[test]
fn control_directives_are_stripped_before_compiling() {
    let mut group = FilterGroup::from_requests(vec![
        FilterRequest::gte("age", Value::Int(18)),
        FilterRequest::control("debug", Value::Bool(true)),
        FilterRequest::control("failFast", Value::Bool(true)),
    ]);

    let options = FilterOptions::from_filter_group(&mut group).unwrap();
    assert!(options.debug);
    assert!(options.fail_fast);
    assert_eq!(group.count_components(), 1);

    let schema = user_schema();
    let doc = Compiler::new(&schema, default_registry())
        .compile(&group, &options)
        .unwrap()
        .into_document();
    assert_eq!(doc, json!({ "age": { "$gte": 18 } }));
}

#[test]
fn unknown_field_errors_list_the_valid_ones() {
    let parsed = parse_expression("salary > 100").unwrap();
    let schema = user_schema();
    let err = Compiler::new(&schema, default_registry())
        .compile(&parsed, &FilterOptions::default())
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("salary"), "{message}");
    assert!(message.contains("age"), "{message}");
}

#[test]
fn normalized_trees_compile_like_the_originals() {
    let mut group = FilterGroup::from_requests(vec![
        FilterRequest::gte("age", Value::Int(18)),
        FilterRequest::eq("active", Value::Bool(true)),
    ]);
    let before = compile(&group.clone());
    group.normalize();
    assert_eq!(before, compile(&group));
}

#[test]
fn every_operator_spelling_parses_to_the_built_leaf() {
    for op in FilterOperator::ALL {
        for spelling in [op.symbol(), op.alias(), op.name()] {
            let fragment = format!("f {spelling} v");
            let parsed = parse_single_expression(&fragment).unwrap();
            let built = FilterRequest::new("f", op, Value::Text("v".into()));
            assert_eq!(parsed, built, "for '{fragment}'");
        }
    }
}

#[test]
fn enum_conversions_never_share_cache_entries_across_variant_sets() {
    let status = FieldKind::Enum {
        variants: vec!["ACTIVE".into(), "SUSPENDED".into()],
    };
    let color = FieldKind::Enum {
        variants: vec!["RED".into(), "BLUE".into()],
    };
    let keyword = Value::Text("ACTIVE".into());

    // Prime the process-wide cache against one variant set, then convert the
    // same keyword against a disjoint one.
    assert!(coerce::convert_to_expected_type(&keyword, &status).is_ok());
    assert!(coerce::convert_to_expected_type(&keyword, &status).is_ok());
    assert!(coerce::convert_to_expected_type(&keyword, &color).is_err());
}

#[test]
fn conversion_cache_reports_activity() {
    let parsed = parse_expression("age > '33'").unwrap();
    compile(&parsed);
    compile(&parsed);

    let stats = coerce::stats();
    assert!(stats.conversions >= 1, "{stats:?}");
    assert!(stats.hits + stats.misses >= 1, "{stats:?}");
}

#[test]
fn global_search_expands_over_text_fields() {
    let parsed = parse_expression("_ @ smith").unwrap();
    let doc = compile(&parsed);
    let rendered = doc.to_string();
    assert!(rendered.contains("name"), "{rendered}");
    assert!(rendered.contains("smith"), "{rendered}");
}
