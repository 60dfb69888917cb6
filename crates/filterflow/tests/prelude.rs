use filterflow::prelude::*;

#[test]
fn prelude_covers_the_parse_and_compile_path() {
    let schema = EntitySchema::new("user", "users")
        .with_kind("age", FieldKind::Int)
        .with_kind("name", FieldKind::Text);

    let group = parse_expression("age >= 18 && name == 'Ada'").expect("should parse");
    let criteria = Compiler::new(&schema, default_registry())
        .compile(&group, &FilterOptions::default())
        .expect("should compile");

    let rendered = criteria.to_readable_expression();
    assert!(rendered.contains("age >= 18"), "{rendered}");
}

#[test]
fn version_follows_the_workspace() {
    assert_eq!(filterflow::VERSION, env!("CARGO_PKG_VERSION"));
}
