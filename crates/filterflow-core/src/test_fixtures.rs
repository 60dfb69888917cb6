//! Shared schema fixtures for unit tests.

use std::sync::Arc;

use crate::schema::{EntitySchema, FieldDescriptor, FieldKind};

/// A user schema with one field of every common kind plus a nested address.
pub(crate) fn user_schema() -> EntitySchema {
    let address = EntitySchema::new("address", "")
        .with_kind("street", FieldKind::Text)
        .with_kind("city", FieldKind::Text)
        .with_kind("zip", FieldKind::Text);

    EntitySchema::new("user", "users")
        .with_kind("name", FieldKind::Text)
        .with_kind("email", FieldKind::Text)
        .with_kind("age", FieldKind::Int)
        .with_kind("score", FieldKind::Float)
        .with_kind("active", FieldKind::Bool)
        .with_kind("city", FieldKind::Text)
        .with_kind(
            "status",
            FieldKind::Enum {
                variants: vec!["ACTIVE".to_string(), "SUSPENDED".to_string()],
            },
        )
        .with_kind("created", FieldKind::Timestamp)
        .with_kind("birth_date", FieldKind::Date)
        .with_kind("tags", FieldKind::List(Box::new(FieldKind::Text)))
        .with_kind(
            "attrs",
            FieldKind::Map {
                value: Box::new(FieldKind::Text),
            },
        )
        .with_field("address", FieldDescriptor::new(FieldKind::Object(Arc::new(address))))
        .with_field("internal", FieldDescriptor::new(FieldKind::Text).transient())
}
