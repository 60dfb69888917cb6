use serde_json::Value as Json;
use std::collections::BTreeMap;

///
/// VirtualFieldSpec
///
/// Declarative join metadata for a field materialized at query time instead
/// of stored on the document. Exactly one of the modes applies: count,
/// recursive, remap, or projection.
///

#[derive(Clone, Debug, PartialEq)]
pub struct VirtualFieldSpec {
    pub from_collection: String,
    pub local_field: String,
    pub foreign_field: String,
    pub project_field: Option<String>,
    pub expression: Option<Json>,
    pub criteria: Option<Json>,
    pub count: bool,
    pub recursive: bool,
    pub children_field: String,
    pub local_field_as_object_id: bool,
    pub remap: Option<BTreeMap<String, String>>,
}

impl VirtualFieldSpec {
    #[must_use]
    pub fn new(from_collection: impl Into<String>) -> Self {
        Self {
            from_collection: from_collection.into(),
            local_field: "_id".to_string(),
            foreign_field: "_id".to_string(),
            project_field: None,
            expression: None,
            criteria: None,
            count: false,
            recursive: false,
            children_field: "children".to_string(),
            local_field_as_object_id: false,
            remap: None,
        }
    }

    #[must_use]
    pub fn local_field(mut self, field: impl Into<String>) -> Self {
        self.local_field = field.into();
        self
    }

    #[must_use]
    pub fn foreign_field(mut self, field: impl Into<String>) -> Self {
        self.foreign_field = field.into();
        self
    }

    #[must_use]
    pub fn project_field(mut self, field: impl Into<String>) -> Self {
        self.project_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn expression(mut self, expression: Json) -> Self {
        self.expression = Some(expression);
        self
    }

    /// Extra join-time conditions merged into the lookup `$match`.
    #[must_use]
    pub fn criteria(mut self, criteria: Json) -> Self {
        self.criteria = Some(criteria);
        self
    }

    #[must_use]
    pub const fn count(mut self) -> Self {
        self.count = true;
        self
    }

    #[must_use]
    pub fn recursive(mut self, children_field: impl Into<String>) -> Self {
        self.recursive = true;
        self.children_field = children_field.into();
        self
    }

    #[must_use]
    pub const fn local_field_as_object_id(mut self) -> Self {
        self.local_field_as_object_id = true;
        self
    }

    #[must_use]
    pub fn remap(mut self, mapping: BTreeMap<String, String>) -> Self {
        self.remap = Some(mapping);
        self
    }
}

///
/// VirtualObjectSpec
///
/// Embeds a single joined document under an alias, array-safe on the local
/// side and capped at one match.
///

#[derive(Clone, Debug, PartialEq)]
pub struct VirtualObjectSpec {
    pub from_collection: String,
    pub local_field: String,
    pub foreign_field: String,
    pub alias: Option<String>,
    pub project_fields: Vec<String>,
    pub local_field_as_object_id: bool,
}

impl VirtualObjectSpec {
    #[must_use]
    pub fn new(
        from_collection: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            from_collection: from_collection.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            alias: None,
            project_fields: Vec::new(),
            local_field_as_object_id: false,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn project_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.project_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn local_field_as_object_id(mut self) -> Self {
        self.local_field_as_object_id = true;
        self
    }
}
