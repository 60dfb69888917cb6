use crate::pipeline::{VirtualFieldSpec, VirtualObjectSpec};
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// FieldKind
///
/// Declared type of a schema field, the unit the coercion engine converts
/// toward and the validator checks operators against. Registered explicitly
/// by the application; nothing here is discovered at runtime.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Date,
    Time,
    DateTime,
    Timestamp,
    Enum { variants: Vec<String> },
    List(Box<FieldKind>),
    Map { value: Box<FieldKind> },
    Object(Arc<EntitySchema>),
    /// Untyped field; strict validation is skipped.
    Any,
}

impl FieldKind {
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::DateTime | Self::Timestamp)
    }

    /// Label used in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Text => "text".to_string(),
            Self::Date => "date".to_string(),
            Self::Time => "time".to_string(),
            Self::DateTime => "datetime".to_string(),
            Self::Timestamp => "timestamp".to_string(),
            Self::Enum { .. } => "enum".to_string(),
            Self::List(elem) => format!("list<{}>", elem.label()),
            Self::Map { value } => format!("map<{}>", value.label()),
            Self::Object(schema) => format!("object<{}>", schema.name),
            Self::Any => "any".to_string(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

///
/// FieldDescriptor
///
/// Per-field registration: the declared kind, filtering flags, and optional
/// virtual-field/virtual-object join metadata consumed by the pipeline
/// resolver.
///

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    /// Computed at runtime, never persisted; excluded from filtering.
    pub transient: bool,
    /// Explicitly opted out of filtering.
    pub ignored: bool,
    pub deprecated: bool,
    pub virtual_field: Option<VirtualFieldSpec>,
    pub virtual_object: Option<VirtualObjectSpec>,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            transient: false,
            ignored: false,
            deprecated: false,
            virtual_field: None,
            virtual_object: None,
        }
    }

    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    #[must_use]
    pub const fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    #[must_use]
    pub const fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    #[must_use]
    pub fn with_virtual_field(mut self, spec: VirtualFieldSpec) -> Self {
        self.virtual_field = Some(spec);
        self
    }

    #[must_use]
    pub fn with_virtual_object(mut self, spec: VirtualObjectSpec) -> Self {
        self.virtual_object = Some(spec);
        self
    }

    /// True when the field may appear in a filter.
    #[must_use]
    pub const fn is_filterable(&self) -> bool {
        !(self.transient || self.ignored || self.deprecated)
    }
}

///
/// EntitySchema
///
/// Descriptor table for one entity: the backing collection name and every
/// declared field. Nested schemas hang off `FieldKind::Object` behind an
/// `Arc` so entity graphs share definitions without cycles of ownership.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntitySchema {
    pub name: String,
    pub collection: String,
    pub fields: BTreeMap<String, FieldDescriptor>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), descriptor);
        self
    }

    /// Shorthand for a plain filterable field.
    #[must_use]
    pub fn with_kind(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.with_field(name, FieldDescriptor::new(kind))
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Names of fields eligible for filtering, for error messages.
    #[must_use]
    pub fn filterable_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, d)| d.is_filterable())
            .map(|(name, _)| name.clone())
            .collect()
    }
}
