use derive_more::{Deref, DerefMut};
use serde_json::{Map, Value as Json, json};
use std::fmt;

use crate::value::Value;

///
/// Criteria
///
/// A filter document under construction. Field conditions and logical
/// combinators accumulate into one JSON object that a document store can
/// evaluate directly. Derefs to the underlying map for inspection.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, PartialEq)]
pub struct Criteria {
    doc: Map<String, Json>,
}

impl Criteria {
    #[must_use]
    pub fn new() -> Self {
        Self { doc: Map::new() }
    }

    /// Consume into the finished filter document.
    #[must_use]
    pub fn into_document(self) -> Json {
        Json::Object(self.doc)
    }

    /// Start a condition on a field.
    #[must_use]
    pub fn where_field(field: impl Into<String>) -> FieldCriteria {
        FieldCriteria {
            field: field.into(),
        }
    }

    /// Attach a raw condition document to a field.
    #[must_use]
    pub fn with_condition(field: impl Into<String>, condition: Json) -> Self {
        let mut doc = Map::new();
        doc.insert(field.into(), condition);
        Self { doc }
    }

    /// Attach a raw top-level entry, e.g. `$expr`.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: Json) -> Self {
        let mut doc = Map::new();
        doc.insert(key.into(), value);
        Self { doc }
    }

    #[must_use]
    pub fn and_operator(parts: Vec<Self>) -> Self {
        Self::combine("$and", parts)
    }

    #[must_use]
    pub fn or_operator(parts: Vec<Self>) -> Self {
        Self::combine("$or", parts)
    }

    #[must_use]
    pub fn nor_operator(parts: Vec<Self>) -> Self {
        Self::combine("$nor", parts)
    }

    /// Negate a set of conditions: documents matching none of `parts`.
    #[must_use]
    pub fn not_all(parts: Vec<Self>) -> Self {
        Self::combine("$nor", vec![Self::and_operator(parts)])
    }

    fn combine(connective: &str, parts: Vec<Self>) -> Self {
        let mut parts = parts;
        // A one-element $and or $or is the element itself; $nor is not.
        if parts.len() == 1 && matches!(connective, "$and" | "$or") {
            return parts.remove(0);
        }

        let docs: Vec<Json> = parts.into_iter().map(Self::into_document).collect();
        let mut doc = Map::new();
        doc.insert(connective.to_string(), Json::Array(docs));
        Self { doc }
    }

    /// Render the compiled document as an infix expression, e.g.
    /// `age >= 18 && (city == "NY" || city == "LA")`.
    #[must_use]
    pub fn to_readable_expression(&self) -> String {
        render_object(&self.doc, true)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Json::Object(self.doc.clone()))
    }
}

///
/// FieldCriteria
///
/// Builder for conditions scoped to one field.
///

pub struct FieldCriteria {
    field: String,
}

impl FieldCriteria {
    #[must_use]
    pub fn is(self, value: &Value) -> Criteria {
        Criteria::with_condition(self.field, value.to_json())
    }

    #[must_use]
    pub fn ne(self, value: &Value) -> Criteria {
        self.condition("$ne", value.to_json())
    }

    #[must_use]
    pub fn gt(self, value: &Value) -> Criteria {
        self.condition("$gt", value.to_json())
    }

    #[must_use]
    pub fn gte(self, value: &Value) -> Criteria {
        self.condition("$gte", value.to_json())
    }

    #[must_use]
    pub fn lt(self, value: &Value) -> Criteria {
        self.condition("$lt", value.to_json())
    }

    #[must_use]
    pub fn lte(self, value: &Value) -> Criteria {
        self.condition("$lte", value.to_json())
    }

    #[must_use]
    pub fn in_list(self, values: &[Value]) -> Criteria {
        let items: Vec<Json> = values.iter().map(Value::to_json).collect();
        self.condition("$in", Json::Array(items))
    }

    #[must_use]
    pub fn nin(self, values: &[Value]) -> Criteria {
        let items: Vec<Json> = values.iter().map(Value::to_json).collect();
        self.condition("$nin", Json::Array(items))
    }

    #[must_use]
    pub fn regex(self, pattern: &str, options: &str) -> Criteria {
        if options.is_empty() {
            self.condition("$regex", Json::String(pattern.to_string()))
        } else {
            Criteria::with_condition(
                self.field,
                json!({ "$regex": pattern, "$options": options }),
            )
        }
    }

    #[must_use]
    pub fn exists(self, should_exist: bool) -> Criteria {
        self.condition("$exists", Json::Bool(should_exist))
    }

    fn condition(self, op: &str, value: Json) -> Criteria {
        let mut inner = Map::new();
        inner.insert(op.to_string(), value);
        Criteria::with_condition(self.field, Json::Object(inner))
    }
}

//
// readable rendering
//

const CONNECTIVES: &[(&str, &str)] = &[("$and", "&&"), ("$or", "||"), ("$nor", "!|")];

fn render_object(doc: &Map<String, Json>, top: bool) -> String {
    let parts: Vec<String> = doc
        .iter()
        .map(|(key, value)| render_entry(key, value))
        .collect();

    let joined = parts.join(" && ");
    if top || parts.len() <= 1 {
        joined
    } else {
        format!("({joined})")
    }
}

fn render_entry(key: &str, value: &Json) -> String {
    for (mongo, symbol) in CONNECTIVES {
        if key == *mongo {
            let children: Vec<String> = value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Json::as_object)
                        .map(|obj| render_object(obj, false))
                        .collect()
                })
                .unwrap_or_default();
            return format!("({})", children.join(&format!(" {symbol} ")));
        }
    }

    if key == "$expr" {
        return format!("$expr({value})");
    }

    match value {
        Json::Object(ops) => {
            let parts: Vec<String> = ops
                .iter()
                .map(|(op, operand)| format!("{key} {} {operand}", op_symbol(op)))
                .collect();
            parts.join(" && ")
        }
        other => format!("{key} == {other}"),
    }
}

fn op_symbol(op: &str) -> &str {
    match op {
        "$ne" => "!=",
        "$gt" => ">",
        "$gte" => ">=",
        "$lt" => "<",
        "$lte" => "<=",
        "$in" => "in",
        "$nin" => "!in",
        "$regex" => "~",
        "$exists" => "exists",
        "$not" => "!",
        other => other,
    }
}
