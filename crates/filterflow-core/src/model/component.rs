use crate::model::{FilterGroup, FilterRequest, LogicMode};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, IntoDeserializer},
};

///
/// FilterComponent
///
/// A node of the filter tree: a leaf condition or a nested group. The JSON
/// surface infers the variant from shape (a `components` key means group, an
/// `operator` key means leaf) unless an explicit `type` key settles it.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterComponent {
    Leaf(FilterRequest),
    Group(FilterGroup),
}

impl FilterComponent {
    /// Connective this component contributes under its parent.
    #[must_use]
    pub const fn logic(&self) -> LogicMode {
        match self {
            Self::Leaf(leaf) => leaf.logic,
            Self::Group(group) => group.logic,
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    #[must_use]
    pub const fn as_leaf(&self) -> Option<&FilterRequest> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Group(_) => None,
        }
    }

    #[must_use]
    pub const fn as_group(&self) -> Option<&FilterGroup> {
        match self {
            Self::Leaf(_) => None,
            Self::Group(group) => Some(group),
        }
    }
}

impl From<FilterRequest> for FilterComponent {
    fn from(leaf: FilterRequest) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<FilterGroup> for FilterComponent {
    fn from(group: FilterGroup) -> Self {
        Self::Group(group)
    }
}

impl<'de> Deserialize<'de> for FilterComponent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;

        let object = raw
            .as_object()
            .ok_or_else(|| de::Error::custom("filter component must be a JSON object"))?;

        let explicit = object.get("type").and_then(serde_json::Value::as_str);
        let is_group = match explicit {
            Some(t) if t.eq_ignore_ascii_case("group") => true,
            Some(t) if t.eq_ignore_ascii_case("condition") || t.eq_ignore_ascii_case("request") => {
                false
            }
            Some(other) => {
                return Err(de::Error::custom(format!(
                    "unknown filter component type '{other}'; expected 'group' or 'condition'"
                )));
            }
            None if object.contains_key("components") => true,
            None if object.contains_key("operator") => false,
            None => {
                return Err(de::Error::custom(
                    "cannot infer filter component shape; expected a 'components' key (group) \
                     or an 'operator' key (condition)",
                ));
            }
        };

        // Strip the discriminator before handing off to the inner shape.
        let mut object = object.clone();
        object.remove("type");
        let inner = serde_json::Value::Object(object).into_deserializer();

        if is_group {
            FilterGroup::deserialize(inner)
                .map(Self::Group)
                .map_err(de::Error::custom)
        } else {
            FilterRequest::deserialize(inner)
                .map(Self::Leaf)
                .map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FilterOperator;

    #[test]
    fn infers_leaf_from_operator_key() {
        let json = r#"{"field": "age", "operator": ">=", "value": 18}"#;
        let component: FilterComponent = serde_json::from_str(json).unwrap();
        let leaf = component.as_leaf().unwrap();
        assert_eq!(leaf.operator, FilterOperator::GreaterThanEqual);
    }

    #[test]
    fn infers_group_from_components_key() {
        let json = r#"{"logic": "OR", "components": [
            {"field": "city", "operator": "eq", "value": "NY"},
            {"field": "city", "operator": "eq", "value": "LA", "logic": "OR"}
        ]}"#;
        let component: FilterComponent = serde_json::from_str(json).unwrap();
        let group = component.as_group().unwrap();
        assert_eq!(group.logic, LogicMode::Or);
        assert_eq!(group.count_components(), 2);
    }

    #[test]
    fn explicit_type_wins() {
        let json = r#"{"type": "group", "components": []}"#;
        let component: FilterComponent = serde_json::from_str(json).unwrap();
        assert!(component.as_group().is_some());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"type": "grp", "components": []}"#;
        let err = serde_json::from_str::<FilterComponent>(json).unwrap_err();
        assert!(err.to_string().contains("unknown filter component type"));
    }

    #[test]
    fn shapeless_object_is_rejected() {
        let err = serde_json::from_str::<FilterComponent>(r#"{"field": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("cannot infer"));
    }
}
