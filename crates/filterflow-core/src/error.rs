use thiserror::Error as ThisError;

///
/// FilterError
///
/// Structured failure raised anywhere between receiving a filter description
/// and emitting the compiled backend document. Compilation never returns a
/// partial criteria document alongside an error.
///

#[derive(Clone, Debug, ThisError, Eq, PartialEq)]
pub enum FilterError {
    /// Malformed tree or textual expression: unbalanced parentheses,
    /// missing operands, nesting beyond the depth ceiling.
    #[error("invalid filter structure: {message}")]
    Structure { message: String },

    /// An operator token that matches no canonical name, symbol, or alias.
    #[error("{}", unknown_operator_message(input, suggestion.as_deref(), allowed))]
    UnknownOperator {
        input: String,
        suggestion: Option<String>,
        /// Grouped listing of every registered operator, for the message.
        allowed: String,
    },

    /// A field path that does not resolve against the entity schema, or
    /// resolves to a field excluded from filtering.
    #[error("cannot resolve field '{field}' on '{schema}'; valid fields: {}", valid_fields.join(", "))]
    FieldResolution {
        field: String,
        schema: String,
        valid_fields: Vec<String>,
    },

    /// Operator/field-type mismatch or a value shape the operator rejects.
    #[error("invalid use of {operator} on field '{field}': {message}")]
    Validation {
        field: String,
        operator: String,
        message: String,
    },

    /// A value that cannot be converted to the field's declared type.
    #[error("cannot convert '{value}' to {target}: {message}")]
    Coercion {
        value: String,
        target: String,
        message: String,
    },
}

impl FilterError {
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure {
            message: message.into(),
        }
    }

    pub fn validation(
        field: impl Into<String>,
        operator: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            operator: operator.into(),
            message: message.into(),
        }
    }

    pub fn coercion(
        value: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            value: value.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

fn unknown_operator_message(input: &str, suggestion: Option<&str>, allowed: &str) -> String {
    match suggestion {
        Some(s) => format!("unknown operator '{input}', did you mean '{s}'?\n{allowed}"),
        None => format!("unknown operator '{input}'\n{allowed}"),
    }
}

///
/// RegistryError
///
/// Startup-time misconfiguration of the operator registry. Distinct from
/// `FilterError` so callers can fail fast during initialization instead of
/// surfacing configuration bugs as per-request failures.
///

#[derive(Clone, Debug, ThisError, Eq, PartialEq)]
pub enum RegistryError {
    #[error("operator '{0}' is already registered")]
    DuplicateOperator(String),

    #[error("operator '{0}' is handled by the compiler and cannot be registered")]
    ReservedOperator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_operator_includes_suggestion() {
        let err = FilterError::UnknownOperator {
            input: "EQALS".to_string(),
            suggestion: Some("EQUALS".to_string()),
            allowed: "Comparison: EQUALS".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("did you mean 'EQUALS'"));
        assert!(text.contains("Comparison"));
    }

    #[test]
    fn field_resolution_lists_valid_fields() {
        let err = FilterError::FieldResolution {
            field: "agee".to_string(),
            schema: "User".to_string(),
            valid_fields: vec!["age".to_string(), "name".to_string()],
        };
        assert!(err.to_string().contains("age, name"));
    }
}
