use crate::error::FilterError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

///
/// FilterOperator
///
/// The fixed comparison vocabulary of the filter language. Each operator has
/// a canonical name (the variant), a symbol used in textual expressions, and
/// a short alias; all three parse case-insensitively.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    ContainsWord,
    StartsWith,
    EndsWith,
    Like,
    In,
    NotIn,
    Exists,
    Expr,
    IsNull,
    IsNotNull,
    Regex,
    Between,
    NotBetween,
    Global,
    MapValueEquals,
    MapValueContains,
    MapValueExists,
    MapKeyEquals,
    Control,
}

///
/// OperatorCategory
///
/// Grouping used for the operator help listing attached to unknown-operator
/// errors and for the default handler registration pass.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum OperatorCategory {
    Comparison,
    StringMatching,
    Existence,
    Collection,
    Map,
    Special,
}

impl fmt::Display for OperatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Comparison => "Comparison",
            Self::StringMatching => "String Matching",
            Self::Existence => "Existence & Null",
            Self::Collection => "Collections",
            Self::Map => "Map-Specific",
            Self::Special => "Special",
        };
        write!(f, "{label}")
    }
}

impl FilterOperator {
    pub const ALL: [Self; 25] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::GreaterThanEqual,
        Self::LessThan,
        Self::LessThanEqual,
        Self::ContainsWord,
        Self::StartsWith,
        Self::EndsWith,
        Self::Like,
        Self::In,
        Self::NotIn,
        Self::Exists,
        Self::Expr,
        Self::IsNull,
        Self::IsNotNull,
        Self::Regex,
        Self::Between,
        Self::NotBetween,
        Self::Global,
        Self::MapValueEquals,
        Self::MapValueContains,
        Self::MapValueExists,
        Self::MapKeyEquals,
        Self::Control,
    ];

    /// Canonical name, stable across serialization and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanEqual => "GREATER_THAN_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessThanEqual => "LESS_THAN_EQUAL",
            Self::ContainsWord => "CONTAINS_WORD",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT_IN",
            Self::Exists => "EXISTS",
            Self::Expr => "EXPR",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::Regex => "REGEX",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT_BETWEEN",
            Self::Global => "GLOBAL",
            Self::MapValueEquals => "MAP_VALUE_EQUALS",
            Self::MapValueContains => "MAP_VALUE_CONTAINS",
            Self::MapValueExists => "MAP_VALUE_EXISTS",
            Self::MapKeyEquals => "MAP_KEY_EQUALS",
            Self::Control => "CONTROL",
        }
    }

    /// Symbol recognized by the textual expression parser.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::ContainsWord => "~w",
            Self::StartsWith => "^",
            Self::EndsWith => "$",
            Self::Like => "*",
            Self::In => "in",
            Self::NotIn => "!in",
            Self::Exists => "exists",
            Self::Expr => "expr",
            Self::IsNull => "null",
            Self::IsNotNull => "!null",
            Self::Regex => "r",
            Self::Between => "between",
            Self::NotBetween => "!between",
            Self::Global => "@",
            Self::MapValueEquals => ":=",
            Self::MapValueContains => ":~",
            Self::MapValueExists => ":?",
            Self::MapKeyEquals => "key=",
            Self::Control => "#",
        }
    }

    /// Short alias accepted on the structured (JSON) surface.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Equals => "eq",
            Self::NotEquals => "ne",
            Self::GreaterThan => "gt",
            Self::GreaterThanEqual => "gte",
            Self::LessThan => "lt",
            Self::LessThanEqual => "lte",
            Self::ContainsWord => "cw",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::Like => "like",
            Self::In => "in",
            Self::NotIn => "nin",
            Self::Exists => "exists",
            Self::Expr => "expr",
            Self::IsNull => "null",
            Self::IsNotNull => "notNull",
            Self::Regex => "regex",
            Self::Between => "between",
            Self::NotBetween => "notBetween",
            Self::Global => "text",
            Self::MapValueEquals => "mve",
            Self::MapValueContains => "mvc",
            Self::MapValueExists => "mvx",
            Self::MapKeyEquals => "mke",
            Self::Control => "ctl",
        }
    }

    #[must_use]
    pub const fn category(self) -> OperatorCategory {
        match self {
            Self::Equals
            | Self::NotEquals
            | Self::GreaterThan
            | Self::GreaterThanEqual
            | Self::LessThan
            | Self::LessThanEqual
            | Self::Between
            | Self::NotBetween => OperatorCategory::Comparison,
            Self::ContainsWord | Self::StartsWith | Self::EndsWith | Self::Like | Self::Regex => {
                OperatorCategory::StringMatching
            }
            Self::Exists | Self::IsNull | Self::IsNotNull => OperatorCategory::Existence,
            Self::In | Self::NotIn => OperatorCategory::Collection,
            Self::MapValueEquals
            | Self::MapValueContains
            | Self::MapValueExists
            | Self::MapKeyEquals => OperatorCategory::Map,
            Self::Expr | Self::Global | Self::Control => OperatorCategory::Special,
        }
    }

    /// Operators the compiler dispatches itself rather than through the
    /// handler registry.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Global | Self::Expr | Self::Control)
    }

    /// Operators whose leaf may omit the value.
    #[must_use]
    pub const fn allows_missing_value(self) -> bool {
        matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::Exists | Self::Global | Self::Expr
        )
    }

    /// Operators whose leaf may omit the field path.
    #[must_use]
    pub const fn allows_missing_field(self) -> bool {
        matches!(self, Self::Global | Self::Expr)
    }

    /// Resolve from canonical name, symbol, or alias, case-insensitively.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let trimmed = input.trim();
        for op in Self::ALL {
            if op.name().eq_ignore_ascii_case(trimmed)
                || op.symbol().eq_ignore_ascii_case(trimmed)
                || op.alias().eq_ignore_ascii_case(trimmed)
            {
                return Ok(op);
            }
        }

        Err(FilterError::UnknownOperator {
            input: trimmed.to_string(),
            suggestion: suggest(trimmed),
            allowed: grouped_operators_message(),
        })
    }

}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for FilterOperator {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FilterOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Multi-line listing of every operator grouped by category, appended to
/// unknown-operator errors.
#[must_use]
pub fn grouped_operators_message() -> String {
    let mut out = String::from("available operators:");
    for category in [
        OperatorCategory::Comparison,
        OperatorCategory::StringMatching,
        OperatorCategory::Existence,
        OperatorCategory::Collection,
        OperatorCategory::Map,
        OperatorCategory::Special,
    ] {
        out.push_str(&format!("\n  {category}: "));
        let mut first = true;
        for op in FilterOperator::ALL {
            if op.category() == category {
                if !first {
                    out.push_str(", ");
                }
                out.push_str(&format!("{} ('{}')", op.name(), op.symbol()));
                first = false;
            }
        }
    }
    out
}

/// Nearest operator name within edit distance 3, checked against canonical
/// names and aliases.
fn suggest(input: &str) -> Option<String> {
    let lowered = input.to_ascii_lowercase();
    let mut best: Option<(usize, &'static str)> = None;

    for op in FilterOperator::ALL {
        for candidate in [op.name(), op.alias()] {
            let distance = levenshtein(&lowered, &candidate.to_ascii_lowercase());
            if distance <= 3 && best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, op.name()));
            }
        }
    }

    best.map(|(_, name)| name.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut prev = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (prev + cost).min(row[j] + 1).min(row[j + 1] + 1);
            prev = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_symbol_and_alias() {
        assert_eq!(FilterOperator::parse("EQUALS").unwrap(), FilterOperator::Equals);
        assert_eq!(FilterOperator::parse("==").unwrap(), FilterOperator::Equals);
        assert_eq!(FilterOperator::parse("eq").unwrap(), FilterOperator::Equals);
        assert_eq!(FilterOperator::parse("Gte").unwrap(), FilterOperator::GreaterThanEqual);
        assert_eq!(FilterOperator::parse("!between").unwrap(), FilterOperator::NotBetween);
        assert_eq!(FilterOperator::parse("notNull").unwrap(), FilterOperator::IsNotNull);
        assert_eq!(FilterOperator::parse(" # ").unwrap(), FilterOperator::Control);
    }

    #[test]
    fn every_operator_round_trips_through_all_spellings() {
        for op in FilterOperator::ALL {
            assert_eq!(FilterOperator::parse(op.name()).unwrap(), op);
            assert_eq!(FilterOperator::parse(op.symbol()).unwrap(), op);
            // Aliases shared with another operator resolve to the first
            // declaration; none exist in the table.
            assert_eq!(FilterOperator::parse(op.alias()).unwrap(), op);
        }
    }

    #[test]
    fn typo_gets_a_suggestion() {
        let err = FilterOperator::parse("EQALS").unwrap_err();
        match err {
            FilterError::UnknownOperator { suggestion, allowed, .. } => {
                assert_eq!(suggestion.as_deref(), Some("EQUALS"));
                assert!(allowed.contains("Comparison"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_gets_no_suggestion() {
        let err = FilterOperator::parse("zzzzzzzzzz").unwrap_err();
        match err {
            FilterError::UnknownOperator { suggestion, .. } => assert!(suggestion.is_none()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn serde_uses_canonical_name() {
        let json = serde_json::to_string(&FilterOperator::MapValueExists).unwrap();
        assert_eq!(json, "\"MAP_VALUE_EXISTS\"");
        let parsed: FilterOperator = serde_json::from_str("\":?\"").unwrap();
        assert_eq!(parsed, FilterOperator::MapValueExists);
    }
}
