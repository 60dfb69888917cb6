use serde::{Deserialize, Serialize};
use std::fmt;

///
/// LogicMode
///
/// Connective a component contributes under its parent group. The compiler
/// buckets sibling components by their own mode, so a single group can mix
/// AND/OR/NOR/NOT children.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicMode {
    #[default]
    And,
    Or,
    Nor,
    Not,
}

impl LogicMode {
    pub const ALL: [Self; 4] = [Self::And, Self::Or, Self::Nor, Self::Not];

    /// Index into fixed-order per-mode buckets.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::And => 0,
            Self::Or => 1,
            Self::Nor => 2,
            Self::Not => 3,
        }
    }

    /// Infix rendering used by the debug views.
    #[must_use]
    pub const fn connective(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Nor => "!|",
            Self::Not => "!&",
        }
    }
}

impl fmt::Display for LogicMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Nor => "NOR",
            Self::Not => "NOT",
        };
        write!(f, "{label}")
    }
}
