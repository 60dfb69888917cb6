use crate::error::FilterError;
use regex::Regex;
use std::sync::OnceLock;

// Single ordered-alternation scanner. Priority matters: multi-character
// operators must come before their prefixes, and the negated keyword forms
// before `!=` so `!in` does not scan as two tokens.
const TOKEN_PATTERN: &str = concat!(
    r"\s*(",
    r"\(|\)",           // grouping
    r"|&&|\|\|",        // connectives
    r"|!in|!null|!between",
    r"|:=|key=",        // map operators containing '='
    r"|>=|<=|!=|==|>|<|=",
    r"|\[[^\]]*\]",     // array literal
    r#"|"[^"]*"|'[^']*'"#,
    r"|[^\s()&|<>=!]+", // catch-all
    r")\s*",
);

static TOKENIZER: OnceLock<Option<Regex>> = OnceLock::new();

/// Split a textual filter expression into tokens. Characters no alternative
/// matches (stray `!`, unterminated quotes) fail instead of being skipped.
pub fn tokenize(expression: &str) -> Result<Vec<String>, FilterError> {
    let Some(re) = TOKENIZER
        .get_or_init(|| Regex::new(TOKEN_PATTERN).ok())
        .as_ref()
    else {
        return Err(FilterError::structure("tokenizer pattern failed to compile"));
    };

    let mut tokens = Vec::new();
    let mut consumed = 0;

    for caps in re.captures_iter(expression) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() != consumed {
            return Err(unrecognized(expression, consumed));
        }
        consumed = whole.end();
        if let Some(tok) = caps.get(1) {
            tokens.push(tok.as_str().to_string());
        }
    }

    if expression[consumed..].trim().is_empty() {
        Ok(tokens)
    } else {
        Err(unrecognized(expression, consumed))
    }
}

fn unrecognized(expression: &str, at: usize) -> FilterError {
    let fragment: String = expression[at..].chars().take(12).collect();
    FilterError::structure(format!("unrecognized input at '{fragment}'"))
}
