use regex::Regex;
use std::{
    collections::BTreeMap,
    sync::{Mutex, OnceLock},
};

use crate::{MAX_CACHED_PATTERNS, error::FilterError};

//
// Compiled regex cache. Bounded: once full, new patterns are compiled but
// not retained. Keyed on the final pattern text.
//

static PATTERNS: OnceLock<Mutex<BTreeMap<String, Regex>>> = OnceLock::new();

fn patterns() -> &'static Mutex<BTreeMap<String, Regex>> {
    PATTERNS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Compile a pattern, serving repeats from the process-wide cache.
pub fn compile_pattern(pattern: &str) -> Result<Regex, FilterError> {
    if let Ok(cache) = patterns().lock()
        && let Some(regex) = cache.get(pattern)
    {
        return Ok(regex.clone());
    }

    let regex = Regex::new(pattern).map_err(|err| {
        FilterError::validation("<pattern>", "REGEX", format!("invalid pattern: {err}"))
    })?;

    if let Ok(mut cache) = patterns().lock()
        && cache.len() < MAX_CACHED_PATTERNS
    {
        cache.insert(pattern.to_string(), regex.clone());
    }

    Ok(regex)
}

/// Translate a wildcard expression into an anchored regex. `*` matches any
/// run of characters, `?` matches exactly one, everything else is literal.
#[must_use]
pub fn wildcard_to_regex(wildcard: &str) -> String {
    let mut out = String::with_capacity(wildcard.len() + 8);
    out.push('^');
    for ch in wildcard.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => {
                if regex_metachar(other) {
                    out.push('\\');
                }
                out.push(other);
            }
        }
    }
    out.push('$');
    out
}

/// Anchored prefix match with the literal escaped.
#[must_use]
pub fn starts_with_regex(prefix: &str) -> String {
    format!("^{}", regex::escape(prefix))
}

/// Anchored suffix match with the literal escaped.
#[must_use]
pub fn ends_with_regex(suffix: &str) -> String {
    format!("{}$", regex::escape(suffix))
}

/// Whole-word match: the literal bounded by word boundaries.
#[must_use]
pub fn word_regex(word: &str) -> String {
    format!(r"\b{}\b", regex::escape(word))
}

const fn regex_metachar(ch: char) -> bool {
    matches!(
        ch,
        '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}
