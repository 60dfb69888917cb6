use crate::{
    MAX_VALUE_TOKENS,
    error::FilterError,
    model::{FilterComponent, FilterGroup, FilterOperator, FilterRequest, LogicMode},
    parser::token::tokenize,
    value::Value,
};

/// Parse a textual filter expression into a filter tree.
///
/// Precedence climbing: `||` binds loosest, `&&` tighter, parentheses and
/// single conditions tightest. Merging two sides under a connective flattens
/// into one group when every component on both sides already carries that
/// connective's mode, and nests otherwise.
pub fn parse_expression(expression: &str) -> Result<FilterGroup, FilterError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(FilterError::structure("empty filter expression"));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let group = parser.parse_or()?;

    if parser.pos < parser.tokens.len() {
        return Err(FilterError::structure(format!(
            "unexpected '{}' after end of expression",
            parser.tokens[parser.pos]
        )));
    }

    Ok(group)
}

/// Parse a single `field op value` fragment. Operator spellings (symbol,
/// alias, and canonical name) are tried longest-first with a
/// case-insensitive scan, so `>=` wins over `>`; alphanumeric spellings
/// only match on word boundaries.
pub fn parse_single_expression(fragment: &str) -> Result<FilterRequest, FilterError> {
    let fragment = fragment.trim();

    for (op, spelling) in spellings_longest_first() {
        let Some((field, raw_value)) = split_on_symbol(fragment, spelling) else {
            continue;
        };
        if raw_value.is_empty() && !op.allows_missing_value() {
            continue;
        }

        let value = if raw_value.is_empty() {
            Value::Null
        } else {
            parse_value(raw_value)
        };
        return Ok(FilterRequest::new(field, op, value));
    }

    Err(FilterError::structure(format!(
        "no valid operator found in '{fragment}'"
    )))
}

fn spellings_longest_first() -> Vec<(FilterOperator, &'static str)> {
    let mut spellings: Vec<(FilterOperator, &'static str)> = FilterOperator::ALL
        .iter()
        .flat_map(|op| [(*op, op.symbol()), (*op, op.alias()), (*op, op.name())])
        .collect();
    spellings.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
    spellings
}

///
/// Parser
///

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn parse_or(&mut self) -> Result<FilterGroup, FilterError> {
        let mut left = self.parse_and()?;
        while self.match_token("||") {
            let right = self.parse_and()?;
            left = merge(left, right, LogicMode::Or);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterGroup, FilterError> {
        let mut left = self.parse_primary()?;
        while self.match_token("&&") {
            let right = self.parse_primary()?;
            left = merge(left, right, LogicMode::And);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<FilterGroup, FilterError> {
        if self.match_token("(") {
            let group = self.parse_or()?;
            self.expect(")")?;
            return Ok(group);
        }

        let field = self
            .next_token()
            .ok_or_else(|| FilterError::structure("expected a field"))?;
        if is_delimiter(&field) {
            return Err(FilterError::structure(format!(
                "expected a field, found '{field}'"
            )));
        }
        let operator = self.next_token().ok_or_else(|| {
            FilterError::structure(format!("expected an operator after '{field}'"))
        })?;
        if is_delimiter(&operator) {
            return Err(FilterError::structure(format!(
                "expected an operator after '{field}', found '{operator}'"
            )));
        }
        // Operators like `!null` and `exists` stand alone with no operand.
        let at_break = matches!(self.peek(), None | Some("&&" | "||" | ")"));
        if at_break {
            let leaf = parse_single_expression(&format!("{field} {operator}"))?;
            let mut group = FilterGroup::new(LogicMode::And);
            group.components.push(FilterComponent::Leaf(leaf));
            return Ok(group);
        }

        let first = self.next_token().ok_or_else(|| {
            FilterError::structure(format!("expected a value after '{field} {operator}'"))
        })?;

        let mut value = first.clone();
        let mut guard = 0usize;

        if first.starts_with('[') && !first.ends_with(']') {
            // Re-accumulate a bracketed list the tokenizer could not close.
            while !value.ends_with(']') {
                let next = self.next_token().ok_or_else(|| {
                    FilterError::structure(format!("unclosed list value for '{operator}'"))
                })?;
                value.push(' ');
                value.push_str(&next);
                guard += 1;
                if guard > MAX_VALUE_TOKENS {
                    return Err(FilterError::structure(
                        "too many tokens without closing ']' in list value",
                    ));
                }
            }
        } else if !(first.starts_with('"') || first.starts_with('\'')) {
            // Unquoted values may span tokens (e.g. date-times with spaces);
            // keep consuming until a connective or group close.
            while let Some(next) = self.peek() {
                if matches!(next, "&&" | "||" | ")") {
                    break;
                }
                let next = next.to_string();
                self.pos += 1;
                value.push(' ');
                value.push_str(&next);
                guard += 1;
                if guard > MAX_VALUE_TOKENS {
                    return Err(FilterError::structure(
                        "too many tokens without a logical break in value",
                    ));
                }
            }
        }

        let leaf = parse_single_expression(&format!("{field} {operator} {value}"))?;

        let mut group = FilterGroup::new(LogicMode::And);
        group.components.push(FilterComponent::Leaf(leaf));
        Ok(group)
    }

    fn match_token(&mut self, expected: &str) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &str) -> Result<(), FilterError> {
        if self.match_token(expected) {
            Ok(())
        } else {
            Err(FilterError::structure(format!(
                "expected '{expected}' but found {}",
                self.peek().map_or_else(
                    || "end of expression".to_string(),
                    |tok| format!("'{tok}'")
                )
            )))
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next_token(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

/// Combine two sides under a connective: flatten when every component on
/// both sides already carries `mode`, otherwise nest each side in a wrapper
/// carrying `mode`.
fn merge(mut left: FilterGroup, right: FilterGroup, mode: LogicMode) -> FilterGroup {
    if all_components_have_logic(&left, mode) && all_components_have_logic(&right, mode) {
        left.components.extend(right.components);
        return left;
    }

    let mut wrap_left = FilterGroup::new(mode);
    wrap_left.components.push(FilterComponent::Group(left));
    let mut wrap_right = FilterGroup::new(mode);
    wrap_right.components.push(FilterComponent::Group(right));

    let mut outer = FilterGroup::new(mode);
    outer.components.push(FilterComponent::Group(wrap_left));
    outer.components.push(FilterComponent::Group(wrap_right));
    outer
}

fn all_components_have_logic(group: &FilterGroup, mode: LogicMode) -> bool {
    !group.components.is_empty() && group.components.iter().all(|c| c.logic() == mode)
}

/// Split a fragment on the first case-insensitive occurrence of an operator
/// symbol. Alphanumeric symbols require word boundaries so `in` never
/// matches inside a field name.
fn split_on_symbol<'a>(fragment: &'a str, symbol: &str) -> Option<(&'a str, &'a str)> {
    let haystack = fragment.to_ascii_lowercase();
    let needle = symbol.to_ascii_lowercase();
    let keyword = symbol.chars().all(|c| c.is_ascii_alphanumeric());

    let mut search_from = 0;
    while let Some(rel) = haystack[search_from..].find(&needle) {
        let at = search_from + rel;
        let end = at + needle.len();

        let bounded = !keyword
            || ((at == 0 || !is_word_char(haystack.as_bytes()[at - 1]))
                && (end == haystack.len() || !is_word_char(haystack.as_bytes()[end])));

        if bounded {
            let field = fragment[..at].trim();
            let value = fragment[end..].trim();
            return Some((field, value));
        }
        search_from = at + 1;
    }

    None
}

fn is_delimiter(token: &str) -> bool {
    matches!(token, "&&" | "||" | "(" | ")")
}

const fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Type a bare scalar token: integer, float, boolean, else text. Quoted
/// tokens stay text. Array literals split on commas with per-element typing.
fn parse_value(raw: &str) -> Value {
    if raw.starts_with('[') && raw.ends_with(']') {
        let inner = &raw[1..raw.len() - 1];
        if inner.trim().is_empty() {
            return Value::List(Vec::new());
        }
        return Value::List(inner.split(',').map(|part| parse_scalar(part.trim())).collect());
    }

    parse_scalar(raw)
}

fn parse_scalar(raw: &str) -> Value {
    let stripped = strip_quotes(raw);
    if stripped.len() != raw.len() {
        return Value::Text(stripped.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::Text(raw.to_string())
}
