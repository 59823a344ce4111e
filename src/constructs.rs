//! Dialect constructs that are not function calls.

use crate::error::Issue;
use crate::recognizer::{closing_quote, identifier, skip_quoted};

/// Level-of-detail keywords that open a `{ ... }` expression.
const LOD_KEYWORDS: &[&str] = &["FIXED", "INCLUDE", "EXCLUDE"];

/// Find level-of-detail expressions (`{FIXED region : SUM(sales)}`).
///
/// One issue per expression, in source order. The text itself is left alone.
pub fn lod_expressions(text: &str) -> Vec<Issue> {
    let mut found = Vec::new();
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        if let Some(close) = closing_quote(c) {
            i = skip_quoted(text, i, close);
            continue;
        }
        i += c.len_utf8();
        if c != '{' {
            continue;
        }
        let body = text[i..].trim_start();
        if let Ok((_, word)) = identifier(body) {
            let upper = word.to_ascii_uppercase();
            if LOD_KEYWORDS.contains(&upper.as_str()) {
                found.push(Issue::UnsupportedConstruct(format!("{} LOD expression", upper)));
            }
        }
    }
    found
}

/// Replace `TRUE`/`FALSE` keywords with `1`/`0` outside quotes.
///
/// `x IS TRUE` and `x IS FALSE` become `x = 1` and `x = 0`. The negated
/// forms have no comparison with the same NULL behavior, so they are left as
/// written and reported.
pub fn replace_boolean_literals(text: &str) -> (String, Vec<Issue>) {
    let mut out = String::with_capacity(text.len());
    let mut issues = Vec::new();
    // Last two words as (upper-cased word, offset in `out`), reset on punctuation.
    let mut recent: Vec<(String, usize)> = Vec::new();
    let mut prev: Option<char> = None;
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        if let Some(close) = closing_quote(c) {
            let end = skip_quoted(text, i, close);
            out.push_str(&text[i..end]);
            prev = Some(close);
            recent.clear();
            i = end;
            continue;
        }
        let Ok((rest, word)) = identifier(&text[i..]) else {
            if !c.is_whitespace() {
                recent.clear();
            }
            out.push(c);
            prev = Some(c);
            i += c.len_utf8();
            continue;
        };

        let upper = word.to_ascii_uppercase();
        let qualified = matches!(prev, Some('.' | '@' | '#' | '$'));
        let called = rest.trim_start().starts_with('(');
        let literal = match upper.as_str() {
            "TRUE" if !qualified && !called => Some("1"),
            "FALSE" if !qualified && !called => Some("0"),
            _ => None,
        };
        let position = out.len();

        match (literal, recent.as_slice()) {
            (Some(_), [.., (is, _), (not, _)]) if is == "IS" && not == "NOT" => {
                issues.push(Issue::UnsupportedConstruct(format!("IS NOT {}", upper)));
                out.push_str(word);
            }
            (Some(value), [.., (is, at)]) if is == "IS" => {
                out.truncate(*at);
                out.push_str("= ");
                out.push_str(value);
            }
            (Some(value), _) => out.push_str(value),
            (None, _) => out.push_str(word),
        }

        recent.push((upper, position));
        if recent.len() > 2 {
            recent.remove(0);
        }
        prev = word.chars().last();
        i += word.len();
    }
    (out, issues)
}
