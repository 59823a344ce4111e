//! Function call recognition.
//!
//! A call site is a maximal identifier token followed, after optional
//! whitespace, by `(`. Tokens are always taken whole, so `LENGTH(` is never
//! seen as `LEN` plus trailing letters. Text inside quoted literals and
//! bracketed identifiers is skipped.

use std::ops::Range;

use nom::{IResult, bytes::complete::take_while1, character::complete::multispace0};
use serde::Serialize;

/// Keywords and type names that take a parenthesis but are not calls.
const NON_CALL_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "APPLY", "AS", "BETWEEN", "BY", "CASE", "CHECK", "DECIMAL", "DEFAULT",
    "DISTINCT", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "FETCH", "FILTER",
    "FOREIGN", "FROM", "GROUP", "HAVING", "IN", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LIKE",
    "NOT", "NUMERIC", "NVARCHAR", "ON", "OPTION", "OR", "ORDER", "OVER", "PARTITION", "PIVOT",
    "PRIMARY", "RANGE", "REFERENCES", "RETURN", "RETURNS", "ROWS", "SELECT", "SET", "SOME",
    "TABLE", "THEN", "TOP", "UNION", "UNIQUE", "UNPIVOT", "USING", "VALUES", "VARBINARY",
    "VARCHAR", "WHEN", "WHERE", "WITH", "WITHIN", "DATETIME2", "DATETIMEOFFSET",
];

/// After these words an identifier names a table, a CTE or a type.
const NAME_CONTEXT_WORDS: &[&str] = &[
    "AS", "FUNCTION", "INSERT", "INTO", "PROCEDURE", "REFERENCES", "TABLE", "VIEW", "WITH",
];

/// An `identifier(args...)` occurrence inside a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Function name as written.
    pub name: String,
    /// Raw, unsplit argument text.
    pub args: String,
    /// Byte offset of the name.
    pub start: usize,
    /// Byte offset just past the name.
    pub name_end: usize,
    /// Byte offset of the opening parenthesis.
    pub open: usize,
    /// Byte offset of the closing parenthesis.
    pub close: usize,
}

impl CallSite {
    /// Upper-cased name used for table lookups.
    pub fn normalized(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    /// Span of the whole call, name through closing parenthesis.
    pub fn span(&self) -> Range<usize> {
        self.start..self.close + 1
    }

    /// Span of the argument text between the parentheses.
    pub fn args_span(&self) -> Range<usize> {
        self.open + 1..self.close
    }
}

/// Parse an identifier token.
pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Skip a quoted run starting at `at`; returns the offset after the closing
/// quote, or the end of text.
pub(crate) fn skip_quoted(text: &str, at: usize, close: char) -> usize {
    let body = at + 1;
    match text[body..].find(close) {
        Some(p) => body + p + close.len_utf8(),
        None => text.len(),
    }
}

pub(crate) fn closing_quote(c: char) -> Option<char> {
    match c {
        '\'' => Some('\''),
        '"' => Some('"'),
        '[' => Some(']'),
        _ => None,
    }
}

/// Offset of the `)` matching the `(` at `open`.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while let Some(c) = text[i..].chars().next() {
        if let Some(close) = closing_quote(c) {
            i = skip_quoted(text, i, close);
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += c.len_utf8();
    }
    None
}

/// Find every call site in `text`, ordered by start offset.
///
/// Nested calls are reported as call sites of their own.
pub fn find_call_sites(text: &str) -> Vec<CallSite> {
    let mut sites = Vec::new();
    let mut prev_word = String::new();
    let mut prev_char: Option<char> = None;
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        if let Some(close) = closing_quote(c) {
            i = skip_quoted(text, i, close);
            prev_char = Some(close);
            prev_word.clear();
            continue;
        }

        if !is_word_char(c) {
            if !c.is_whitespace() {
                prev_word.clear();
            }
            prev_char = Some(c);
            i += c.len_utf8();
            continue;
        }

        let Ok((rest, token)) = identifier(&text[i..]) else {
            i += c.len_utf8();
            continue;
        };
        let start = i;
        let name_end = i + token.len();
        let qualified = matches!(prev_char, Some('.' | '@' | '#' | '$'));
        let upper = token.to_ascii_uppercase();

        if !qualified && !c.is_ascii_digit() {
            let (after_ws, _) = multispace0::<_, nom::error::Error<&str>>(rest)
                .unwrap_or((rest, ""));
            let open = text.len() - after_ws.len();
            let is_call = after_ws.starts_with('(')
                && !NON_CALL_WORDS.contains(&upper.as_str())
                && !NAME_CONTEXT_WORDS.contains(&prev_word.as_str());
            if is_call {
                if let Some(close) = matching_paren(text, open) {
                    sites.push(CallSite {
                        name: token.to_string(),
                        args: text[open + 1..close].to_string(),
                        start,
                        name_end,
                        open,
                        close,
                    });
                }
            }
        }

        if !c.is_ascii_digit() {
            prev_word = upper;
        }
        prev_char = token.chars().last();
        i = name_end;
    }

    sites
}

/// Split argument text on top-level commas.
///
/// Returns byte ranges relative to `args`; whitespace around each argument is
/// kept. Whitespace-only text has no arguments.
pub fn split_args(args: &str) -> Vec<Range<usize>> {
    if args.trim().is_empty() {
        return Vec::new();
    }

    let mut ranges = Vec::new();
    let mut depth = 0usize;
    let mut begin = 0;
    let mut i = 0;
    while let Some(c) = args[i..].chars().next() {
        if let Some(close) = closing_quote(c) {
            i = skip_quoted(args, i, close);
            continue;
        }
        match c {
            '(' | '{' => depth += 1,
            ')' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                ranges.push(begin..i);
                begin = i + 1;
            }
            _ => {}
        }
        i += c.len_utf8();
    }
    ranges.push(begin..args.len());
    ranges
}
