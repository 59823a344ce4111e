//! Structural validation of a single statement.
//!
//! A counting scan over parentheses, braces and quote state. Statements that
//! fail are passed through verbatim instead of being rewritten.

use crate::error::Issue;
use crate::segmenter::Statement;

/// Check the statement's delimiters are balanced and its quotes closed.
pub fn validate(statement: &Statement) -> Result<(), Issue> {
    check(&statement.text)
}

/// Same as [`validate`] on raw text.
pub fn check(text: &str) -> Result<(), Issue> {
    let mut quote: Option<char> = None;
    let mut parens: i64 = 0;
    let mut braces: i64 = 0;

    for c in text.chars() {
        if let Some(close) = quote {
            if c == close {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' => quote = Some('\''),
            '"' => quote = Some('"'),
            '[' => quote = Some(']'),
            '(' => parens += 1,
            ')' => {
                parens -= 1;
                if parens < 0 {
                    return Err(Issue::UnbalancedParentheses);
                }
            }
            '{' => braces += 1,
            '}' => {
                braces -= 1;
                if braces < 0 {
                    return Err(Issue::UnbalancedBraces);
                }
            }
            _ => {}
        }
    }

    match quote {
        Some(']') => return Err(Issue::UnterminatedIdentifier),
        Some(_) => return Err(Issue::UnterminatedString),
        None => {}
    }
    if parens != 0 {
        return Err(Issue::UnbalancedParentheses);
    }
    if braces != 0 {
        return Err(Issue::UnbalancedBraces);
    }
    Ok(())
}
