//! Whitespace normalization applied before conversion.
//!
//! Quoted literals, bracketed identifiers and comments are copied untouched,
//! including ones that span lines. Cleaning clean text returns it unchanged.

use crate::recognizer::{closing_quote, skip_quoted};

/// Normalize line endings, trim lines, collapse blank runs, drop empty lines.
pub fn clean(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        let rest = &text[i..];
        if rest.starts_with("--") || rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            i += end;
            continue;
        }
        if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map(|p| p + 4).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            i += end;
            continue;
        }
        if let Some(close) = closing_quote(c) {
            let end = skip_quoted(&text, i, close);
            out.push_str(&text[i..end]);
            i = end;
            continue;
        }
        if c == '\n' {
            trim_trailing_blanks(&mut out);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            let run = text[i..]
                .find(|ch: char| !ch.is_whitespace() || ch == '\n')
                .unwrap_or(text.len() - i);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push(' ');
            }
            i += run;
            continue;
        }
        out.push(c);
        i += c.len_utf8();
    }

    trim_trailing_blanks(&mut out);
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

fn trim_trailing_blanks(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}
