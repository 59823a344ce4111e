//! Statement segmentation.
//!
//! Splits cleaned SQL text on `;` at the top level: outside quoted literals,
//! bracketed identifiers, parentheses and braces. Comments found outside
//! quotes are detached from the statement text and kept alongside it.

use serde::Serialize;

/// One top-level statement of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Statement text without comments and without its terminator.
    pub text: String,
    /// 1-based line of the first code character.
    pub line: usize,
    /// Comments detached from this statement, in source order.
    pub comments: Vec<String>,
    /// Whether a `;` closed the statement.
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Bracket,
}

#[derive(Debug)]
struct Segmenter {
    statements: Vec<Statement>,
    buf: String,
    start_line: Option<usize>,
    pending_comments: Vec<String>,
    line: usize,
    quote: Quote,
    parens: usize,
    braces: usize,
}

impl Segmenter {
    fn new() -> Self {
        Self {
            statements: Vec::new(),
            buf: String::new(),
            start_line: None,
            pending_comments: Vec::new(),
            line: 1,
            quote: Quote::None,
            parens: 0,
            braces: 0,
        }
    }

    fn push(&mut self, c: char) {
        if self.start_line.is_none() && !c.is_whitespace() {
            self.start_line = Some(self.line);
        }
        self.buf.push(c);
        if c == '\n' {
            self.line += 1;
        }
    }

    fn comment(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.pending_comments.push(text.to_string());
        }
    }

    fn emit(&mut self, terminated: bool) {
        let text = self.buf.trim();
        if !text.is_empty() {
            self.statements.push(Statement {
                text: text.to_string(),
                line: self.start_line.unwrap_or(self.line),
                comments: std::mem::take(&mut self.pending_comments),
                terminated,
            });
        }
        self.buf.clear();
        self.start_line = None;
    }

    fn finish(mut self) -> Vec<Statement> {
        self.emit(false);
        if !self.pending_comments.is_empty() {
            if let Some(last) = self.statements.last_mut() {
                last.comments.append(&mut self.pending_comments);
            }
        }
        self.statements
    }
}

/// Split `text` into statements, preserving order.
///
/// Whitespace-only statements are dropped. A trailing statement without a
/// terminator is still returned; if the text ends inside a quote or an open
/// parenthesis the remaining tail becomes one statement.
pub fn segment(text: &str) -> Vec<Statement> {
    let mut seg = Segmenter::new();
    let mut i = 0;

    while let Some(c) = text[i..].chars().next() {
        let rest = &text[i..];

        if seg.quote != Quote::None {
            let closes = matches!(
                (seg.quote, c),
                (Quote::Single, '\'') | (Quote::Double, '"') | (Quote::Bracket, ']')
            );
            if closes {
                seg.quote = Quote::None;
            }
            seg.push(c);
            i += c.len_utf8();
            continue;
        }

        if rest.starts_with("--") || rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            seg.comment(&rest[..end]);
            i += end;
            continue;
        }

        if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map(|p| p + 4).unwrap_or(rest.len());
            seg.comment(&rest[..end]);
            // Keep the newlines so later lines keep their numbers.
            let newlines = rest[..end].matches('\n').count();
            if newlines == 0 {
                seg.push(' ');
            }
            for _ in 0..newlines {
                seg.push('\n');
            }
            i += end;
            continue;
        }

        match c {
            '\'' => seg.quote = Quote::Single,
            '"' => seg.quote = Quote::Double,
            '[' => seg.quote = Quote::Bracket,
            '(' => seg.parens += 1,
            ')' => seg.parens = seg.parens.saturating_sub(1),
            '{' => seg.braces += 1,
            '}' => seg.braces = seg.braces.saturating_sub(1),
            ';' if seg.parens == 0 && seg.braces == 0 => {
                seg.emit(true);
                i += 1;
                continue;
            }
            _ => {}
        }
        seg.push(c);
        i += c.len_utf8();
    }

    seg.finish()
}
