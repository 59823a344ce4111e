//! Conversion orchestration.
//!
//! ```text
//! text -> segment -> per statement: validate -> find call sites -> rewrite
//!      -> record metrics -> joined output
//! ```

use tracing::{debug, warn};

use crate::constructs;
use crate::error::Issue;
use crate::mapping::MappingTable;
use crate::metrics::ConversionMetrics;
use crate::recognizer::find_call_sites;
use crate::rewriter::{ConversionResult, Disposition, RewriteEngine};
use crate::rewrites::RewriteOptions;
use crate::segmenter::{Statement, segment};
use crate::validator;

/// Conversion switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub rewrite: RewriteOptions,
    /// Turn `TRUE`/`FALSE` into `1`/`0`.
    pub rewrite_boolean_literals: bool,
    /// Re-emit detached comments above their statement.
    pub keep_comments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            rewrite: RewriteOptions::default(),
            rewrite_boolean_literals: true,
            keep_comments: true,
        }
    }
}

/// Everything known about one converted statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementOutcome {
    /// 1-based statement number.
    pub index: usize,
    pub line: usize,
    pub disposition: Disposition,
    pub original: String,
    pub converted: String,
    pub comments: Vec<String>,
    pub terminated: bool,
    /// Call site results in source order.
    pub results: Vec<ConversionResult>,
    /// Statement-level problems: syntax errors and unsupported constructs.
    pub issues: Vec<Issue>,
}

impl StatementOutcome {
    /// Output text for this statement, comments included if requested.
    pub fn render(&self, keep_comments: bool) -> String {
        let mut out = String::new();
        if keep_comments {
            for comment in &self.comments {
                push_comment(&mut out, comment);
            }
        }
        out.push_str(&self.converted);
        if self.terminated {
            out.push(';');
        }
        out
    }
}

/// Line comments become `--` comments; block comments are kept whole.
fn push_comment(out: &mut String, comment: &str) {
    if comment.starts_with("/*") {
        out.push_str(comment);
    } else {
        let body = comment
            .strip_prefix("--")
            .or_else(|| comment.strip_prefix("//"))
            .unwrap_or(comment)
            .trim();
        out.push_str("--");
        if !body.is_empty() {
            out.push(' ');
            out.push_str(body);
        }
    }
    out.push('\n');
}

/// Result of converting a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub sql: String,
    pub metrics: ConversionMetrics,
    pub statements: Vec<StatementOutcome>,
}

/// Converts SQL text against a mapping table.
#[derive(Debug, Clone)]
pub struct Converter<'t> {
    table: &'t MappingTable,
    options: ConvertOptions,
}

impl Converter<'static> {
    /// Converter over the default table.
    pub fn new() -> Self {
        Self::with_table(MappingTable::global())
    }
}

impl Default for Converter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'t> Converter<'t> {
    pub fn with_table(table: &'t MappingTable) -> Self {
        Self {
            table,
            options: ConvertOptions::default(),
        }
    }

    pub fn options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn table(&self) -> &'t MappingTable {
        self.table
    }

    /// Convert a document. Never fails; problems end up in the metrics.
    pub fn convert(&self, text: &str) -> Conversion {
        let statements: Vec<StatementOutcome> = segment(text)
            .iter()
            .enumerate()
            .map(|(i, stmt)| self.convert_statement(i + 1, stmt))
            .collect();

        let mut metrics = ConversionMetrics::new();
        for outcome in &statements {
            metrics.record(outcome);
        }

        let sql = statements
            .iter()
            .map(|s| s.render(self.options.keep_comments))
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            statements = metrics.total_statements,
            successful = metrics.successful,
            flagged = metrics.flagged,
            syntax_errors = metrics.syntax_errors,
            "conversion finished"
        );

        Conversion {
            sql,
            metrics,
            statements,
        }
    }

    /// Convert one statement. Independent of every other statement.
    pub fn convert_statement(&self, index: usize, statement: &Statement) -> StatementOutcome {
        let mut outcome = StatementOutcome {
            index,
            line: statement.line,
            disposition: Disposition::Converted,
            original: statement.text.clone(),
            converted: statement.text.clone(),
            comments: statement.comments.clone(),
            terminated: statement.terminated,
            results: Vec::new(),
            issues: Vec::new(),
        };

        if let Err(issue) = validator::validate(statement) {
            warn!(statement = index, line = statement.line, %issue, "statement passed through");
            outcome.disposition = Disposition::SyntaxError;
            outcome.issues.push(issue);
            return outcome;
        }

        outcome.issues = constructs::lod_expressions(&statement.text);

        let engine = RewriteEngine::new(self.table, &self.options.rewrite);
        let sites = find_call_sites(&statement.text);
        let rewritten = engine.rewrite(&statement.text, &sites);

        outcome.converted = if self.options.rewrite_boolean_literals {
            let (text, issues) = constructs::replace_boolean_literals(&rewritten.text);
            outcome.issues.extend(issues);
            text
        } else {
            rewritten.text
        };
        outcome.results = rewritten.results;

        let needs_review = !outcome.issues.is_empty()
            || outcome.results.iter().any(|r| r.disposition.needs_review());
        if needs_review {
            outcome.disposition = Disposition::Flagged;
        }

        debug!(
            statement = index,
            line = statement.line,
            call_sites = outcome.results.len(),
            disposition = %outcome.disposition,
            "converted statement"
        );
        outcome
    }
}

/// Convert `text` with the default table and options.
pub fn convert(text: &str) -> (String, ConversionMetrics) {
    let conversion = Converter::new().convert(text);
    (conversion.sql, conversion.metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_example() {
        let (sql, metrics) = convert("SELECT NOW() AS t, UPPER(name) FROM c;");
        assert_eq!(sql, "SELECT GETDATE() AS t, UPPER(name) FROM c;");
        assert!(metrics.flagged_items.is_empty());
        assert_eq!(metrics.successful, 1);
    }

    #[test]
    fn test_median_flagged() {
        let (sql, metrics) = convert("SELECT MEDIAN(x) FROM t;");
        assert_eq!(sql, "SELECT MEDIAN(x) FROM t;");
        assert_eq!(metrics.flagged_items.len(), 1);
        assert!(metrics.flagged_items[0].reason.contains("WITHIN GROUP"));
        assert_eq!(metrics.flagged, 1);
    }

    #[test]
    fn test_syntax_error_passthrough() {
        let (sql, metrics) = convert("SELECT UPPER(name FROM t;");
        assert_eq!(sql, "SELECT UPPER(name FROM t;");
        assert_eq!(metrics.total_statements, 1);
        assert_eq!(metrics.successful, 0);
        assert_eq!(metrics.syntax_errors, 1);
        assert_eq!(metrics.flagged_items[0].reason, "unbalanced parentheses");
    }

    #[test]
    fn test_lod_flagged_and_preserved() {
        let conversion = Converter::new().convert("SELECT {FIXED region : SUM(sales)} FROM t;");
        assert_eq!(conversion.sql, "SELECT {FIXED region : SUM(sales)} FROM t;");
        assert_eq!(conversion.statements[0].disposition, Disposition::Flagged);
        assert_eq!(
            conversion.metrics.flagged_items[0].reason,
            "FIXED LOD expression not supported"
        );
    }

    #[test]
    fn test_boolean_literals_option() {
        let sql = "SELECT IIF(a, TRUE, FALSE) FROM t";
        assert_eq!(convert(sql).0, "SELECT IIF(a, 1, 0) FROM t");

        let options = ConvertOptions {
            rewrite_boolean_literals: false,
            ..ConvertOptions::default()
        };
        let conversion = Converter::new().options(options).convert(sql);
        assert_eq!(conversion.sql, sql);
    }

    #[test]
    fn test_comments_reemitted() {
        let text = "-- totals\nSELECT SUM(x) FROM t; // tableau note\nSELECT 1;";
        assert_eq!(
            convert(text).0,
            "-- totals\nSELECT SUM(x) FROM t;\n-- tableau note\nSELECT 1;"
        );

        let options = ConvertOptions {
            keep_comments: false,
            ..ConvertOptions::default()
        };
        let conversion = Converter::new().options(options).convert(text);
        assert_eq!(conversion.sql, "SELECT SUM(x) FROM t;\nSELECT 1;");
    }

    #[test]
    fn test_custom_table() {
        let table = MappingTable::builder()
            .direct("NOW", "SYSDATETIME", crate::mapping::Category::Date)
            .build();
        let conversion = Converter::with_table(&table).convert("SELECT NOW(), UPPER(a)");
        assert_eq!(conversion.sql, "SELECT SYSDATETIME(), UPPER(a)");
        assert!(conversion.metrics.unsupported_functions.contains("UPPER"));
    }
}
