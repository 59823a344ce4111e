//! Metrics and flag collection.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::converter::StatementOutcome;
use crate::mapping::Category;
use crate::rewriter::{ConversionResult, Disposition};

/// A location and reason needing human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedItem {
    /// 1-based statement number.
    pub statement: usize,
    /// Source line where the statement starts.
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub reason: String,
}

/// Outcome counts for one conversion.
///
/// `successful + flagged + syntax_errors == total_statements` holds after
/// every [`record`](Self::record) and [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionMetrics {
    pub total_statements: usize,
    pub successful: usize,
    pub flagged: usize,
    pub syntax_errors: usize,
    pub flagged_items: Vec<FlaggedItem>,
    /// Upper-cased names of functions with no mapping.
    pub unsupported_functions: BTreeSet<String>,
    /// Converted call sites per function category.
    pub function_conversions: BTreeMap<Category, usize>,
}

impl ConversionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one statement's outcome.
    pub fn record(&mut self, outcome: &StatementOutcome) {
        self.total_statements += 1;
        match outcome.disposition {
            Disposition::Converted => self.successful += 1,
            Disposition::SyntaxError => self.syntax_errors += 1,
            Disposition::Flagged | Disposition::Unsupported => self.flagged += 1,
        }

        for issue in &outcome.issues {
            self.flagged_items.push(FlaggedItem {
                statement: outcome.index,
                line: outcome.line,
                function: None,
                reason: issue.to_string(),
            });
        }

        for result in &outcome.results {
            match result.disposition {
                Disposition::Converted => {
                    if let Some(category) = result.category {
                        *self.function_conversions.entry(category).or_insert(0) += 1;
                    }
                }
                Disposition::Unsupported => {
                    self.unsupported_functions
                        .insert(result.function.to_ascii_uppercase());
                    self.push_result(outcome, result);
                }
                Disposition::Flagged | Disposition::SyntaxError => {
                    self.push_result(outcome, result);
                }
            }
        }
    }

    fn push_result(&mut self, outcome: &StatementOutcome, result: &ConversionResult) {
        self.flagged_items.push(FlaggedItem {
            statement: outcome.index,
            line: outcome.line,
            function: Some(result.function.clone()),
            reason: result.reason.clone().unwrap_or_default(),
        });
    }

    /// Combine two accumulators. `other` is taken to follow `self` in
    /// statement order.
    pub fn merge(mut self, other: ConversionMetrics) -> ConversionMetrics {
        self.total_statements += other.total_statements;
        self.successful += other.successful;
        self.flagged += other.flagged;
        self.syntax_errors += other.syntax_errors;
        self.flagged_items.extend(other.flagged_items);
        self.unsupported_functions.extend(other.unsupported_functions);
        for (category, count) in other.function_conversions {
            *self.function_conversions.entry(category).or_insert(0) += count;
        }
        self
    }

    /// Fraction of statements converted cleanly, 0.0 when there are none.
    pub fn success_rate(&self) -> f64 {
        if self.total_statements == 0 {
            0.0
        } else {
            self.successful as f64 / self.total_statements as f64
        }
    }

    pub fn success_percent(&self) -> f64 {
        self.success_rate() * 100.0
    }

    /// Total converted call sites across all categories.
    pub fn converted_functions(&self) -> usize {
        self.function_conversions.values().sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.successful + self.flagged + self.syntax_errors == self.total_statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Converter;

    fn metrics(sql: &str) -> ConversionMetrics {
        Converter::new().convert(sql).metrics
    }

    #[test]
    fn test_empty_success_rate() {
        let m = ConversionMetrics::new();
        assert_eq!(m.success_rate(), 0.0);
        assert!(m.is_consistent());
    }

    #[test]
    fn test_counts() {
        let m = metrics("SELECT 1; SELECT MEDIAN(x) FROM t; SELECT UPPER(name FROM t");
        assert_eq!(m.total_statements, 3);
        assert_eq!(m.successful, 1);
        assert_eq!(m.flagged, 1);
        assert_eq!(m.syntax_errors, 1);
        assert!(m.is_consistent());
        assert!((m.success_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_set_is_case_insensitive() {
        let m = metrics("SELECT Fake_Fn(a), FAKE_FN(b) FROM t; SELECT fake_fn(c) FROM u;");
        assert_eq!(m.unsupported_functions.len(), 1);
        assert!(m.unsupported_functions.contains("FAKE_FN"));
        assert_eq!(m.flagged_items.len(), 3);
    }

    #[test]
    fn test_category_counts() {
        let m = metrics("SELECT NOW(), UPPER(a), LOWER(b), SUM(c) FROM t");
        assert_eq!(m.function_conversions.get(&Category::Date), Some(&1));
        assert_eq!(m.function_conversions.get(&Category::String), Some(&2));
        assert_eq!(m.function_conversions.get(&Category::Aggregate), Some(&1));
        assert_eq!(m.converted_functions(), 4);
    }

    #[test]
    fn test_merge_keeps_statement_order() {
        let a = metrics("SELECT MEDIAN(x) FROM t;");
        let b = metrics("SELECT ATTR(y) FROM t; SELECT NOW();");
        let merged = a.merge(b);
        assert_eq!(merged.total_statements, 3);
        assert_eq!(merged.flagged, 2);
        assert_eq!(merged.successful, 1);
        let functions: Vec<_> = merged
            .flagged_items
            .iter()
            .map(|i| i.function.clone().unwrap_or_default())
            .collect();
        assert_eq!(functions, vec!["MEDIAN", "ATTR"]);
        assert!(merged.is_consistent());
    }
}
