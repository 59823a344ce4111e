//! The rewrite engine.
//!
//! Output is rebuilt left to right against the untouched statement text, so
//! no substitution ever shifts the offsets of a call site not yet visited.
//! Every call site is resolved once, on its own argument span; nested calls
//! inside that span are rendered first and embedded in whatever the outer
//! call produces. A flagged outer call therefore keeps the conversions of the
//! calls nested inside it.

use std::fmt;
use std::ops::Range;

use serde::Serialize;
use tracing::trace;

use crate::error::Issue;
use crate::mapping::{Category, MappingTable, Rule};
use crate::recognizer::{CallSite, identifier, split_args};
use crate::rewrites::{CallArgs, RewriteOptions};

/// Outcome classification for a call site or a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Converted,
    Flagged,
    Unsupported,
    SyntaxError,
}

impl Disposition {
    /// True when a reviewer has to look at the item.
    pub fn needs_review(&self) -> bool {
        !matches!(self, Disposition::Converted)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Converted => f.write_str("CONVERTED"),
            Disposition::Flagged => f.write_str("FLAGGED"),
            Disposition::Unsupported => f.write_str("UNSUPPORTED"),
            Disposition::SyntaxError => f.write_str("SYNTAX_ERROR"),
        }
    }
}

/// Resolution of one call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Function name as written.
    pub function: String,
    /// Byte offset of the call inside its statement.
    pub offset: usize,
    pub disposition: Disposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Text emitted in place of the call, when it differs from the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConversionResult {
    fn new(site: &CallSite) -> Self {
        Self {
            function: site.name.clone(),
            offset: site.start,
            disposition: Disposition::Converted,
            category: None,
            replacement: None,
            reason: None,
        }
    }
}

/// A piece of output text and whether everything in it converted cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub converted: bool,
}

impl Fragment {
    pub fn converted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            converted: true,
        }
    }

    pub fn flagged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            converted: false,
        }
    }
}

/// Concatenate two fragments. The result is converted only if both are.
pub fn merge(a: Fragment, b: Fragment) -> Fragment {
    let mut text = a.text;
    text.push_str(&b.text);
    Fragment {
        text,
        converted: a.converted && b.converted,
    }
}

/// Rewritten statement text plus one result per call site, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub converted: bool,
    pub results: Vec<ConversionResult>,
}

/// Applies mapping rules to the call sites of one statement.
#[derive(Debug, Clone, Copy)]
pub struct RewriteEngine<'a> {
    table: &'a MappingTable,
    options: &'a RewriteOptions,
}

impl<'a> RewriteEngine<'a> {
    pub fn new(table: &'a MappingTable, options: &'a RewriteOptions) -> Self {
        Self { table, options }
    }

    /// Rewrite `text` given its call sites (as found by the recognizer).
    pub fn rewrite(&self, text: &str, sites: &[CallSite]) -> Rewritten {
        let mut pass = Pass {
            engine: *self,
            text,
            sites,
            next: 0,
            results: Vec::with_capacity(sites.len()),
        };
        let out = pass.render(0..text.len());
        Rewritten {
            text: out.text,
            converted: out.converted,
            results: pass.results,
        }
    }
}

struct Pass<'a, 's> {
    engine: RewriteEngine<'a>,
    text: &'s str,
    sites: &'s [CallSite],
    next: usize,
    results: Vec<ConversionResult>,
}

impl<'s> Pass<'_, 's> {
    /// Render `range`, resolving every call site that starts inside it.
    fn render(&mut self, range: Range<usize>) -> Fragment {
        let sites = self.sites;
        let mut out = Fragment::converted(String::new());
        let mut pos = range.start;

        while let Some(site) = sites.get(self.next) {
            if site.start >= range.end {
                break;
            }
            self.next += 1;
            out = merge(out, Fragment::converted(&self.text[pos..site.start]));
            out = merge(out, self.resolve(site));
            pos = site.close + 1;
        }

        merge(out, Fragment::converted(&self.text[pos..range.end]))
    }

    fn resolve(&mut self, site: &'s CallSite) -> Fragment {
        let slot = self.results.len();
        self.results.push(ConversionResult::new(site));
        let text = self.text;
        let original = &text[site.span()];

        let table = self.engine.table;
        if opens_block(text, site) {
            let kept = self.keep_whole(site);
            let category = table.lookup(&site.name).map(|r| r.category);
            let issue = Issue::UnsupportedConstruct(format!("{} ... THEN block", site.normalized()));
            return self.settle(slot, Disposition::Flagged, category, kept, original, Some(issue));
        }
        let Some(rule) = table.lookup(&site.name) else {
            let kept = self.keep_whole(site);
            let issue = Issue::UnsupportedFunction(site.normalized());
            return self.settle(slot, Disposition::Unsupported, None, kept, original, Some(issue));
        };
        let category = Some(rule.category);

        match &rule.rule {
            Rule::Flag { reason } => {
                let kept = self.keep_whole(site);
                let issue = Issue::review(reason.clone());
                self.settle(slot, Disposition::Flagged, category, kept, original, Some(issue))
            }
            Rule::Direct { target } => {
                let args = self.render(site.args_span());
                let text = format!(
                    "{}{}{})",
                    target,
                    &self.text[site.name_end..=site.open],
                    args.text
                );
                let out = Fragment {
                    text,
                    converted: args.converted,
                };
                self.settle(slot, Disposition::Converted, category, out, original, None)
            }
            Rule::Reorder {
                target,
                arity,
                rewrite,
            } => {
                let base = site.open + 1;
                let mut args = Vec::new();
                let mut args_converted = true;
                for r in split_args(&site.args) {
                    let arg = self.render(base + r.start..base + r.end);
                    args_converted &= arg.converted;
                    args.push(arg.text);
                }
                let kept = if args.is_empty() {
                    Fragment::flagged(original)
                } else {
                    Fragment::flagged(format!(
                        "{}{})",
                        &self.text[site.start..=site.open],
                        args.join(",")
                    ))
                };

                if !arity.accepts(args.len()) {
                    let issue = Issue::ArityMismatch {
                        function: site.normalized(),
                        expected: *arity,
                        found: args.len(),
                    };
                    return self.settle(slot, Disposition::Flagged, category, kept, original, Some(issue));
                }

                let call = CallArgs {
                    function: &site.name,
                    target,
                    args: &args,
                };
                let options = self.engine.options;
                match rewrite(&call, options) {
                    Ok(text) => {
                        let out = Fragment {
                            text,
                            converted: args_converted,
                        };
                        self.settle(slot, Disposition::Converted, category, out, original, None)
                    }
                    Err(issue) => {
                        self.settle(slot, Disposition::Flagged, category, kept, original, Some(issue))
                    }
                }
            }
        }
    }

    /// Original call text with its arguments rendered.
    fn keep_whole(&mut self, site: &CallSite) -> Fragment {
        let args = self.render(site.args_span());
        Fragment::flagged(format!(
            "{}{})",
            &self.text[site.start..=site.open],
            args.text
        ))
    }

    fn settle(
        &mut self,
        slot: usize,
        disposition: Disposition,
        category: Option<Category>,
        out: Fragment,
        original: &str,
        issue: Option<Issue>,
    ) -> Fragment {
        let result = &mut self.results[slot];
        trace!(
            function = %result.function,
            offset = result.offset,
            %disposition,
            "resolved call site"
        );
        result.disposition = disposition;
        result.category = category;
        result.replacement = (out.text != original).then(|| out.text.clone());
        result.reason = issue.map(|i| i.to_string());
        out
    }
}

/// `IF (cond) THEN ...`: the parenthesis is a condition, not an argument list.
fn opens_block(text: &str, site: &CallSite) -> bool {
    let block_keyword = matches!(site.normalized().as_str(), "IF" | "ELSEIF");
    let after = text[site.close + 1..].trim_start();
    block_keyword && identifier(after).is_ok_and(|(_, word)| word.eq_ignore_ascii_case("THEN"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::find_call_sites;

    fn rewrite(text: &str) -> Rewritten {
        let options = RewriteOptions::default();
        let engine = RewriteEngine::new(MappingTable::global(), &options);
        engine.rewrite(text, &find_call_sites(text))
    }

    #[test]
    fn test_direct_rename_keeps_arguments() {
        let out = rewrite("SELECT NOW() AS t, UPPER(name) FROM c");
        assert_eq!(out.text, "SELECT GETDATE() AS t, UPPER(name) FROM c");
        assert!(out.converted);
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.results[0].replacement.as_deref(), Some("GETDATE()"));
        assert_eq!(out.results[1].replacement, None);
        assert!(out.results.iter().all(|r| r.reason.is_none()));
    }

    #[test]
    fn test_direct_rename_is_byte_exact() {
        let out = rewrite("SELECT substr ( code , (1) ,  3 ) FROM t");
        assert_eq!(out.text, "SELECT SUBSTRING ( code , (1) ,  3 ) FROM t");
    }

    #[test]
    fn test_flag_keeps_original() {
        let out = rewrite("SELECT MEDIAN(x) FROM t");
        assert_eq!(out.text, "SELECT MEDIAN(x) FROM t");
        assert!(!out.converted);
        assert_eq!(out.results[0].disposition, Disposition::Flagged);
        assert!(out.results[0].reason.as_deref().unwrap().contains("PERCENTILE_CONT(0.5) WITHIN GROUP"));
    }

    #[test]
    fn test_unsupported() {
        let out = rewrite("SELECT RUNNING_SUM(SUM(sales)) FROM t");
        assert_eq!(out.text, "SELECT RUNNING_SUM(SUM(sales)) FROM t");
        assert_eq!(out.results[0].disposition, Disposition::Unsupported);
        assert_eq!(out.results[0].reason.as_deref(), Some("RUNNING_SUM function not supported"));
        assert_eq!(out.results[1].disposition, Disposition::Converted);
    }

    #[test]
    fn test_reorder() {
        let out = rewrite("SELECT ZN(sales), STR(id), TODAY() FROM t");
        assert_eq!(
            out.text,
            "SELECT ISNULL(sales, 0), CAST(id AS VARCHAR(20)), CAST(GETDATE() AS DATE) FROM t"
        );
        assert!(out.converted);
    }

    #[test]
    fn test_reorder_arity_mismatch() {
        let out = rewrite("SELECT STARTSWITH(name) FROM t");
        assert_eq!(out.text, "SELECT STARTSWITH(name) FROM t");
        assert_eq!(out.results[0].disposition, Disposition::Flagged);
        assert_eq!(
            out.results[0].reason.as_deref(),
            Some("STARTSWITH expects 2 argument(s), found 1; manual review required")
        );
        assert_eq!(out.results[0].replacement, None);
    }

    #[test]
    fn test_nested_rewrites_inside_flagged_call() {
        let out = rewrite("SELECT DATEDIFF('day', IF(MEDIAN(x) > 1, NOW(), d), TODAY())");
        assert_eq!(
            out.text,
            "SELECT DATEDIFF(day, IIF(MEDIAN(x) > 1, GETDATE(), d), CAST(GETDATE() AS DATE))"
        );
        let dispositions: Vec<Disposition> = out.results.iter().map(|r| r.disposition).collect();
        assert_eq!(
            dispositions,
            vec![
                Disposition::Converted,
                Disposition::Converted,
                Disposition::Flagged,
                Disposition::Converted,
                Disposition::Converted,
            ]
        );
        assert!(!out.converted);
    }

    #[test]
    fn test_inner_rewrite_embedded_in_flagged_reorder() {
        let out = rewrite("SELECT SPLIT(LENGTH(a), ',', 2) FROM t");
        assert_eq!(out.text, "SELECT SPLIT(LEN(a), ',', 2) FROM t");
        assert_eq!(out.results[0].disposition, Disposition::Flagged);
        assert_eq!(out.results[0].replacement.as_deref(), Some("SPLIT(LEN(a), ',', 2)"));
    }

    #[test]
    fn test_if_then_block_is_flagged() {
        let out = rewrite("SELECT IF (x > 1) THEN 'a' END FROM t");
        assert_eq!(out.text, "SELECT IF (x > 1) THEN 'a' END FROM t");
        assert!(!out.converted);
        assert_eq!(out.results[0].disposition, Disposition::Flagged);
        assert_eq!(out.results[0].reason.as_deref(), Some("IF ... THEN block not supported"));

        let out = rewrite("SELECT IF(ZN(x) > 1, 'a', 'b') FROM t");
        assert_eq!(out.text, "SELECT IIF(ISNULL(x, 0) > 1, 'a', 'b') FROM t");
        assert!(out.converted);
    }

    #[test]
    fn test_merge() {
        let m = merge(Fragment::converted("SELECT "), Fragment::flagged("MEDIAN(x)"));
        assert_eq!(m.text, "SELECT MEDIAN(x)");
        assert!(!m.converted);
        assert!(merge(Fragment::converted("a"), Fragment::converted("b")).converted);
    }
}
