//! The mapping table: source-dialect function name → conversion rule.
//!
//! Lookup is case-insensitive and exact on the captured identifier token.
//! The table is assembled once through [`MappingTableBuilder`] and is never
//! mutated afterwards, so a `&MappingTable` can be shared freely between
//! threads.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::rewrites::{self, RewriteFn};

/// Function family, used for per-category conversion counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Date,
    String,
    Aggregate,
    Logical,
    Conversion,
    Mathematical,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Date => "DATE",
            Category::String => "STRING",
            Category::Aggregate => "AGGREGATE",
            Category::Logical => "LOGICAL",
            Category::Conversion => "CONVERSION",
            Category::Mathematical => "MATHEMATICAL",
            Category::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Number of arguments a restructuring rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(lo, hi) => write!(f, "{} to {}", lo, hi),
        }
    }
}

/// Rule kind tag, without the rule payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleKind {
    Direct,
    Reorder,
    Flag,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Direct => f.write_str("DIRECT"),
            RuleKind::Reorder => f.write_str("REORDER"),
            RuleKind::Flag => f.write_str("FLAG"),
        }
    }
}

/// How a recognized function is handled.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Replace the name token, keep the argument text as is.
    Direct { target: String },
    /// Rebuild the whole call from its split arguments.
    Reorder {
        target: String,
        arity: Arity,
        rewrite: RewriteFn,
    },
    /// Recognized, left untouched and reported for review.
    Flag { reason: String },
}

/// One entry of the mapping table.
#[derive(Debug, Clone)]
pub struct MappingRule {
    /// Upper-cased source function name.
    pub name: String,
    pub category: Category,
    pub rule: Rule,
}

impl MappingRule {
    pub fn kind(&self) -> RuleKind {
        match self.rule {
            Rule::Direct { .. } => RuleKind::Direct,
            Rule::Reorder { .. } => RuleKind::Reorder,
            Rule::Flag { .. } => RuleKind::Flag,
        }
    }

    /// Target function name, if the rule produces one.
    pub fn target(&self) -> Option<&str> {
        match &self.rule {
            Rule::Direct { target } | Rule::Reorder { target, .. } => Some(target),
            Rule::Flag { .. } => None,
        }
    }

    /// Review reason for flag-only rules.
    pub fn reason(&self) -> Option<&str> {
        match &self.rule {
            Rule::Flag { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Read-only registry of conversion rules.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    rules: HashMap<String, MappingRule>,
}

static TABLEAU_TO_FABRIC: LazyLock<MappingTable> =
    LazyLock::new(|| MappingTable::tableau_builder().build());

impl MappingTable {
    pub fn builder() -> MappingTableBuilder {
        MappingTableBuilder::default()
    }

    /// The process-wide default Tableau → Fabric table.
    pub fn global() -> &'static MappingTable {
        &TABLEAU_TO_FABRIC
    }

    /// Look up a function name, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&MappingRule> {
        self.rules.get(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules, ordered by name.
    pub fn rules(&self) -> Vec<&MappingRule> {
        let mut rules: Vec<&MappingRule> = self.rules.values().collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    pub fn statistics(&self) -> MappingStatistics {
        let mut stats = MappingStatistics {
            total: self.rules.len(),
            ..Default::default()
        };
        for rule in self.rules.values() {
            *stats.by_category.entry(rule.category).or_default() += 1;
            match rule.kind() {
                RuleKind::Direct => stats.direct += 1,
                RuleKind::Reorder => stats.reorder += 1,
                RuleKind::Flag => stats.flag += 1,
            }
        }
        stats
    }

    /// Builder preloaded with the Tableau → Fabric entries.
    ///
    /// Configuration extensions are layered on top of this before `build()`.
    pub fn tableau_builder() -> MappingTableBuilder {
        use Category::*;

        MappingTable::builder()
            // DATE
            .reorder("DATEADD", "DATEADD", Date, Arity::Exact(3), rewrites::date_add)
            .reorder("DATEDIFF", "DATEDIFF", Date, Arity::Range(3, 4), rewrites::date_diff)
            .reorder("DATEPART", "DATEPART", Date, Arity::Range(2, 3), rewrites::date_part)
            .reorder("DATENAME", "DATENAME", Date, Arity::Range(2, 3), rewrites::date_part)
            .direct("NOW", "GETDATE", Date)
            .reorder("TODAY", "GETDATE", Date, Arity::Exact(0), rewrites::today)
            .same("YEAR", Date)
            .same("MONTH", Date)
            .same("DAY", Date)
            .direct("MAKEDATE", "DATEFROMPARTS", Date)
            .direct("MAKEDATETIME", "DATETIMEFROMPARTS", Date)
            .same("GETDATE", Date)
            .same("DATEFROMPARTS", Date)
            .same("DATETIMEFROMPARTS", Date)
            // STRING
            .same("LEN", String)
            .direct("LENGTH", "LEN", String)
            .direct("SUBSTR", "SUBSTRING", String)
            .same("SUBSTRING", String)
            .reorder("CONTAINS", "CHARINDEX", String, Arity::Exact(2), rewrites::contains)
            .reorder("FIND", "CHARINDEX", String, Arity::Range(2, 3), rewrites::find)
            .reorder("STARTSWITH", "CHARINDEX", String, Arity::Exact(2), rewrites::starts_with)
            .reorder("ENDSWITH", "RIGHT", String, Arity::Exact(2), rewrites::ends_with)
            .reorder("SPLIT", "SUBSTRING", String, Arity::Exact(3), rewrites::split_first)
            .same("CHARINDEX", String)
            .same("LEFT", String)
            .same("RIGHT", String)
            .same("TRIM", String)
            .same("LTRIM", String)
            .same("RTRIM", String)
            .same("UPPER", String)
            .same("LOWER", String)
            .same("REPLACE", String)
            // AGGREGATE
            .same("SUM", Aggregate)
            .same("AVG", Aggregate)
            .same("COUNT", Aggregate)
            .reorder("COUNTD", "COUNT", Aggregate, Arity::Exact(1), rewrites::count_distinct)
            .same("MIN", Aggregate)
            .same("MAX", Aggregate)
            .same("STDEV", Aggregate)
            .same("STDEVP", Aggregate)
            .same("VAR", Aggregate)
            .same("VARP", Aggregate)
            .same("PERCENTILE_CONT", Aggregate)
            .flag(
                "MEDIAN",
                Aggregate,
                "MEDIAN function requires manual review: rewrite as PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY ...)",
            )
            .flag(
                "PERCENTILE",
                Aggregate,
                "PERCENTILE function requires manual review: rewrite as PERCENTILE_CONT(p) WITHIN GROUP (ORDER BY ...)",
            )
            .flag(
                "ATTR",
                Aggregate,
                "ATTR function requires manual review: no single-value aggregate in the target dialect",
            )
            // LOGICAL
            .direct("IF", "IIF", Logical)
            .direct("IFNULL", "ISNULL", Logical)
            .same("ISNULL", Logical)
            .reorder("ZN", "ISNULL", Logical, Arity::Exact(1), rewrites::zero_if_null)
            .same("IIF", Logical)
            .same("COALESCE", Logical)
            .same("NULLIF", Logical)
            // CONVERSION
            .reorder("STR", "CAST", Conversion, Arity::Exact(1), rewrites::cast_varchar)
            .reorder("INT", "CAST", Conversion, Arity::Exact(1), rewrites::cast_int)
            .reorder("FLOAT", "CAST", Conversion, Arity::Exact(1), rewrites::cast_float)
            .reorder("DATE", "CAST", Conversion, Arity::Exact(1), rewrites::cast_date)
            .same("CAST", Conversion)
            .same("CONVERT", Conversion)
            // MATHEMATICAL
            .same("ABS", Mathematical)
            .same("ROUND", Mathematical)
            .same("CEILING", Mathematical)
            .same("FLOOR", Mathematical)
            .same("SQRT", Mathematical)
            .same("POWER", Mathematical)
            .same("EXP", Mathematical)
            .direct("LN", "LOG", Mathematical)
            .direct("LOG", "LOG10", Mathematical)
            .same("LOG10", Mathematical)
    }
}

/// Summary counts over a mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingStatistics {
    pub total: usize,
    pub direct: usize,
    pub reorder: usize,
    pub flag: usize,
    pub by_category: BTreeMap<Category, usize>,
}

/// Collects rules before freezing them into a [`MappingTable`].
///
/// Inserting a name that already exists replaces the earlier rule.
#[derive(Debug, Default)]
pub struct MappingTableBuilder {
    rules: HashMap<String, MappingRule>,
}

impl MappingTableBuilder {
    pub fn rule(mut self, name: &str, category: Category, rule: Rule) -> Self {
        let name = name.to_ascii_uppercase();
        self.rules.insert(
            name.clone(),
            MappingRule {
                name,
                category,
                rule,
            },
        );
        self
    }

    pub fn direct(self, name: &str, target: &str, category: Category) -> Self {
        self.rule(
            name,
            category,
            Rule::Direct {
                target: target.to_string(),
            },
        )
    }

    /// A function whose name is identical in both dialects.
    pub fn same(self, name: &str, category: Category) -> Self {
        self.direct(name, &name.to_ascii_uppercase(), category)
    }

    pub fn reorder(
        self,
        name: &str,
        target: &str,
        category: Category,
        arity: Arity,
        rewrite: RewriteFn,
    ) -> Self {
        self.rule(
            name,
            category,
            Rule::Reorder {
                target: target.to_string(),
                arity,
                rewrite,
            },
        )
    }

    pub fn flag(self, name: &str, category: Category, reason: impl Into<String>) -> Self {
        self.rule(
            name,
            category,
            Rule::Flag {
                reason: reason.into(),
            },
        )
    }

    pub fn build(self) -> MappingTable {
        MappingTable { rules: self.rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = MappingTable::global();
        let rule = table.lookup("now").unwrap();
        assert_eq!(rule.kind(), RuleKind::Direct);
        assert_eq!(rule.target(), Some("GETDATE"));
        assert_eq!(table.lookup("NoW").unwrap().name, "NOW");
    }

    #[test]
    fn test_lookup_is_exact_not_prefix() {
        let table = MappingTable::global();
        assert_eq!(table.lookup("LEN").unwrap().target(), Some("LEN"));
        assert_eq!(table.lookup("LENGTH").unwrap().target(), Some("LEN"));
        assert!(table.lookup("LENGTHS").is_none());
        assert!(table.lookup("LE").is_none());
    }

    #[test]
    fn test_flag_rule_has_reason() {
        let rule = MappingTable::global().lookup("median").unwrap();
        assert_eq!(rule.kind(), RuleKind::Flag);
        assert!(rule.reason().unwrap().starts_with("MEDIAN function requires manual review"));
        assert!(rule.reason().unwrap().contains("WITHIN GROUP"));
        assert_eq!(rule.target(), None);
    }

    #[test]
    fn test_builder_override() {
        let table = MappingTable::tableau_builder()
            .flag("NOW", Category::Date, "NOW is disabled")
            .direct("my_fn", "TARGET_FN", Category::Other)
            .build();
        assert_eq!(table.lookup("now").unwrap().reason(), Some("NOW is disabled"));
        assert_eq!(table.lookup("MY_FN").unwrap().target(), Some("TARGET_FN"));
        // the global table is untouched
        assert_eq!(MappingTable::global().lookup("now").unwrap().kind(), RuleKind::Direct);
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(1));
        assert!(Arity::Range(2, 3).accepts(3));
        assert!(!Arity::Range(2, 3).accepts(4));
        assert_eq!(Arity::Range(2, 3).to_string(), "2 to 3");
    }

    #[test]
    fn test_statistics() {
        let table = MappingTable::builder()
            .same("SUM", Category::Aggregate)
            .flag("MEDIAN", Category::Aggregate, "review")
            .reorder("ZN", "ISNULL", Category::Logical, Arity::Exact(1), rewrites::zero_if_null)
            .build();
        let stats = table.statistics();
        assert_eq!(stats.total, 3);
        assert_eq!((stats.direct, stats.reorder, stats.flag), (1, 1, 1));
        assert_eq!(stats.by_category[&Category::Aggregate], 2);
    }

    #[test]
    fn test_rules_sorted() {
        let names: Vec<&str> = MappingTable::global()
            .rules()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
