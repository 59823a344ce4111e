//! Argument-restructuring rewrites for REORDER rules.
//!
//! Each rewrite receives the call's arguments after nested calls inside them
//! have already been converted, and returns the full replacement expression.
//! Argument count is checked by the engine before a rewrite runs, so indexing
//! within the rule's arity is safe here. A rewrite that cannot produce
//! equivalent SQL returns an [`Issue`] and the call is flagged instead.

use nom::{
    IResult,
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::all_consuming,
    sequence::delimited,
};

use crate::error::Issue;

/// Signature shared by every restructuring rule.
pub type RewriteFn = fn(&CallArgs<'_>, &RewriteOptions) -> Result<String, Issue>;

/// Knobs that affect generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Width used for `STR(x)` → `CAST(x AS VARCHAR(n))`.
    pub varchar_length: u32,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self { varchar_length: 20 }
    }
}

/// A call handed to a rewrite.
#[derive(Debug, Clone, Copy)]
pub struct CallArgs<'a> {
    /// Function name as written in the source.
    pub function: &'a str,
    pub target: &'a str,
    /// Converted argument text, surrounding whitespace kept.
    pub args: &'a [String],
}

impl CallArgs<'_> {
    /// Trimmed argument `i`.
    pub fn arg(&self, i: usize) -> &str {
        self.args.get(i).map(|a| a.trim()).unwrap_or("")
    }

    pub(crate) fn len(&self) -> usize {
        self.args.len()
    }

    fn upper_name(&self) -> String {
        self.function.to_ascii_uppercase()
    }
}

/// Date parts accepted by both dialects, including T-SQL abbreviations.
const DATE_PARTS: &[&str] = &[
    "year", "yy", "yyyy", "quarter", "qq", "q", "month", "mm", "m", "dayofyear", "dy", "y",
    "day", "dd", "d", "week", "wk", "ww", "weekday", "dw", "hour", "hh", "minute", "mi", "n",
    "second", "ss", "s", "millisecond", "ms", "iso_week", "isowk", "isoww",
];

fn is_date_part(word: &str) -> bool {
    DATE_PARTS.contains(&word.to_ascii_lowercase().as_str())
}

/// `'month'` → `month`
fn quoted_word(input: &str) -> IResult<&str, &str> {
    all_consuming(delimited(
        char('\''),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        char('\''),
    ))(input)
}

fn integer_literal(input: &str) -> IResult<&str, &str> {
    all_consuming(digit1)(input)
}

/// Replace the trimmed content of `original` while keeping its padding.
fn respace(original: &str, replacement: &str) -> String {
    let lead = &original[..original.len() - original.trim_start().len()];
    let trail = &original[original.trim_end().len()..];
    format!("{}{}{}", lead, replacement, trail)
}

/// Rewrite the leading date-part argument shared by the DATE* family.
fn date_call(call: &CallArgs<'_>) -> Result<String, Issue> {
    let first = call.arg(0);
    let part = match quoted_word(first) {
        Ok((_, word)) if is_date_part(word) => word.to_ascii_lowercase(),
        Ok((_, word)) => {
            return Err(Issue::review(format!(
                "{} date part '{}' has no target equivalent; manual review required",
                call.upper_name(),
                word
            )));
        }
        Err(_) if is_date_part(first) => first.to_string(),
        Err(_) => {
            return Err(Issue::review(format!(
                "{} with a non-literal date part requires manual review",
                call.upper_name()
            )));
        }
    };

    let mut args = Vec::with_capacity(call.len());
    args.push(respace(&call.args[0], &part));
    args.extend(call.args[1..].iter().cloned());
    Ok(format!("{}({})", call.target, args.join(",")))
}

pub fn date_add(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    date_call(call)
}

pub fn date_diff(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    if call.len() == 4 {
        return Err(Issue::review(
            "DATEDIFF start_of_week argument requires manual review",
        ));
    }
    date_call(call)
}

/// DATEPART and DATENAME.
pub fn date_part(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    if call.len() == 3 {
        return Err(Issue::review(format!(
            "{} start_of_week argument requires manual review",
            call.upper_name()
        )));
    }
    date_call(call)
}

pub fn today(_: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok("CAST(GETDATE() AS DATE)".to_string())
}

pub fn cast_varchar(call: &CallArgs<'_>, opts: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!(
        "CAST({} AS VARCHAR({}))",
        call.arg(0),
        opts.varchar_length
    ))
}

pub fn cast_int(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("CAST({} AS INT)", call.arg(0)))
}

pub fn cast_float(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("CAST({} AS FLOAT)", call.arg(0)))
}

pub fn cast_date(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("CAST({} AS DATE)", call.arg(0)))
}

/// `ZN(x)` → `ISNULL(x, 0)`
pub fn zero_if_null(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("ISNULL({}, 0)", call.arg(0)))
}

pub fn count_distinct(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("COUNT(DISTINCT {})", call.arg(0)))
}

/// `SPLIT(s, d, 1)` → first token. Any other index is flagged.
pub fn split_first(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    match integer_literal(call.arg(2)) {
        Ok((_, "1")) => Ok(format!(
            "SUBSTRING({s}, 1, CHARINDEX({d}, {s}) - 1)",
            s = call.arg(0),
            d = call.arg(1)
        )),
        _ => Err(Issue::review("SPLIT with index != 1 requires manual rewrite")),
    }
}

pub fn starts_with(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("CHARINDEX({}, {}) = 1", call.arg(1), call.arg(0)))
}

pub fn ends_with(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!(
        "RIGHT({s}, LEN({x})) = {x}",
        s = call.arg(0),
        x = call.arg(1)
    ))
}

pub fn contains(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    Ok(format!("CHARINDEX({}, {}) > 0", call.arg(1), call.arg(0)))
}

/// `FIND(s, n[, start])` → `CHARINDEX(n, s[, start])`
pub fn find(call: &CallArgs<'_>, _: &RewriteOptions) -> Result<String, Issue> {
    if call.len() == 3 {
        Ok(format!(
            "CHARINDEX({}, {}, {})",
            call.arg(1),
            call.arg(0),
            call.arg(2)
        ))
    } else {
        Ok(format!("CHARINDEX({}, {})", call.arg(1), call.arg(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: RewriteFn, function: &str, target: &str, args: &[&str]) -> Result<String, Issue> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let call = CallArgs {
            function,
            target,
            args: &args,
        };
        f(&call, &RewriteOptions::default())
    }

    #[test]
    fn test_date_add_unquotes_part() {
        let out = run(date_add, "dateadd", "DATEADD", &["'month'", " 3", " order_date"]).unwrap();
        assert_eq!(out, "DATEADD(month, 3, order_date)");
    }

    #[test]
    fn test_date_add_already_target_form() {
        let out = run(date_add, "DATEADD", "DATEADD", &["month", " 3", " d"]).unwrap();
        assert_eq!(out, "DATEADD(month, 3, d)");
    }

    #[test]
    fn test_date_part_unknown_literal() {
        let err = run(date_part, "DATEPART", "DATEPART", &["'fortnight'", " d"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "DATEPART date part 'fortnight' has no target equivalent; manual review required"
        );
    }

    #[test]
    fn test_date_part_dynamic() {
        let err = run(date_part, "datepart", "DATEPART", &["part_col", " d"]).unwrap_err();
        assert!(err.to_string().contains("non-literal date part"));
    }

    #[test]
    fn test_date_diff_start_of_week() {
        let err = run(date_diff, "DATEDIFF", "DATEDIFF", &["'week'", "a", "b", "'monday'"])
            .unwrap_err();
        assert!(err.to_string().contains("start_of_week"));
    }

    #[test]
    fn test_casts() {
        assert_eq!(run(cast_varchar, "STR", "CAST", &["id"]).unwrap(), "CAST(id AS VARCHAR(20))");
        assert_eq!(run(cast_int, "INT", "CAST", &[" price "]).unwrap(), "CAST(price AS INT)");
        assert_eq!(run(cast_date, "DATE", "CAST", &["ts"]).unwrap(), "CAST(ts AS DATE)");
    }

    #[test]
    fn test_varchar_length_option() {
        let args = vec!["code".to_string()];
        let call = CallArgs {
            function: "STR",
            target: "CAST",
            args: &args,
        };
        let out = cast_varchar(&call, &RewriteOptions { varchar_length: 64 }).unwrap();
        assert_eq!(out, "CAST(code AS VARCHAR(64))");
    }

    #[test]
    fn test_split() {
        let out = run(split_first, "SPLIT", "SUBSTRING", &["email", " '@'", " 1"]).unwrap();
        assert_eq!(out, "SUBSTRING(email, 1, CHARINDEX('@', email) - 1)");

        let err = run(split_first, "SPLIT", "SUBSTRING", &["email", " '@'", " 2"]).unwrap_err();
        assert_eq!(err.to_string(), "SPLIT with index != 1 requires manual rewrite");
    }

    #[test]
    fn test_string_predicates() {
        assert_eq!(
            run(starts_with, "STARTSWITH", "CHARINDEX", &["name", " 'A'"]).unwrap(),
            "CHARINDEX('A', name) = 1"
        );
        assert_eq!(
            run(ends_with, "ENDSWITH", "RIGHT", &["name", " 'z'"]).unwrap(),
            "RIGHT(name, LEN('z')) = 'z'"
        );
        assert_eq!(
            run(contains, "CONTAINS", "CHARINDEX", &["name", " 'x'"]).unwrap(),
            "CHARINDEX('x', name) > 0"
        );
        assert_eq!(
            run(find, "FIND", "CHARINDEX", &["name", " 'x'", " 3"]).unwrap(),
            "CHARINDEX('x', name, 3)"
        );
    }

    #[test]
    fn test_zero_if_null_and_countd() {
        assert_eq!(run(zero_if_null, "ZN", "ISNULL", &["sales"]).unwrap(), "ISNULL(sales, 0)");
        assert_eq!(
            run(count_distinct, "COUNTD", "COUNT", &["customer_id"]).unwrap(),
            "COUNT(DISTINCT customer_id)"
        );
    }

    #[test]
    fn test_respace() {
        assert_eq!(respace("  'x' ", "x"), "  x ");
    }
}
