//! # sqlbridge
//!
//! Table-driven conversion of Tableau calculation SQL into Microsoft Fabric
//! (T-SQL) SQL.
//!
//! Nothing is ever silently rewritten into something different: every call
//! the engine cannot convert mechanically is kept as written and reported as
//! a flagged item.
//!
//! ## Quick Example
//!
//! ```
//! let (sql, metrics) = sqlbridge::convert("SELECT NOW() AS t, ZN(sales) FROM orders;");
//! assert_eq!(sql, "SELECT GETDATE() AS t, ISNULL(sales, 0) FROM orders;");
//! assert_eq!(metrics.successful, 1);
//! ```
//!
//! ## Rule kinds
//!
//! | Kind    | Effect                                          |
//! |---------|-------------------------------------------------|
//! | DIRECT  | Function name replaced, arguments untouched     |
//! | REORDER | Arguments restructured by a rewrite function    |
//! | FLAG    | Call kept, reason recorded for manual review    |
//! | (none)  | Call kept, function reported as unsupported     |

pub mod cleaner;
pub mod config;
pub mod constructs;
pub mod converter;
pub mod error;
pub mod files;
pub mod mapping;
pub mod metrics;
pub mod recognizer;
pub mod report;
pub mod rewriter;
pub mod rewrites;
pub mod segmenter;
pub mod validator;

pub use converter::convert;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::converter::{Conversion, ConvertOptions, Converter, StatementOutcome, convert};
    pub use crate::error::*;
    pub use crate::mapping::{Arity, Category, MappingRule, MappingTable, Rule, RuleKind};
    pub use crate::metrics::{ConversionMetrics, FlaggedItem};
    pub use crate::report::{ConversionReport, FileReport};
    pub use crate::rewriter::{ConversionResult, Disposition};
}
