//! Machine-readable conversion reports.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::BridgeResult;
use crate::mapping::Category;
use crate::metrics::{ConversionMetrics, FlaggedItem};

/// Report for one converted input.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub metrics: ConversionMetrics,
}

/// Summary over one or more inputs.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub generated_at: DateTime<Utc>,
    pub total_statements: usize,
    pub successful: usize,
    pub flagged: usize,
    pub syntax_errors: usize,
    /// Percentage, 0 to 100.
    pub success_rate: f64,
    pub converted_functions: usize,
    pub function_conversions: BTreeMap<Category, usize>,
    pub unsupported_functions: BTreeSet<String>,
    pub flagged_items: Vec<FlaggedItem>,
    pub files: Vec<FileReport>,
}

impl ConversionReport {
    pub fn new(files: Vec<FileReport>) -> Self {
        Self::at(files, Utc::now())
    }

    pub fn at(files: Vec<FileReport>, generated_at: DateTime<Utc>) -> Self {
        let total = files
            .iter()
            .fold(ConversionMetrics::new(), |acc, f| acc.merge(f.metrics.clone()));

        Self {
            generated_at,
            total_statements: total.total_statements,
            successful: total.successful,
            flagged: total.flagged,
            syntax_errors: total.syntax_errors,
            success_rate: round2(total.success_percent()),
            converted_functions: total.converted_functions(),
            function_conversions: total.function_conversions,
            unsupported_functions: total.unsupported_functions,
            flagged_items: total.flagged_items,
            files,
        }
    }

    pub fn to_json(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FileReport {
    pub fn new(input: &Path, output: Option<PathBuf>, metrics: ConversionMetrics) -> Self {
        Self {
            input: Some(input.to_path_buf()),
            output,
            metrics,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
