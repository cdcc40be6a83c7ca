//! Result types returned by a conversion run.

use crate::error::MaterializeIssue;
use serde::{Deserialize, Serialize};

/// What the materializer wrote, and what it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeReport {
    /// Output directory relative to the vault root.
    pub output_dir: String,
    /// Path of the Markdown note relative to the vault root.
    pub markdown_path: String,
    /// True when the output directory already existed.
    pub folder_existed: bool,
    /// Image paths written, in flattened order.
    pub images_written: Vec<String>,
    /// Non-fatal problems, in the order they happened.
    pub issues: Vec<MaterializeIssue>,
}

impl MaterializeReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Timing and size figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: usize,
    /// Images with a payload in the structured document.
    pub image_count: usize,
    pub images_written: usize,
    pub body_bytes: usize,
    pub upload_duration_ms: u64,
    pub resolve_duration_ms: u64,
    pub fetch_duration_ms: u64,
    pub materialize_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Successful run: the report plus stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub source_filename: String,
    pub report: MaterializeReport,
    pub stats: ConversionStats,
}
