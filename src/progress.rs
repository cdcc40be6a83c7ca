//! Run state and progress-callback trait for conversion events.
//!
//! A run walks a fixed state machine:
//!
//! ```text
//! Idle ─▶ Uploading ─▶ Resolving ─▶ Fetching ─▶ Materializing ─▶ Succeeded
//!            │             │            │             │
//!            └─────────────┴────────────┴─────────────┴──────────▶ Failed
//! ```
//!
//! There is no retry or resume state. A failed run is restarted from `Idle`
//! by the caller with a fresh request.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! the transitions, per-artefact issues and the terminal notification.
//!
//! # Example
//!
//! ```rust
//! use mistral_pdf2md::{ConversionConfig, ConversionProgressCallback, ConversionStage};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl ConversionProgressCallback for Log {
//!     fn on_stage(&self, stage: ConversionStage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .api_key("sk-test")
//!     .progress_callback(Arc::new(Log))
//!     .build()
//!     .unwrap();
//! # let _ = config;
//! ```

use crate::error::MaterializeIssue;
use crate::output::ConversionOutput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a single conversion run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStage {
    #[default]
    Idle,
    Uploading,
    Resolving,
    Fetching,
    Materializing,
    Succeeded,
    Failed,
}

impl ConversionStage {
    /// Terminal stages end the run.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversionStage::Succeeded | ConversionStage::Failed)
    }

    /// The stage that follows on success, or `None` from a terminal stage.
    pub fn next(self) -> Option<ConversionStage> {
        match self {
            ConversionStage::Idle => Some(ConversionStage::Uploading),
            ConversionStage::Uploading => Some(ConversionStage::Resolving),
            ConversionStage::Resolving => Some(ConversionStage::Fetching),
            ConversionStage::Fetching => Some(ConversionStage::Materializing),
            ConversionStage::Materializing => Some(ConversionStage::Succeeded),
            ConversionStage::Succeeded | ConversionStage::Failed => None,
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversionStage::Idle => "idle",
            ConversionStage::Uploading => "uploading",
            ConversionStage::Resolving => "resolving",
            ConversionStage::Fetching => "fetching",
            ConversionStage::Materializing => "materializing",
            ConversionStage::Succeeded => "succeeded",
            ConversionStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline as a run progresses.
///
/// Implementations must be `Send + Sync` so one callback can be shared by
/// runs on different tasks. All methods have default no-op implementations
/// so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called on every state transition, including the terminal one.
    fn on_stage(&self, stage: ConversionStage) {
        let _ = stage;
    }

    /// Called for each non-fatal materialization problem, as it happens.
    fn on_issue(&self, issue: &MaterializeIssue) {
        let _ = issue;
    }

    /// Terminal success notification. Called exactly once per successful run.
    fn on_conversion_complete(&self, output: &ConversionOutput) {
        let _ = output;
    }

    /// Terminal failure notification with a human-readable message.
    /// Called exactly once per failed run.
    fn on_conversion_failed(&self, stage: ConversionStage, message: &str) {
        let _ = (stage, message);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn happy_path_walks_every_stage() {
        let mut stage = ConversionStage::Idle;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                ConversionStage::Idle,
                ConversionStage::Uploading,
                ConversionStage::Resolving,
                ConversionStage::Fetching,
                ConversionStage::Materializing,
                ConversionStage::Succeeded,
            ]
        );
        assert!(stage.is_terminal());
    }

    #[test]
    fn failed_is_terminal_without_successor() {
        assert!(ConversionStage::Failed.is_terminal());
        assert_eq!(ConversionStage::Failed.next(), None);
        assert!(!ConversionStage::Fetching.is_terminal());
    }

    #[test]
    fn stage_display_is_lowercase() {
        assert_eq!(ConversionStage::Materializing.to_string(), "materializing");
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(ConversionStage::Uploading);
        cb.on_issue(&MaterializeIssue::ImageDecode {
            index: 0,
            detail: "bad".into(),
        });
        cb.on_conversion_failed(ConversionStage::Failed, "boom");
    }

    #[test]
    fn arc_dyn_callback_records_stages() {
        struct Recorder(Mutex<Vec<ConversionStage>>);
        impl ConversionProgressCallback for Recorder {
            fn on_stage(&self, stage: ConversionStage) {
                self.0.lock().unwrap().push(stage);
            }
        }

        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let cb: ProgressCallback = rec.clone();
        cb.on_stage(ConversionStage::Uploading);
        cb.on_stage(ConversionStage::Failed);
        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![ConversionStage::Uploading, ConversionStage::Failed]
        );
    }
}
