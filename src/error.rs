//! Error types for the mistral-pdf2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2MdError`] — **Fatal**: the run cannot proceed (no API key, the
//!   service rejected the upload, the payload does not match the schema, the
//!   Markdown note could not be written). Returned as `Err(Pdf2MdError)` from
//!   [`crate::convert::convert`] and the individual pipeline stages.
//!
//! * [`MaterializeIssue`] — **Non-fatal**: the output folder could not be
//!   created, or one image could not be decoded or written. Materialization
//!   carries on with the remaining artefacts and the issue is collected in
//!   [`crate::output::MaterializeReport`].
//!
//! No variant is ever retried internally. Every fatal error is terminal for
//! the run; the caller restarts with a fresh request if it wants to.

use crate::progress::ConversionStage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mistral-pdf2md library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read, but is not a PDF.
    #[error("'{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    /// The request itself is unusable (empty file, empty target folder).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ── Authentication errors ─────────────────────────────────────────────
    /// No API key configured; detected before any network call.
    #[error(
        "No Mistral API key configured.\n\
Set MISTRAL_API_KEY, pass --api-key, or store one with --save-key."
    )]
    MissingApiKey,

    /// The service rejected the API key (HTTP 401/403).
    #[error("Authentication rejected during {stage}: {detail}")]
    Authentication {
        stage: ConversionStage,
        detail: String,
    },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Network unreachable, connection reset, or request timeout.
    #[error("Network error during {stage}: {detail}")]
    Transport {
        stage: ConversionStage,
        detail: String,
    },

    /// The service answered with a non-success status.
    ///
    /// Covers unknown or expired handles and expired signed URLs.
    #[error("Service error during {stage}: HTTP {status}\n{body}")]
    Service {
        stage: ConversionStage,
        status: u16,
        body: String,
    },

    /// The response body does not match the expected schema.
    #[error("Unexpected response during {stage}: {detail}")]
    Decode {
        stage: ConversionStage,
        detail: String,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A write to the managed storage failed.
    #[error("Storage error at '{path}': {detail}")]
    Storage { path: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2MdError {
    /// True when the fix is to supply or replace the API key.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Pdf2MdError::MissingApiKey | Pdf2MdError::Authentication { .. }
        )
    }

    /// Map a `reqwest` failure raised while talking to the service.
    ///
    /// Body-decoding failures surface as [`Pdf2MdError::Decode`]; everything
    /// else (DNS, connect, TLS, timeout, truncated body) is a transport error.
    pub(crate) fn from_reqwest(stage: ConversionStage, err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Pdf2MdError::Decode {
                stage,
                detail: err.to_string(),
            };
        }
        let detail = if err.is_timeout() {
            format!("request timed out ({err})")
        } else {
            err.to_string()
        };
        Pdf2MdError::Transport { stage, detail }
    }
}

/// A non-fatal problem hit while writing artefacts.
///
/// Stored in [`crate::output::MaterializeReport::issues`]; the run still
/// succeeds as long as the Markdown note itself is written.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum MaterializeIssue {
    /// The output folder did not exist and could not be created.
    #[error("Could not create folder '{path}': {detail}")]
    FolderCreation { path: String, detail: String },

    /// The image payload is not valid base64.
    #[error("Image {index}: invalid base64 payload: {detail}")]
    ImageDecode { index: usize, detail: String },

    /// The decoded image could not be written.
    #[error("Image {index}: could not write '{path}': {detail}")]
    ImageWrite {
        index: usize,
        path: String,
        detail: String,
    },
}
