//! HTTP client for the Mistral file and OCR APIs.
//!
//! One [`MistralClient`] is built per run from that run's
//! [`ConversionConfig`] snapshot. It owns the `reqwest::Client` (with the
//! configured timeouts) and the bearer key; the protocol calls themselves
//! live next to the stage that uses them:
//!
//! * [`crate::pipeline::upload`] — `upload`
//! * [`crate::pipeline::resolve`] — `resolve` and `fetch`
//!
//! No call is ever retried here. Retrying is a caller policy.

use crate::config::ConversionConfig;
use crate::error::Pdf2MdError;
use crate::progress::ConversionStage;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Longest service error body kept in [`Pdf2MdError::Service`].
const MAX_ERROR_BODY: usize = 2048;

/// Authenticated client for one conversion run.
#[derive(Clone)]
pub struct MistralClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ConversionConfig,
    api_key: String,
}

impl std::fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl MistralClient {
    /// Build a client, failing with [`Pdf2MdError::MissingApiKey`] before
    /// anything touches the network when no key is configured.
    pub fn new(config: &ConversionConfig) -> Result<Self, Pdf2MdError> {
        let api_key = config.require_api_key()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("mistral-pdf2md/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Pdf2MdError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: config.clone(),
            api_key,
        })
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

/// How a non-success status should be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusPolicy {
    /// 401/403 mean the API key was rejected.
    Authenticated,
    /// Pre-signed URL: 401/403 mean the signature expired, which is a
    /// service error, not a credentials problem.
    PreSigned,
}

/// Pass a success response through; turn anything else into an error.
pub(crate) async fn check_status(
    stage: ConversionStage,
    policy: StatusPolicy,
    response: Response,
) -> Result<Response, Pdf2MdError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // The body is diagnostics only; an unreadable one is not worth failing over.
    let body = response.text().await.unwrap_or_default();
    let body = truncate(body.trim(), MAX_ERROR_BODY);
    debug!("{stage}: HTTP {status}: {body}");

    Err(classify(stage, policy, status, body))
}

pub(crate) fn classify(
    stage: ConversionStage,
    policy: StatusPolicy,
    status: StatusCode,
    body: String,
) -> Pdf2MdError {
    let auth_failure = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN);
    if auth_failure && policy == StatusPolicy::Authenticated {
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };
        return Pdf2MdError::Authentication { stage, detail };
    }
    Pdf2MdError::Service {
        stage,
        status: status.as_u16(),
        body,
    }
}

/// Read the whole body, then parse it as JSON.
///
/// Reading and parsing are split so that a dropped connection stays a
/// transport error while a malformed body becomes a decode error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    stage: ConversionStage,
    response: Response,
) -> Result<T, Pdf2MdError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2MdError::from_reqwest(stage, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Pdf2MdError::Decode {
        stage,
        detail: e.to_string(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
