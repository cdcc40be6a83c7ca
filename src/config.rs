//! Configuration types for PDF-to-Markdown conversion.
//!
//! Everything a run needs — credentials, service endpoints, timeouts, the
//! default destination — travels in one [`ConversionConfig`] passed
//! explicitly to [`crate::convert::convert`]. Each run works on its own
//! snapshot (`Clone`), so concurrent runs never share mutable settings.

use crate::error::Pdf2MdError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default destination folder inside the vault.
pub const DEFAULT_FOLDER: &str = "/Conversions/";

/// Default Mistral API origin.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";

/// Default OCR model for [`FetchStrategy::OcrEndpoint`].
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

/// Configuration for a PDF-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use mistral_pdf2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .api_key("sk-...")
///     .default_folder("/Inbox/")
///     .request_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_folder, "/Inbox/");
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Mistral API key sent as a bearer token. Required; no default.
    ///
    /// An empty key is accepted by the builder so that settings can be
    /// loaded before the user has entered one, but [`crate::convert::convert`]
    /// refuses to touch the network until it is set.
    pub api_key: String,

    /// Folder used when a request does not name one. Default: `/Conversions/`.
    pub default_folder: String,

    /// Absolute path of the vault on disk. Stripped from target folders
    /// that were picked as absolute paths. Default: empty (nothing stripped).
    pub vault_root: String,

    /// Service origin, without trailing slash. Default: `https://api.mistral.ai`.
    pub base_url: String,

    /// Path of the file-upload endpoint. Default: `/v1/files`.
    ///
    /// The signed-URL exchange lives under the same prefix:
    /// `{upload_path}/{id}/url`.
    pub upload_path: String,

    /// Path of the OCR processing endpoint. Default: `/v1/ocr`.
    /// Only used with [`FetchStrategy::OcrEndpoint`].
    pub ocr_path: String,

    /// Requested validity of the signed URL, in hours. Default: 24.
    pub signed_url_expiry_hours: u32,

    /// How the structured payload is retrieved from the signed URL.
    pub fetch_strategy: FetchStrategy,

    /// Whole-request timeout for every HTTP call, in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// TCP connect timeout, in seconds. Default: 30.
    pub connect_timeout_secs: u64,

    /// Optional observer for stage transitions and terminal notifications.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_folder: DEFAULT_FOLDER.to_string(),
            vault_root: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_path: "/v1/files".to_string(),
            ocr_path: "/v1/ocr".to_string(),
            signed_url_expiry_hours: 24,
            fetch_strategy: FetchStrategy::default(),
            request_timeout_secs: 120,
            connect_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<unset>" })
            .field("default_folder", &self.default_folder)
            .field("vault_root", &self.vault_root)
            .field("base_url", &self.base_url)
            .field("upload_path", &self.upload_path)
            .field("ocr_path", &self.ocr_path)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("fetch_strategy", &self.fetch_strategy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when a non-blank API key is configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The trimmed API key, or [`Pdf2MdError::MissingApiKey`].
    pub fn require_api_key(&self) -> Result<&str, Pdf2MdError> {
        if self.has_api_key() {
            Ok(self.api_key.trim())
        } else {
            Err(Pdf2MdError::MissingApiKey)
        }
    }

    /// Absolute URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn default_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.default_folder = folder.into();
        self
    }

    pub fn vault_root(mut self, root: impl Into<String>) -> Self {
        self.config.vault_root = root.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    pub fn ocr_path(mut self, path: impl Into<String>) -> Self {
        self.config.ocr_path = path.into();
        self
    }

    pub fn signed_url_expiry_hours(mut self, hours: u32) -> Self {
        self.config.signed_url_expiry_hours = hours;
        self
    }

    pub fn fetch_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.config.fetch_strategy = strategy;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing API key is not a build error; it is reported by the run.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.signed_url_expiry_hours == 0 {
            return Err(Pdf2MdError::InvalidConfig(
                "Signed URL expiry must be ≥ 1 hour".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.connect_timeout_secs == 0 {
            return Err(Pdf2MdError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if let FetchStrategy::OcrEndpoint { model } = &c.fetch_strategy {
            if model.trim().is_empty() {
                return Err(Pdf2MdError::InvalidConfig("OCR model must not be empty".into()));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the structured payload is obtained once a signed URL is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FetchStrategy {
    /// Plain GET on the signed URL; the response body is the payload. (default)
    #[default]
    SignedUrl,
    /// POST the signed URL to the OCR endpoint and read the payload from
    /// its response, asking for embedded images as base64.
    OcrEndpoint { model: String },
}

impl FetchStrategy {
    /// OCR endpoint strategy with [`DEFAULT_OCR_MODEL`].
    pub fn ocr_default() -> Self {
        FetchStrategy::OcrEndpoint {
            model: DEFAULT_OCR_MODEL.to_string(),
        }
    }
}
