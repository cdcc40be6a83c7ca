//! Value types exchanged with the OCR service.
//!
//! The handle, the signed URL and the structured payload are a fixed
//! external contract. They are plain immutable values: each is produced by
//! one pipeline stage and consumed by the next, and none of them outlives
//! the run that created it.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque reference to an uploaded PDF on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time-limited, pre-authorised retrieval URL.
///
/// Deliberately not `Serialize`: it is consumed immediately by
/// [`crate::client::MistralClient::fetch`] and must never be persisted.
/// `Debug` prints only the origin and path because the query string carries
/// the signature.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedUrl(String);

impl SignedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible = self.0.split('?').next().unwrap_or_default();
        write!(f, "SignedUrl({visible}?…)")
    }
}

/// The structured payload: one entry per PDF page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub pages: Vec<Page>,
}

/// A single page of the structured payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<EmbeddedImage>,
}

/// An image embedded in a page, usually as a `data:image/...;base64,` URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    #[serde(default, rename = "imageBase64", alias = "image_base64")]
    pub image_base64: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl StructuredDocument {
    /// Total number of images carrying a non-empty payload.
    pub fn image_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.images.iter())
            .filter(|img| img.payload().is_some())
            .count()
    }
}

impl Page {
    /// Page text, treating an empty string like a missing field.
    pub fn text(&self) -> Option<&str> {
        self.markdown.as_deref().filter(|s| !s.is_empty())
    }
}

impl EmbeddedImage {
    /// The encoded payload, treating an empty string like a missing field.
    pub fn payload(&self) -> Option<&str> {
        self.image_base64.as_deref().filter(|s| !s.is_empty())
    }
}

/// Text body plus still-encoded image payloads, derived from a
/// [`StructuredDocument`].
///
/// Images stay encoded here so the materializer can decode them one at a
/// time and skip a malformed payload without losing the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionResult {
    pub body: String,
    pub images: Vec<String>,
}

impl ConversionResult {
    /// Join page texts and flatten image payloads.
    ///
    /// Every non-empty page text is followed by exactly one space; pages
    /// without text add nothing. Images are flattened page by page, keeping
    /// in-page order, and images without a payload are dropped before
    /// numbering.
    pub fn from_document(doc: &StructuredDocument) -> Self {
        let mut body = String::new();
        let mut images = Vec::new();

        for page in &doc.pages {
            if let Some(text) = page.text() {
                body.push_str(text);
                body.push(' ');
            }
            images.extend(page.images.iter().filter_map(|img| img.payload().map(str::to_string)));
        }

        Self { body, images }
    }
}
