//! Resolve: exchange a handle for a signed URL, then fetch the payload.
//!
//! ```text
//! GET  {upload_path}/{id}/url?expiry=H   →  {"url": "https://…signed…"}
//! GET  <signed url>                      →  {"pages": [...]}           (SignedUrl)
//! POST {ocr_path} {document_url: <url>}  →  {"pages": [...]}           (OcrEndpoint)
//! ```
//!
//! The signed URL is used once and dropped. When it has expired the service
//! answers with an access-denied status, which surfaces as
//! [`Pdf2MdError::Service`]; the run must start over from the upload.

use crate::client::{check_status, read_json, MistralClient, StatusPolicy};
use crate::config::FetchStrategy;
use crate::error::Pdf2MdError;
use crate::model::{DocumentHandle, SignedUrl, StructuredDocument};
use crate::progress::ConversionStage;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentUrl<'a>,
    include_image_base64: bool,
}

#[derive(Debug, Serialize)]
struct DocumentUrl<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: &'a str,
}

impl MistralClient {
    /// Exchange a handle for a time-limited retrieval URL.
    ///
    /// Not assumed idempotent: the service may mint a new URL per call.
    pub async fn resolve(&self, handle: &DocumentHandle) -> Result<SignedUrl, Pdf2MdError> {
        const STAGE: ConversionStage = ConversionStage::Resolving;

        let url = self.signed_url_endpoint(handle)?;
        debug!("Requesting signed URL for {}", handle);

        let response = self
            .http
            .get(url)
            .query(&[("expiry", self.config.signed_url_expiry_hours)])
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Pdf2MdError::from_reqwest(STAGE, e))?;

        let response = check_status(STAGE, StatusPolicy::Authenticated, response).await?;
        let body: SignedUrlResponse = read_json(STAGE, response).await?;

        if reqwest::Url::parse(&body.url).is_err() {
            return Err(Pdf2MdError::Decode {
                stage: STAGE,
                detail: format!("signed URL is not a valid URL: '{}'", body.url),
            });
        }

        info!("Resolved signed URL for {}", handle);
        Ok(SignedUrl::new(body.url))
    }

    /// Retrieve and parse the structured payload behind a signed URL.
    ///
    /// Consumes the URL; it must not be reused after this call.
    pub async fn fetch(&self, url: SignedUrl) -> Result<StructuredDocument, Pdf2MdError> {
        const STAGE: ConversionStage = ConversionStage::Fetching;

        let (request, policy) = match &self.config.fetch_strategy {
            FetchStrategy::SignedUrl => {
                debug!("Fetching payload from {:?}", url);
                (self.http.get(url.as_str()), StatusPolicy::PreSigned)
            }
            FetchStrategy::OcrEndpoint { model } => {
                debug!("Requesting OCR with model {} for {:?}", model, url);
                let body = OcrRequest {
                    model,
                    document: DocumentUrl {
                        kind: "document_url",
                        document_url: url.as_str(),
                    },
                    include_image_base64: true,
                };
                let request = self
                    .http
                    .post(self.config.endpoint(&self.config.ocr_path))
                    .header(AUTHORIZATION, self.bearer())
                    .json(&body);
                (request, StatusPolicy::Authenticated)
            }
        };

        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Pdf2MdError::from_reqwest(STAGE, e))?;

        let response = check_status(STAGE, policy, response).await?;
        let doc: StructuredDocument = read_json(STAGE, response).await?;

        info!(
            "Fetched structured document: {} pages, {} images",
            doc.pages.len(),
            doc.image_count()
        );
        Ok(doc)
    }

    /// `{base}{upload_path}/{id}/url`, with the id percent-encoded.
    fn signed_url_endpoint(&self, handle: &DocumentHandle) -> Result<reqwest::Url, Pdf2MdError> {
        let base = self.config.endpoint(&self.config.upload_path);
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| Pdf2MdError::InvalidConfig(format!("upload endpoint '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Pdf2MdError::InvalidConfig(format!("upload endpoint '{base}' cannot be a base")))?
            .pop_if_empty()
            .push(handle.as_str())
            .push("url");
        Ok(url)
    }
}
