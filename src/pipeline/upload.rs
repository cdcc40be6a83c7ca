//! Upload: send the PDF bytes to the file endpoint, get a document handle.
//!
//! One multipart `POST {upload_path}` with two parts:
//!
//! | part      | value                                   |
//! |-----------|-----------------------------------------|
//! | `purpose` | `ocr`                                   |
//! | `file`    | the PDF, named after the source file    |
//!
//! The response is `{"id": "<handle>", ...}`. Only the id is kept.

use crate::client::{check_status, read_json, MistralClient, StatusPolicy};
use crate::error::Pdf2MdError;
use crate::model::DocumentHandle;
use crate::pipeline::input::check_pdf_bytes;
use crate::progress::ConversionStage;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

const STAGE: ConversionStage = ConversionStage::Uploading;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

impl MistralClient {
    /// Upload a PDF and return its remote handle.
    ///
    /// `filename` only names the multipart part. A single attempt is made.
    pub async fn upload(&self, file: &[u8], filename: &str) -> Result<DocumentHandle, Pdf2MdError> {
        check_pdf_bytes(filename, file)?;

        let url = self.config.endpoint(&self.config.upload_path);
        info!("Uploading {} ({} bytes)", filename, file.len());

        let part = Part::bytes(file.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| Pdf2MdError::Internal(format!("multipart: {e}")))?;
        let form = Form::new().text("purpose", "ocr").part("file", part);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Pdf2MdError::from_reqwest(STAGE, e))?;

        let response = check_status(STAGE, StatusPolicy::Authenticated, response).await?;
        let body: UploadResponse = read_json(STAGE, response).await?;

        if body.id.trim().is_empty() {
            return Err(Pdf2MdError::Decode {
                stage: STAGE,
                detail: "upload response carries an empty id".into(),
            });
        }

        debug!("Uploaded {} → handle {}", filename, body.id);
        Ok(DocumentHandle::new(body.id))
    }
}
