//! Pipeline stages for PDF-to-Markdown conversion.
//!
//! Each submodule implements exactly one step. Stages only consume the
//! previous stage's output value, never its internals.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ upload ──▶ resolve ──▶ fetch ──▶ decode + materialize
//! (bytes)   (handle)   (signed URL) (JSON)   (note + images in the vault)
//! ```
//!
//! 1. [`input`]   — load and validate the PDF, build the request
//! 2. [`upload`]  — multipart upload; yields a [`crate::model::DocumentHandle`]
//! 3. [`resolve`] — handle → [`crate::model::SignedUrl`] → [`crate::model::StructuredDocument`]
//! 4. [`decode`]  — base64 / data-URL image payloads → bytes
//! 5. [`materialize`] — folder, images, then the Markdown note

pub mod decode;
pub mod input;
pub mod materialize;
pub mod resolve;
pub mod upload;
