//! # mistral-pdf2md
//!
//! Convert PDF documents into Markdown notes with their embedded images,
//! using the Mistral OCR service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload       multipart POST of the raw bytes        → document handle
//!  ├─ 2. Resolve      handle → time-limited signed URL
//!  ├─ 3. Fetch        signed URL → { pages: [{ markdown, images }] }
//!  └─ 4. Materialize  {folder}{name}/{name}.md + img-0.jpeg, img-1.jpeg, …
//! ```
//!
//! Each step consumes only the previous step's output. Network failures
//! abort the run at the failing step; image problems are reported and
//! skipped; the Markdown note is always written last.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mistral_pdf2md::{convert_to_vault, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .api_key(std::env::var("MISTRAL_API_KEY")?)
//!         .build()?;
//!     let output = convert_to_vault("report.pdf", "/Conversions/", "/home/me/vault", &config).await?;
//!     println!("{}", output.report.markdown_path);
//!     for issue in &output.report.issues {
//!         eprintln!("warning: {issue}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! mistral-pdf2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod settings;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::MistralClient;
pub use config::{ConversionConfig, ConversionConfigBuilder, FetchStrategy};
pub use convert::{convert, convert_to_vault, convert_to_vault_sync, fetch_structured};
pub use error::{MaterializeIssue, Pdf2MdError};
pub use model::{ConversionResult, DocumentHandle, EmbeddedImage, Page, SignedUrl, StructuredDocument};
pub use output::{ConversionOutput, ConversionStats, MaterializeReport};
pub use pipeline::input::{ConversionRequest, SourceFile};
pub use pipeline::materialize::materialize;
pub use progress::{ConversionProgressCallback, ConversionStage, NoopProgressCallback, ProgressCallback};
pub use settings::Settings;
pub use storage::{FsVault, MemoryVault, VaultStorage};
