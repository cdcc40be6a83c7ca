//! Conversion entry points.
//!
//! A run is strictly sequential: upload, resolve, fetch, then materialize.
//! Each network step suspends the calling task while it waits; nothing runs
//! in parallel within a run and no state is shared between runs.
//!
//! ## Concurrent runs
//!
//! Independent runs may be awaited concurrently. Two runs targeting the same
//! output folder are not coordinated: folder creation and file writes can
//! race, and the last writer wins. Callers that care should serialise
//! conversions per target folder.

use crate::client::MistralClient;
use crate::config::ConversionConfig;
use crate::error::Pdf2MdError;
use crate::model::StructuredDocument;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::input::{ConversionRequest, SourceFile};
use crate::pipeline::materialize::materialize;
use crate::progress::{ConversionProgressCallback, ConversionStage};
use crate::storage::{FsVault, VaultStorage};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tracks the current stage of one run and forwards transitions.
struct RunState<'a> {
    stage: ConversionStage,
    callback: Option<&'a dyn ConversionProgressCallback>,
}

impl<'a> RunState<'a> {
    fn new(config: &'a ConversionConfig) -> Self {
        Self {
            stage: ConversionStage::Idle,
            callback: config.progress_callback.as_deref(),
        }
    }

    fn enter(&mut self, stage: ConversionStage) {
        debug!("Stage: {} → {}", self.stage, stage);
        self.stage = stage;
        if let Some(cb) = self.callback {
            cb.on_stage(stage);
        }
    }
}

/// Durations of the three network stages, in milliseconds.
#[derive(Debug, Default)]
struct RemoteTimings {
    upload_ms: u64,
    resolve_ms: u64,
    fetch_ms: u64,
}

/// Convert a PDF into a Markdown note and images inside `storage`.
///
/// This is the primary entry point for the library. It emits exactly one
/// terminal notification through the configured progress callback:
/// `on_conversion_complete` or `on_conversion_failed`.
///
/// # Errors
/// - [`Pdf2MdError::MissingApiKey`] before any network call when no key is set
/// - [`Pdf2MdError::InvalidInput`] when the target folder is empty
/// - `Authentication`, `Transport`, `Service`, `Decode` from the remote stages
/// - [`Pdf2MdError::Storage`] when the Markdown note cannot be written
///
/// Per-image and folder-creation problems do not fail the run; they are
/// listed in `output.report.issues`.
pub async fn convert(
    request: &ConversionRequest,
    config: &ConversionConfig,
    storage: &dyn VaultStorage,
) -> Result<ConversionOutput, Pdf2MdError> {
    let total_start = Instant::now();
    let mut run = RunState::new(config);
    info!(
        "Starting conversion: {} → {}",
        request.source.filename(),
        request.target_folder
    );

    match run_pipeline(request, config, storage, &mut run).await {
        Ok(mut output) => {
            output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
            run.enter(ConversionStage::Succeeded);
            info!(
                "Conversion complete: {} ({} images, {} issues) in {}ms",
                output.report.markdown_path,
                output.report.images_written.len(),
                output.report.issues.len(),
                output.stats.total_duration_ms
            );
            if let Some(cb) = run.callback {
                cb.on_conversion_complete(&output);
            }
            Ok(output)
        }
        Err(e) => {
            let failed_at = run.stage;
            warn!("Conversion failed during {}: {}", failed_at, e);
            run.enter(ConversionStage::Failed);
            if let Some(cb) = run.callback {
                cb.on_conversion_failed(failed_at, &e.to_string());
            }
            Err(e)
        }
    }
}

/// Convert a local PDF into a vault directory on disk.
///
/// `vault_dir` is both the storage root and the prefix stripped from an
/// absolute `target_folder`; it overrides `config.vault_root`.
pub async fn convert_to_vault(
    pdf_path: impl AsRef<Path>,
    target_folder: &str,
    vault_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    let vault_dir = vault_dir.as_ref();
    let source = SourceFile::from_path(pdf_path).await?;
    let request = ConversionRequest::new(source, target_folder);

    let mut config = config.clone();
    config.vault_root = vault_dir.to_string_lossy().into_owned();

    convert(&request, &config, &FsVault::new(vault_dir)).await
}

/// Synchronous wrapper around [`convert_to_vault`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_to_vault_sync(
    pdf_path: impl AsRef<Path>,
    target_folder: &str,
    vault_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_to_vault(pdf_path, target_folder, vault_dir, config))
}

/// Run only the remote half: upload, resolve and fetch.
///
/// Useful to inspect the structured payload without writing anything.
/// Progress callbacks are not invoked.
pub async fn fetch_structured(
    source: &SourceFile,
    config: &ConversionConfig,
) -> Result<StructuredDocument, Pdf2MdError> {
    let client = MistralClient::new(config)?;
    let handle = client.upload(source.bytes(), source.filename()).await?;
    let url = client.resolve(&handle).await?;
    client.fetch(url).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline(
    request: &ConversionRequest,
    config: &ConversionConfig,
    storage: &dyn VaultStorage,
    run: &mut RunState<'_>,
) -> Result<ConversionOutput, Pdf2MdError> {
    if request.target_folder.trim().is_empty() {
        return Err(Pdf2MdError::InvalidInput(
            "no destination folder given".into(),
        ));
    }
    // Fails on a missing key before anything is sent.
    let client = MistralClient::new(config)?;

    let (doc, timings) = fetch_with_progress(&client, &request.source, run).await?;

    run.enter(ConversionStage::Materializing);
    let materialize_start = Instant::now();
    let report = materialize(
        &doc,
        request.source.filename(),
        &request.target_folder,
        &config.vault_root,
        storage,
        run.callback,
    )
    .await?;

    let stats = ConversionStats {
        page_count: doc.pages.len(),
        image_count: doc.image_count(),
        images_written: report.images_written.len(),
        body_bytes: doc.pages.iter().filter_map(|p| p.text()).map(|t| t.len() + 1).sum(),
        upload_duration_ms: timings.upload_ms,
        resolve_duration_ms: timings.resolve_ms,
        fetch_duration_ms: timings.fetch_ms,
        materialize_duration_ms: materialize_start.elapsed().as_millis() as u64,
        total_duration_ms: 0,
    };

    Ok(ConversionOutput {
        source_filename: request.source.filename().to_string(),
        report,
        stats,
    })
}

async fn fetch_with_progress(
    client: &MistralClient,
    source: &SourceFile,
    run: &mut RunState<'_>,
) -> Result<(StructuredDocument, RemoteTimings), Pdf2MdError> {
    let mut timings = RemoteTimings::default();

    run.enter(ConversionStage::Uploading);
    let start = Instant::now();
    let handle = client.upload(source.bytes(), source.filename()).await?;
    timings.upload_ms = start.elapsed().as_millis() as u64;

    run.enter(ConversionStage::Resolving);
    let start = Instant::now();
    let url = client.resolve(&handle).await?;
    timings.resolve_ms = start.elapsed().as_millis() as u64;

    run.enter(ConversionStage::Fetching);
    let start = Instant::now();
    let doc = client.fetch(url).await?;
    timings.fetch_ms = start.elapsed().as_millis() as u64;

    debug!("Remote stages: {:?}", timings);
    Ok((doc, timings))
}
