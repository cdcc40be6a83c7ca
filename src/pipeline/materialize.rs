//! Materialize: write the structured document into the vault.
//!
//! Given `report.pdf` and target folder `/vault/Notes/` under vault root
//! `/vault`, the artefacts land at:
//!
//! ```text
//! Notes/report/img-0.jpeg
//! Notes/report/img-1.jpeg
//! Notes/report/report.md
//! ```
//!
//! The folder and the base name are concatenated as-is. A target folder
//! without a trailing separator (`Notes`) therefore yields `Notesreport`.
//! Existing vaults depend on that layout, so it is reproduced literally.
//!
//! Writing is best effort. A folder that cannot be created or an image that
//! cannot be decoded or written is recorded as a [`MaterializeIssue`] and the
//! remaining artefacts are still attempted. Only a failure to write the
//! Markdown note fails the call, and nothing already written is rolled back.

use crate::error::{MaterializeIssue, Pdf2MdError};
use crate::model::{ConversionResult, StructuredDocument};
use crate::output::MaterializeReport;
use crate::pipeline::decode::decode_image_payload;
use crate::progress::ConversionProgressCallback;
use crate::storage::VaultStorage;
use tracing::{debug, info, warn};

/// `report.pdf` → `report`. Only a trailing, lower-case `.pdf` is removed.
pub fn base_name(source_filename: &str) -> &str {
    source_filename.strip_suffix(".pdf").unwrap_or(source_filename)
}

/// Make `target_folder` relative to the vault root.
///
/// Strips `vault_root` (ignoring its trailing separators) when it is a
/// prefix, then any leading separators.
pub fn normalize_folder<'a>(target_folder: &'a str, vault_root: &str) -> &'a str {
    let vault_root = vault_root.trim_end_matches(['/', '\\']);
    let rest = if vault_root.is_empty() {
        target_folder
    } else {
        target_folder.strip_prefix(vault_root).unwrap_or(target_folder)
    };
    rest.trim_start_matches(['/', '\\'])
}

/// `{normalized_folder}{base_name}`, or just `base_name` at the vault root.
pub fn output_dir(normalized_folder: &str, base_name: &str) -> String {
    format!("{normalized_folder}{base_name}")
}

/// Write `doc` as a Markdown note plus images.
///
/// `progress` receives each [`MaterializeIssue`] as it happens; the same
/// issues are returned in the report.
pub async fn materialize(
    doc: &StructuredDocument,
    source_filename: &str,
    target_folder: &str,
    vault_root: &str,
    storage: &dyn VaultStorage,
    progress: Option<&dyn ConversionProgressCallback>,
) -> Result<MaterializeReport, Pdf2MdError> {
    let base = base_name(source_filename);
    if base.trim().is_empty() {
        return Err(Pdf2MdError::InvalidInput(format!(
            "'{source_filename}' leaves no name for the note"
        )));
    }
    let folder = normalize_folder(target_folder, vault_root);
    let dir = output_dir(folder, base);
    let markdown_path = format!("{dir}/{base}.md");
    info!("Materializing '{}' into '{}'", source_filename, dir);

    let mut report = MaterializeReport {
        output_dir: dir.clone(),
        markdown_path: markdown_path.clone(),
        ..Default::default()
    };
    let record = |report: &mut MaterializeReport, issue: MaterializeIssue| {
        warn!("{}", issue);
        if let Some(cb) = progress {
            cb.on_issue(&issue);
        }
        report.issues.push(issue);
    };

    // ── Output folder ────────────────────────────────────────────────────
    report.folder_existed = storage.exists(&dir).await;
    if !report.folder_existed {
        if let Err(e) = storage.create_folder(&dir).await {
            record(
                &mut report,
                MaterializeIssue::FolderCreation {
                    path: dir.clone(),
                    detail: e.to_string(),
                },
            );
        } else {
            debug!("Created folder '{}'", dir);
        }
    }

    let result = ConversionResult::from_document(doc);

    // ── Images ───────────────────────────────────────────────────────────
    for (index, payload) in result.images.iter().enumerate() {
        let path = format!("{dir}/img-{index}.jpeg");
        let bytes = match decode_image_payload(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                record(
                    &mut report,
                    MaterializeIssue::ImageDecode {
                        index,
                        detail: e.to_string(),
                    },
                );
                continue;
            }
        };
        match storage.write_binary(&path, &bytes).await {
            Ok(()) => {
                debug!("Wrote '{}' ({} bytes)", path, bytes.len());
                report.images_written.push(path);
            }
            Err(e) => record(
                &mut report,
                MaterializeIssue::ImageWrite {
                    index,
                    path,
                    detail: e.to_string(),
                },
            ),
        }
    }

    // ── Markdown note (last) ─────────────────────────────────────────────
    storage
        .create_text_file(&markdown_path, &result.body)
        .await
        .map_err(|e| Pdf2MdError::Storage {
            path: markdown_path.clone(),
            detail: e.to_string(),
        })?;

    info!(
        "Wrote '{}' ({} bytes) and {}/{} images",
        markdown_path,
        result.body.len(),
        report.images_written.len(),
        result.images.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EmbeddedImage, Page};
    use crate::storage::MemoryVault;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use std::sync::Mutex;

    fn jpeg(tag: u8) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode([0xFF, 0xD8, tag]))
    }

    fn page(markdown: Option<&str>, images: Vec<Option<String>>) -> Page {
        Page {
            markdown: markdown.map(str::to_string),
            images: images
                .into_iter()
                .map(|image_base64| EmbeddedImage { image_base64 })
                .collect(),
        }
    }

    #[test]
    fn base_name_strips_lowercase_suffix_only() {
        assert_eq!(base_name("report.pdf"), "report");
        assert_eq!(base_name("report.PDF"), "report.PDF");
        assert_eq!(base_name("report.pdf.pdf"), "report.pdf");
        assert_eq!(base_name("my.pdf.notes"), "my.pdf.notes");
    }

    #[test]
    fn normalize_strips_root_then_separators() {
        assert_eq!(normalize_folder("/vault/Notes/", "/vault"), "Notes/");
        assert_eq!(normalize_folder("/Conversions/", ""), "Conversions/");
        assert_eq!(normalize_folder("/Conversions/", "/vault"), "Conversions/");
        assert_eq!(normalize_folder("/vault", "/vault"), "");
        assert_eq!(normalize_folder("///deep/", ""), "deep/");
        assert_eq!(normalize_folder("C:\\vault\\Notes\\", "C:\\vault"), "Notes\\");
    }

    #[test]
    fn normalize_ignores_trailing_separator_on_root() {
        assert_eq!(normalize_folder("/vault", "/vault/"), "");
        assert_eq!(normalize_folder("/vault/Notes/", "/vault/"), "Notes/");
        assert_eq!(normalize_folder("C:\\vault\\Notes\\", "C:\\vault\\"), "Notes\\");
        assert_eq!(normalize_folder("/Notes/", "/"), "Notes/");
    }

    #[tokio::test]
    async fn suffix_only_name_writes_nothing() {
        let doc = StructuredDocument {
            pages: vec![page(Some("x"), vec![Some(jpeg(1))])],
        };
        let vault = MemoryVault::new();
        let err = materialize(&doc, ".pdf", "/", "", &vault, None).await.unwrap_err();
        assert!(matches!(err, Pdf2MdError::InvalidInput(_)), "{err:?}");
        assert!(vault.files().is_empty());
        assert!(vault.folders().is_empty());
    }

    #[test]
    fn output_dir_concatenates_without_separator() {
        assert_eq!(output_dir("", "x"), "x");
        assert_eq!(output_dir("Notes/", "x"), "Notes/x");
        assert_eq!(output_dir("Notes", "x"), "Notesx");
    }

    #[tokio::test]
    async fn hello_world_end_to_end() {
        let vault = MemoryVault::new();
        let doc = StructuredDocument {
            pages: vec![page(Some("Hello "), vec![Some(jpeg(1))]), page(Some("World"), vec![])],
        };

        let report = materialize(&doc, "hello.pdf", "/Conversions/", "", &vault, None)
            .await
            .unwrap();

        assert_eq!(report.output_dir, "Conversions/hello");
        assert_eq!(report.markdown_path, "Conversions/hello/hello.md");
        assert!(!report.folder_existed);
        assert!(report.is_clean());
        assert_eq!(vault.text("Conversions/hello/hello.md").unwrap(), "Hello  World ");
        assert_eq!(vault.file("Conversions/hello/img-0.jpeg").unwrap(), [0xFF, 0xD8, 1]);
        assert_eq!(
            vault.files(),
            vec!["Conversions/hello/hello.md", "Conversions/hello/img-0.jpeg"]
        );
    }

    #[tokio::test]
    async fn images_numbered_across_pages() {
        let vault = MemoryVault::new();
        let doc = StructuredDocument {
            pages: vec![
                page(Some("a"), vec![Some(jpeg(0)), None, Some(jpeg(1))]),
                page(None, vec![]),
                page(Some("c"), vec![Some(jpeg(2))]),
            ],
        };

        let report = materialize(&doc, "doc.pdf", "", "", &vault, None).await.unwrap();

        assert_eq!(report.output_dir, "doc");
        assert_eq!(report.images_written, vec!["doc/img-0.jpeg", "doc/img-1.jpeg", "doc/img-2.jpeg"]);
        for i in 0..3u8 {
            assert_eq!(vault.file(&format!("doc/img-{i}.jpeg")).unwrap(), [0xFF, 0xD8, i]);
        }
        assert_eq!(vault.text("doc/doc.md").unwrap(), "a c ");
    }

    #[tokio::test]
    async fn bad_image_is_skipped_and_keeps_its_index() {
        let vault = MemoryVault::new();
        let doc = StructuredDocument {
            pages: vec![page(
                Some("t"),
                vec![Some(jpeg(0)), Some("data:image/jpeg;base64,@@not-base64@@".into()), Some(jpeg(2))],
            )],
        };

        let report = materialize(&doc, "r.pdf", "Notes/", "", &vault, None).await.unwrap();

        assert_eq!(report.images_written, vec!["Notes/r/img-0.jpeg", "Notes/r/img-2.jpeg"]);
        assert!(matches!(report.issues[..], [MaterializeIssue::ImageDecode { index: 1, .. }]));
        assert!(vault.text("Notes/r/r.md").is_some());
    }

    #[tokio::test]
    async fn image_write_failure_does_not_stop_the_rest() {
        let vault = MemoryVault::new().fail_on("r/img-0.jpeg");
        let doc = StructuredDocument {
            pages: vec![page(None, vec![Some(jpeg(0)), Some(jpeg(1))])],
        };

        let report = materialize(&doc, "r.pdf", "/", "", &vault, None).await.unwrap();

        assert_eq!(report.images_written, vec!["r/img-1.jpeg"]);
        assert!(matches!(report.issues[..], [MaterializeIssue::ImageWrite { index: 0, .. }]));
        assert_eq!(vault.text("r/r.md").unwrap(), "");
    }

    #[tokio::test]
    async fn existing_folder_is_not_recreated_and_rerun_is_identical() {
        let vault = MemoryVault::new().with_folder("Notes/r").fail_on("Notes/r");
        let doc = StructuredDocument {
            pages: vec![page(Some("same"), vec![Some(jpeg(7))])],
        };

        let first = materialize(&doc, "r.pdf", "Notes/", "", &vault, None).await.unwrap();
        let snapshot: Vec<_> = vault.files().iter().map(|p| (p.clone(), vault.file(p))).collect();
        let second = materialize(&doc, "r.pdf", "Notes/", "", &vault, None).await.unwrap();
        let again: Vec<_> = vault.files().iter().map(|p| (p.clone(), vault.file(p))).collect();

        // `fail_on` would have reported an issue had creation been attempted.
        assert!(first.folder_existed && first.is_clean());
        assert!(second.folder_existed && second.is_clean());
        assert_eq!(snapshot, again);
    }

    #[tokio::test]
    async fn folder_failure_is_reported_and_writing_continues() {
        let vault = MemoryVault::new().fail_on("Locked/r");
        let doc = StructuredDocument {
            pages: vec![page(Some("x"), vec![Some(jpeg(0))])],
        };

        let err = materialize(&doc, "r.pdf", "Locked/", "", &vault, None).await.unwrap_err();

        // The note still needs its folder, so the final write fails too.
        match err {
            Pdf2MdError::Storage { path, .. } => assert_eq!(path, "Locked/r/r.md"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(vault.files().is_empty());
    }

    #[tokio::test]
    async fn markdown_failure_keeps_written_images() {
        let vault = MemoryVault::new().fail_on("r/r.md");
        let doc = StructuredDocument {
            pages: vec![page(Some("x"), vec![Some(jpeg(0))])],
        };

        let err = materialize(&doc, "r.pdf", "", "", &vault, None).await.unwrap_err();

        assert!(matches!(err, Pdf2MdError::Storage { .. }));
        assert_eq!(vault.files(), vec!["r/img-0.jpeg"]);
    }

    #[tokio::test]
    async fn issues_are_forwarded_to_callback() {
        struct Collect(Mutex<Vec<MaterializeIssue>>);
        impl ConversionProgressCallback for Collect {
            fn on_issue(&self, issue: &MaterializeIssue) {
                self.0.lock().unwrap().push(issue.clone());
            }
        }

        let cb = Collect(Mutex::new(Vec::new()));
        let vault = MemoryVault::new();
        let doc = StructuredDocument {
            pages: vec![page(None, vec![Some("data:,".into())])],
        };

        let report = materialize(&doc, "r.pdf", "", "", &vault, Some(&cb)).await.unwrap();

        assert_eq!(*cb.0.lock().unwrap(), report.issues);
        assert_eq!(report.issues.len(), 1);
    }

    #[tokio::test]
    async fn vault_root_prefix_is_stripped() {
        let vault = MemoryVault::new();
        let doc = StructuredDocument { pages: vec![page(Some("x"), vec![])] };

        let report = materialize(&doc, "r.pdf", "/home/me/vault/Inbox/", "/home/me/vault", &vault, None)
            .await
            .unwrap();

        assert_eq!(report.markdown_path, "Inbox/r/r.md");
    }
}
