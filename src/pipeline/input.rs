//! Input resolution: load the PDF to upload and build the run request.
//!
//! The service only accepts PDFs, so the `%PDF` magic bytes are checked
//! before any network call. A user who picked the wrong file gets a local,
//! meaningful error instead of an opaque rejection from the upload endpoint.

use crate::config::ConversionConfig;
use crate::error::Pdf2MdError;
use crate::pipeline::materialize::base_name;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF in memory together with the file name it was picked under.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    filename: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SourceFile {
    /// Wrap bytes already in memory, validating that they look like a PDF.
    pub fn from_bytes(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Pdf2MdError> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(Pdf2MdError::InvalidInput("source file name is empty".into()));
        }
        if base_name(&filename).trim().is_empty() {
            return Err(Pdf2MdError::InvalidInput(format!(
                "'{filename}' leaves no name for the note"
            )));
        }
        check_pdf_bytes(&filename, &bytes)?;
        Ok(Self { filename, bytes })
    }

    /// Read a local PDF file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Pdf2MdError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => Pdf2MdError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Pdf2MdError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Pdf2MdError::InvalidInput(format!("'{}' has no file name", path.display())))?;

        debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(filename, bytes)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reject empty buffers and anything not starting with `%PDF`.
pub fn check_pdf_bytes(name: &str, bytes: &[u8]) -> Result<(), Pdf2MdError> {
    if bytes.is_empty() {
        return Err(Pdf2MdError::InvalidInput(format!("'{name}' is empty")));
    }
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Pdf2MdError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

/// One conversion: the PDF and where its artefacts go.
///
/// Created when the user starts a conversion and dropped once the run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: SourceFile,
    pub target_folder: String,
}

impl ConversionRequest {
    pub fn new(source: SourceFile, target_folder: impl Into<String>) -> Self {
        Self {
            source,
            target_folder: target_folder.into(),
        }
    }

    /// Request targeting the configured default folder.
    pub fn with_default_folder(source: SourceFile, config: &ConversionConfig) -> Self {
        Self::new(source, config.default_folder.clone())
    }

    /// Load `path` and target `folder`.
    pub async fn from_path(path: impl Into<PathBuf>, folder: impl Into<String>) -> Result<Self, Pdf2MdError> {
        let source = SourceFile::from_path(path.into()).await?;
        Ok(Self::new(source, folder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_pdf_magic() {
        let src = SourceFile::from_bytes("a.pdf", b"%PDF-1.7\n...".to_vec()).unwrap();
        assert_eq!(src.filename(), "a.pdf");
        assert_eq!(src.len(), 12);
    }

    #[test]
    fn rejects_empty_bytes() {
        let err = SourceFile::from_bytes("a.pdf", Vec::new()).unwrap_err();
        assert!(matches!(err, Pdf2MdError::InvalidInput(_)));
    }

    #[test]
    fn rejects_non_pdf() {
        let err = SourceFile::from_bytes("a.png", b"\x89PNG....".to_vec()).unwrap_err();
        match err {
            Pdf2MdError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn short_buffer_is_not_a_pdf() {
        let err = SourceFile::from_bytes("a.pdf", b"%P".to_vec()).unwrap_err();
        assert!(matches!(err, Pdf2MdError::NotAPdf { magic: [b'%', b'P', 0, 0], .. }));
    }

    #[test]
    fn rejects_blank_filename() {
        assert!(SourceFile::from_bytes("  ", b"%PDF".to_vec()).is_err());
    }

    #[test]
    fn rejects_name_that_is_only_the_suffix() {
        for name in [".pdf", " .pdf"] {
            let err = SourceFile::from_bytes(name, b"%PDF".to_vec()).unwrap_err();
            assert!(matches!(err, Pdf2MdError::InvalidInput(_)), "{name}: {err:?}");
        }
        assert!(SourceFile::from_bytes(".PDF", b"%PDF".to_vec()).is_ok());
    }

    #[tokio::test]
    async fn loads_from_disk_with_file_name() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4 test").unwrap();
        let src = SourceFile::from_path(tmp.path()).await.unwrap();
        assert!(src.filename().ends_with(".pdf"));
        assert_eq!(src.bytes(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = SourceFile::from_path("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, Pdf2MdError::FileNotFound { .. }));
    }

    #[test]
    fn default_folder_request() {
        let config = ConversionConfig::default();
        let src = SourceFile::from_bytes("r.pdf", b"%PDF".to_vec()).unwrap();
        let req = ConversionRequest::with_default_folder(src, &config);
        assert_eq!(req.target_folder, "/Conversions/");
    }
}
