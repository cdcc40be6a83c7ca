//! Host storage: the four operations the materializer needs.
//!
//! Paths handed to a [`VaultStorage`] are relative to the vault root and use
//! `/` as separator, whatever the platform. Two backends ship with the
//! crate:
//!
//! * [`FsVault`] — a directory on the local filesystem.
//! * [`MemoryVault`] — an in-memory map, for tests and for hosts that want
//!   to inspect the artefacts before persisting them elsewhere.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Storage consumed by [`crate::pipeline::materialize::materialize`].
#[async_trait]
pub trait VaultStorage: Send + Sync {
    /// True if a file or folder exists at `path`.
    async fn exists(&self, path: &str) -> bool;

    /// Create a folder, including missing parents.
    async fn create_folder(&self, path: &str) -> io::Result<()>;

    /// Create or replace a binary file. The parent folder must exist.
    async fn write_binary(&self, path: &str, bytes: &[u8]) -> io::Result<()>;

    /// Create or replace a UTF-8 text file. The parent folder must exist.
    async fn create_text_file(&self, path: &str, content: &str) -> io::Result<()>;
}

// ── Filesystem ───────────────────────────────────────────────────────────

/// A vault rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault-relative path onto the filesystem.
    ///
    /// Rejects absolute paths and `..` so nothing is written outside the root.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let rel = Path::new(path);
        for component in rel.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("path '{path}' escapes the vault root"),
                    ))
                }
            }
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl VaultStorage for FsVault {
    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(p) => tokio::fs::try_exists(p).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn create_folder(&self, path: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(self.resolve(path)?).await
    }

    async fn write_binary(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(self.resolve(path)?, bytes).await
    }

    async fn create_text_file(&self, path: &str, content: &str) -> io::Result<()> {
        tokio::fs::write(self.resolve(path)?, content.as_bytes()).await
    }
}

// ── In-memory ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    folders: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    failing: BTreeSet<String>,
}

/// An in-memory vault.
///
/// Writes to a path registered with [`MemoryVault::fail_on`] return an
/// error, which lets callers exercise partial-failure handling.
#[derive(Debug, Default)]
pub struct MemoryVault {
    state: Mutex<MemoryState>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a folder (and its parents).
    pub fn with_folder(self, path: &str) -> Self {
        insert_folder(&mut self.lock(), path);
        self
    }

    /// Make every write or folder creation at `path` fail.
    pub fn fail_on(self, path: &str) -> Self {
        self.lock().failing.insert(normalize(path));
        self
    }

    /// Contents of the file at `path`.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&normalize(path)).cloned()
    }

    /// Contents of the file at `path`, as UTF-8.
    pub fn text(&self, path: &str) -> Option<String> {
        self.file(path).and_then(|b| String::from_utf8(b).ok())
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// All folder paths, sorted.
    pub fn folders(&self) -> Vec<String> {
        self.lock().folders.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, path: &str, bytes: Vec<u8>) -> io::Result<()> {
        let path = normalize(path);
        let mut state = self.lock();
        if state.failing.contains(&path) {
            return Err(injected(&path));
        }
        if let Some((parent, _)) = path.rsplit_once('/') {
            if !state.folders.contains(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent folder '{parent}' does not exist"),
                ));
            }
        }
        state.files.insert(path, bytes);
        Ok(())
    }
}

#[async_trait]
impl VaultStorage for MemoryVault {
    async fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        let state = self.lock();
        path.is_empty() || state.folders.contains(&path) || state.files.contains_key(&path)
    }

    async fn create_folder(&self, path: &str) -> io::Result<()> {
        let path = normalize(path);
        let mut state = self.lock();
        if state.failing.contains(&path) {
            return Err(injected(&path));
        }
        if state.files.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{path}' is a file"),
            ));
        }
        insert_folder(&mut state, &path);
        Ok(())
    }

    async fn write_binary(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        self.write(path, bytes.to_vec())
    }

    async fn create_text_file(&self, path: &str, content: &str) -> io::Result<()> {
        self.write(path, content.as_bytes().to_vec())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn insert_folder(state: &mut MemoryState, path: &str) {
    let path = normalize(path);
    let mut prefix = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        state.folders.insert(prefix.clone());
    }
}

fn injected(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, format!("write to '{path}' refused"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_folder_creation_includes_parents() {
        let vault = MemoryVault::new();
        vault.create_folder("a/b/c").await.unwrap();
        assert_eq!(vault.folders(), vec!["a", "a/b", "a/b/c"]);
        assert!(vault.exists("a/b").await);
        assert!(vault.exists("").await);
    }

    #[tokio::test]
    async fn memory_write_requires_parent() {
        let vault = MemoryVault::new();
        let err = vault.write_binary("missing/img.jpeg", b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        vault.write_binary("top.bin", b"x").await.unwrap();
        assert_eq!(vault.file("top.bin").unwrap(), b"x");
    }

    #[tokio::test]
    async fn memory_injected_failure() {
        let vault = MemoryVault::new().with_folder("d").fail_on("d/n.md");
        assert!(vault.create_text_file("d/n.md", "hi").await.is_err());
        vault.create_text_file("d/m.md", "hi").await.unwrap();
        assert_eq!(vault.text("d/m.md").as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn fs_vault_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        assert!(!vault.exists("Notes/report").await);
        vault.create_folder("Notes/report").await.unwrap();
        assert!(vault.exists("Notes/report").await);
        vault.write_binary("Notes/report/img-0.jpeg", &[1, 2, 3]).await.unwrap();
        vault.create_text_file("Notes/report/report.md", "body").await.unwrap();
        vault.create_text_file("Notes/report/report.md", "body v2").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Notes/report/report.md")).unwrap(),
            "body v2"
        );
        assert_eq!(std::fs::read(dir.path().join("Notes/report/img-0.jpeg")).unwrap(), [1, 2, 3]);
    }

    #[tokio::test]
    async fn fs_vault_refuses_escape() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        let err = vault.create_folder("../outside").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(vault.create_text_file("/etc/x.md", "no").await.is_err());
    }
}
