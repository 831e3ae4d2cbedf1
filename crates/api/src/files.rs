//! Document file storage on the local filesystem.
//!
//! Stored files live under a single configured root, named
//! `doc_{document_id}_{uuid}.{ext}` so concurrent uploads of the same
//! original name never collide. The store returns the metadata the
//! version bookkeeping needs; it knows nothing about workflow state.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use docflow_core::types::DbId;

/// Metadata for a file persisted by [`FileStore::save`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// The client's original file name (kept for downloads).
    pub file_name: String,
    /// Size of the stored bytes.
    pub file_size_bytes: i64,
    /// Absolute or root-relative path of the stored file.
    pub file_path: String,
}

/// Filesystem-backed store for document version files.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist an uploaded file, returning its stored metadata.
    ///
    /// Creates the storage root on first use. I/O failures propagate to
    /// the caller: a version must not be recorded if its bytes were not
    /// written.
    pub async fn save(
        &self,
        document_id: DbId,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, std::io::Error> {
        tokio::fs::create_dir_all(&self.root).await?;

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let stored_name = format!("doc_{document_id}_{}.{ext}", Uuid::new_v4());
        let path = self.root.join(&stored_name);

        tokio::fs::write(&path, data).await?;

        Ok(StoredFile {
            file_name: original_name.to_string(),
            file_size_bytes: data.len() as i64,
            file_path: path.to_string_lossy().to_string(),
        })
    }

    /// Read a stored file back for download.
    pub async fn read(&self, file_path: &str) -> Result<Vec<u8>, std::io::Error> {
        tokio::fs::read(file_path).await
    }

    /// Best-effort removal of a stored file. Missing files are fine.
    pub async fn remove(&self, file_path: &str) {
        if let Err(e) = tokio::fs::remove_file(file_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(file_path, error = %e, "Failed to remove stored file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store
            .save(7, "report.pdf", b"%PDF-1.7 fake")
            .await
            .expect("save should succeed");

        assert_eq!(stored.file_name, "report.pdf");
        assert_eq!(stored.file_size_bytes, 13);
        assert!(stored.file_path.ends_with(".pdf"));

        let bytes = store.read(&stored.file_path).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7 fake");
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let a = store.save(1, "draft.docx", b"one").await.unwrap();
        let b = store.save(1, "draft.docx", b"two").await.unwrap();

        assert_ne!(a.file_path, b.file_path);
        assert_eq!(store.read(&a.file_path).await.unwrap(), b"one");
        assert_eq!(store.read(&b.file_path).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_missing_extension_falls_back_to_bin() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store.save(1, "README", b"hello").await.unwrap();
        assert!(stored.file_path.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let stored = store.save(1, "a.txt", b"x").await.unwrap();
        store.remove(&stored.file_path).await;
        // Second removal of a now-missing file must not panic.
        store.remove(&stored.file_path).await;

        assert!(store.read(&stored.file_path).await.is_err());
    }
}
