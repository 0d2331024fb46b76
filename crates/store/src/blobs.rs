//! Uploaded files and their text.

use std::path::{Path, PathBuf};

use serde::Serialize;

use sb_domain::error::{Error, Result};

/// A stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBlob {
    pub file_id: String,
    pub filename: String,
    pub size: usize,
}

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<StoredBlob>;
    async fn delete(&self, blob_id: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait TextExtractor: Send + Sync {
    /// Text content of a stored blob. Missing blobs fail with `NotFound`,
    /// unreadable ones with `Extraction`.
    async fn extract_text(&self, blob_id: &str) -> Result<String>;
}

/// Extensions read as UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "json", "csv", "log"];

/// One file per blob under a directory. Blob ids are `<uuid>.<ext>`, so the
/// extension of the original filename survives for extraction.
pub struct TempDirBlobStore {
    dir: PathBuf,
}

impl TempDirBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a blob id to its path. Ids that could escape the directory are
    /// treated as unknown.
    fn path_for(&self, blob_id: &str) -> Result<PathBuf> {
        let valid = !blob_id.is_empty()
            && !blob_id.starts_with('.')
            && blob_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        if !valid {
            return Err(Error::NotFound(format!("attachment {blob_id}")));
        }
        Ok(self.dir.join(blob_id))
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
}

#[async_trait::async_trait]
impl BlobStore for TempDirBlobStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<StoredBlob> {
        let id = uuid::Uuid::new_v4().to_string();
        let file_id = match extension_of(filename) {
            Some(ext) => format!("{id}.{ext}"),
            None => id,
        };
        tokio::fs::write(self.dir.join(&file_id), bytes).await?;
        tracing::debug!(file_id = %file_id, filename, size = bytes.len(), "blob stored");
        Ok(StoredBlob {
            file_id,
            filename: filename.to_string(),
            size: bytes.len(),
        })
    }

    async fn delete(&self, blob_id: &str) -> Result<()> {
        let path = self.path_for(blob_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("attachment {blob_id}")))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[async_trait::async_trait]
impl TextExtractor for TempDirBlobStore {
    async fn extract_text(&self, blob_id: &str) -> Result<String> {
        let path = self.path_for(blob_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("attachment {blob_id}")))
            }
            Err(e) => return Err(Error::Io(e)),
        };

        match extension_of(blob_id) {
            Some(ext) if TEXT_EXTENSIONS.contains(&ext.as_str()) => String::from_utf8(bytes)
                .map_err(|_| Error::Extraction(format!("{blob_id} is not valid UTF-8"))),
            Some(ext) => Err(Error::Extraction(format!("unsupported file type: .{ext}"))),
            None => Err(Error::Extraction("file has no extension".into())),
        }
    }
}
