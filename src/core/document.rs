//! Raw documents and the sources they are read from
//!
//! Structure validation only needs the first few hundred bytes of a document,
//! so sources expose a cheap prefix read next to the full read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::core::error_handling::IngestError;

/// An uploaded contact list, held only for the duration of one ingestion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    name: Option<String>,
    bytes: Bytes,
}

impl RawDocument {
    pub fn new(name: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name,
            bytes: bytes.into(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(None, Bytes::from(text.into()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
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

    /// First `limit` bytes, without copying
    pub fn prefix(&self, limit: usize) -> Bytes {
        self.bytes.slice(..limit.min(self.bytes.len()))
    }
}

/// Anything a contact list can be read from
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Name used in logs and for the re-encoded file name
    fn name(&self) -> &str;

    /// Whether the source is a file whose extension must be checked
    fn is_file(&self) -> bool {
        false
    }

    /// Read at most `limit` bytes from the start of the document
    async fn read_prefix(&self, limit: usize) -> Result<Bytes, IngestError>;

    /// Read the whole document
    async fn read_all(&self) -> Result<RawDocument, IngestError>;
}

#[async_trait]
impl DocumentSource for RawDocument {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<memory>")
    }

    async fn read_prefix(&self, limit: usize) -> Result<Bytes, IngestError> {
        Ok(self.prefix(limit))
    }

    async fn read_all(&self) -> Result<RawDocument, IngestError> {
        Ok(self.clone())
    }
}

/// A contact list on the local file system
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    display_name: String,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, display_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn is_file(&self) -> bool {
        true
    }

    async fn read_prefix(&self, limit: usize) -> Result<Bytes, IngestError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| IngestError::io(self.path.display().to_string(), e))?;

        let mut buffer = Vec::with_capacity(limit);
        file.take(limit as u64)
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| IngestError::io(self.path.display().to_string(), e))?;
        Ok(Bytes::from(buffer))
    }

    async fn read_all(&self) -> Result<RawDocument, IngestError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| IngestError::io(self.path.display().to_string(), e))?;
        Ok(RawDocument::new(Some(self.display_name.clone()), bytes))
    }
}
