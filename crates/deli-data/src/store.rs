//! File-backed save store.
//!
//! `.json` files hold the document as pretty JSON; `.bin` files hold the
//! versioned bitcode envelope from `deli_core::persistence`. Writes go to a
//! sibling temp file first and are renamed into place.

use deli_core::persistence::{decode_document, encode_document, SaveDocument, SaveStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Json,
    Binary,
}

impl SaveFormat {
    /// `.bin` is binary, anything else is JSON.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") => SaveFormat::Binary,
            _ => SaveFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: SaveFormat,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SaveFormat::for_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    fn encode(&self, doc: &SaveDocument) -> Result<Vec<u8>, StoreError> {
        match self.format {
            SaveFormat::Json => serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Encode(e.to_string())),
            SaveFormat::Binary => encode_document(doc),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<SaveDocument, StoreError> {
        match self.format {
            SaveFormat::Json => serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string())),
            SaveFormat::Binary => decode_document(bytes),
        }
    }
}

impl SaveStore for FileStore {
    fn load(&mut self) -> Result<Option<SaveDocument>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => self.decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, doc: &SaveDocument) -> Result<(), StoreError> {
        let bytes = self.encode(doc)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
