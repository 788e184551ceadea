//! Blob storage adapters.
//!
//! - [`FsBlobStore`]: files under a root directory.  On the device this
//!   is a mounted VFS partition (SPIFFS/LittleFS); on the host, any
//!   directory.
//! - [`MemBlobStore`]: in-memory map for simulation and tests.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use log::{debug, warn};

use crate::app::ports::BlobStore;
use crate::error::ConfigError;

// ───────────────────────────────────────────────────────────────
// Filesystem
// ───────────────────────────────────────────────────────────────

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Blobs are resolved relative to `root`; absolute paths are used as is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl BlobStore for FsBlobStore {
    fn load(&self, path: &str) -> Result<Vec<u8>, ConfigError> {
        let full = self.resolve(path);
        match fs::read(&full) {
            Ok(data) => {
                debug!("FsBlobStore: read {} bytes from {}", data.len(), full.display());
                Ok(data)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(e) => {
                warn!("FsBlobStore: {}: {e}", full.display());
                Err(ConfigError::Unreadable)
            }
        }
    }

    fn save(&mut self, path: &str, data: &[u8]) -> Result<(), ConfigError> {
        let full = self.resolve(path);
        let mut file = fs::File::create(&full).map_err(|e| {
            warn!("FsBlobStore: create {}: {e}", full.display());
            ConfigError::PartialWrite
        })?;
        write_blob(&mut file, data).map_err(|e| {
            warn!("FsBlobStore: write {}: {e}", full.display());
            ConfigError::PartialWrite
        })
    }
}

/// Writes all of `data`, retrying short writes, then flushes.
fn write_blob<W: Write>(w: &mut W, data: &[u8]) -> std::io::Result<()> {
    w.write_all(data)?;
    w.flush()
}

// ───────────────────────────────────────────────────────────────
// In-memory
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemBlobStore {
    blobs: HashMap<String, Vec<u8>>,
    saves: usize,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a blob.
    #[must_use]
    pub fn with(mut self, path: &str, data: &[u8]) -> Self {
        self.blobs.insert(path.to_owned(), data.to_vec());
        self
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.blobs.get(path).map(Vec::as_slice)
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl BlobStore for MemBlobStore {
    fn load(&self, path: &str) -> Result<Vec<u8>, ConfigError> {
        self.blobs.get(path).cloned().ok_or(ConfigError::NotFound)
    }

    fn save(&mut self, path: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.blobs.insert(path.to_owned(), data.to_vec());
        self.saves += 1;
        Ok(())
    }
}
