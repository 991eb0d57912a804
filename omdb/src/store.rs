//! On-disk film storage
//!
//! Each film resource is one indented JSON file inside the provider's local
//! directory, named by the resource id.

use std::io::ErrorKind;
use std::path::PathBuf;

use rand::RngCore;
use thiserror::Error;

use crate::models::FilmFile;

/// Bytes of randomness in a generated id (hex-encoded to twice as many chars)
pub const ID_BYTES: usize = 8;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot use film with unknown ID")]
    EmptyId,

    #[error("invalid film ID: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct FilmStore {
    dir: PathBuf,
}

impl FilmStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the storage directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder.create(&self.dir).await?;
        Ok(())
    }

    pub fn generate_id() -> String {
        let mut bytes = [0u8; ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty() {
            return Err(StoreError::EmptyId);
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(id))
    }

    /// Write a new film under a fresh id and return that id
    pub async fn create(&self, film: &FilmFile) -> Result<String, StoreError> {
        let id = Self::generate_id();
        self.write(&id, film).await?;
        Ok(id)
    }

    /// Create or overwrite the file for `id`
    pub async fn write(&self, id: &str, film: &FilmFile) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let data = serde_json::to_vec_pretty(film)?;
        tokio::fs::write(&path, data).await?;
        tracing::debug!("Wrote film file {}", path.display());
        Ok(())
    }

    /// `Ok(None)` when no file exists for `id`
    pub async fn read(&self, id: &str) -> Result<Option<FilmFile>, StoreError> {
        let path = self.path_for(id)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Film file {} does not exist", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        tokio::fs::remove_file(&path).await?;
        tracing::debug!("Removed film file {}", path.display());
        Ok(())
    }
}
