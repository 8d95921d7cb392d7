//! Fitted model blobs, one per experiment.
//!
//! Models are bincode-encoded and written through an [`ArtifactStore`], so
//! a failed save never leaves a truncated blob behind.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::artifacts::{write_bytes, ArtifactStore};

#[derive(Debug, Clone)]
pub struct ModelStore {
    files: ArtifactStore,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: ArtifactStore::new(dir, ""),
        }
    }

    pub fn save<T: Serialize>(&self, name: &str, model: &T) -> Result<()> {
        let bytes = bincode::serialize(model)
            .with_context(|| format!("Failed to serialize model {name}"))?;
        self.files.write(name, |w| write_bytes(w, &bytes))?;
        debug!(model = name, bytes = bytes.len(), "saved model");
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let Some(reader) = self.files.open(name)? else {
            return Ok(None);
        };
        let model = bincode::deserialize_from(reader)
            .with_context(|| format!("Failed to deserialize model {name}"))?;
        Ok(Some(model))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.files.exists(name)
    }
}
