//! Request-scoped spooling of uploaded payloads.
//!
//! The NetCDF library reads from file paths, so uploaded payload bytes are
//! written to a spool directory for the duration of a request. The file is
//! removed when the spool handle drops, so deletion happens on every exit
//! path including errors.

use crate::error::EvaluationError;

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// An uploaded payload spooled to disk under a unique name.
#[derive(Debug)]
pub struct SpooledPayload {
    path: PathBuf,
}

impl SpooledPayload {
    /// Write `bytes` into `dir` under a fresh UUID name.
    pub fn write(dir: &Path, bytes: &[u8]) -> Result<Self, EvaluationError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.nc", Uuid::new_v4()));
        std::fs::write(&path, bytes)?;
        Ok(SpooledPayload { path })
    }

    /// Path of the spooled file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpooledPayload {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!("failed to remove spooled payload {:?}: {}", self.path, err);
        }
    }
}
