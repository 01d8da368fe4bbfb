//! Durable storage for the anonymous cart.
//!
//! One JSON file holding the serialized line array. Written after every
//! mutation, read once at startup. Corrupt content is discarded, never
//! surfaced as an error.

use std::path::PathBuf;

use shopfront_core::cart::CartLine;
use shopfront_core::ShopfrontResult;
use tracing::{debug, warn};

/// Handle to the durable cart file.
#[derive(Debug, Clone)]
pub struct CartFile {
    path: PathBuf,
}

impl CartFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted line array.
    ///
    /// A missing file is an empty cart. An unparseable file is discarded and
    /// also treated as empty.
    pub fn load(&self) -> Vec<CartLine> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str::<Vec<CartLine>>(&content) {
            Ok(lines) => {
                debug!(path = %self.path.display(), count = lines.len(), "Loaded persisted cart");
                lines
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt cart file");
                Vec::new()
            }
        }
    }

    /// Persist the line array.
    ///
    /// Writes to a sibling temp file and renames, so a crash mid-write cannot
    /// leave a truncated cart behind.
    pub fn save(&self, lines: &[CartLine]) -> ShopfrontResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(lines)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Remove the persisted cart. Missing file is fine.
    pub fn delete(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to delete cart file");
            }
        }
    }
}
