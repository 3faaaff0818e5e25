//! Per-request staging area for intermediate and final files.
//!
//! Every stage writes to a fresh UUID-named path, so a failed stage can never
//! leave behind a file that a later stage of the same request would mistake
//! for its own input. The whole area is removed when the [`Staging`] value is
//! dropped, on success and on failure alike.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

/// A private directory owned by exactly one request.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    /// Create a staging area under the system temp directory.
    pub fn new() -> Result<Self, ConvertError> {
        let dir = tempfile::Builder::new()
            .prefix("officepdf-")
            .tempdir()
            .map_err(|e| ConvertError::Staging {
                path: std::env::temp_dir(),
                source: e,
            })?;
        debug!("Created staging area {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a staging area under `parent`.
    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let parent = parent.as_ref();
        let dir = tempfile::Builder::new()
            .prefix("officepdf-")
            .tempdir_in(parent)
            .map_err(|e| ConvertError::Staging {
                path: parent.to_path_buf(),
                source: e,
            })?;
        Ok(Self { dir })
    }

    /// Root of the staging area.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A new, unique file path with the given extension (e.g. `".pdf"`).
    ///
    /// The file itself is not created.
    pub fn generate_path(&self, extension: &str) -> PathBuf {
        let ext = extension.trim_start_matches('.');
        self.dir.path().join(format!("{}.{}", Uuid::new_v4(), ext))
    }

    /// Create a new, empty, uniquely-named directory inside the area.
    pub async fn scoped_dir(&self) -> Result<PathBuf, ConvertError> {
        let path = self.dir.path().join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ConvertError::Staging {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }
}
