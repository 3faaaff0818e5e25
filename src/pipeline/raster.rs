//! Rasterize stage: the single active PDF → page images + slide metadata.
//!
//! Images go into a fresh directory of their own. They are listed (regular
//! files only, sorted by name) before the metadata extractor runs, and the
//! metadata artifact is always last.

use crate::adapters::Adapters;
use crate::artifact::{Artifact, ArtifactRole};
use crate::config::OptionSet;
use crate::error::{AdapterError, ConvertError};
use crate::metadata::METADATA_FILE_NAME;
use crate::staging::Staging;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub async fn rasterize(
    adapters: &Adapters,
    options: &OptionSet,
    active: &[Artifact],
    staging: &Staging,
) -> Result<Vec<Artifact>, ConvertError> {
    let [pdf] = active else {
        return Err(ConvertError::AmbiguousRasterTarget {
            inputs: active.len(),
        });
    };
    let document = options.inputs().first().ok_or(ConvertError::NoInputs)?;

    let out_dir = staging.scoped_dir().await?;
    info!(
        "Rasterizing '{}' into '{}'",
        pdf.path.display(),
        out_dir.display()
    );
    adapters
        .rasterizer
        .rasterize(&pdf.path, options.raster(), &out_dir)
        .await
        .map_err(ConvertError::RasterizationFailed)?;

    let images = list_images(&out_dir)
        .await
        .map_err(|e| ConvertError::RasterizationFailed(AdapterError::Io(e)))?;
    debug!("Rasterizer produced {} image(s)", images.len());

    let metadata = adapters
        .metadata
        .extract(document, &out_dir)
        .await
        .map_err(ConvertError::MetadataExtractionFailed)?;

    let mut artifacts: Vec<Artifact> = images
        .into_iter()
        .map(|p| Artifact::new(p, ArtifactRole::RasterImage))
        .collect();
    artifacts.push(Artifact::new(metadata, ArtifactRole::Metadata));
    Ok(artifacts)
}

/// Regular files directly inside `dir`, sorted by name.
async fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() && entry.file_name() != METADATA_FILE_NAME {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
