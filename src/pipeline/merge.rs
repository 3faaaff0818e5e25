//! Merge stage: N rendered PDFs → one, in input order.

use crate::adapters::PdfEngine;
use crate::artifact::{Artifact, ArtifactRole};
use crate::error::ConvertError;
use crate::staging::Staging;
use std::path::PathBuf;
use tracing::info;

pub async fn merge_all(
    engine: &dyn PdfEngine,
    active: &[Artifact],
    staging: &Staging,
) -> Result<Artifact, ConvertError> {
    let inputs: Vec<PathBuf> = active.iter().map(|a| a.path.clone()).collect();
    let output = staging.generate_path("pdf");
    info!("Merging {} PDFs into '{}'", inputs.len(), output.display());
    engine
        .merge(&inputs, &output)
        .await
        .map_err(ConvertError::MergeFailed)?;
    Ok(Artifact::new(output, ArtifactRole::Merged))
}
