//! Format-Convert stage: apply the target PDF profile after rendering.
//!
//! Runs once on a merged PDF, or once per rendered PDF with the same
//! bounded, index-preserving fan-out as the render stage.

use super::fan_out;
use crate::adapters::PdfEngine;
use crate::artifact::{Artifact, ArtifactRole};
use crate::config::PdfFormat;
use crate::error::{AdapterError, ConvertError};
use crate::staging::Staging;
use std::path::Path;
use tracing::info;

pub async fn reformat_all(
    engine: &dyn PdfEngine,
    format: PdfFormat,
    active: &[Artifact],
    concurrency: usize,
    staging: &Staging,
) -> Result<Vec<Artifact>, ConvertError> {
    info!("Converting {} PDF(s) to {}", active.len(), format);
    fan_out(
        active,
        concurrency,
        ArtifactRole::Reformatted,
        move |artifact| {
            let output = staging.generate_path("pdf");
            async move {
                engine
                    .convert(format, &artifact.path, &output)
                    .await
                    .map_err(|e| classify_format_error(&artifact.path, e))?;
                Ok(output)
            }
        },
    )
    .await
}

pub fn classify_format_error(input: &Path, err: AdapterError) -> ConvertError {
    match err {
        AdapterError::FormatNotAvailable(format) => ConvertError::UnsupportedFormat {
            format,
            field: "pdfFormat",
        },
        source => ConvertError::FormatConversionFailed {
            input: input.to_path_buf(),
            source,
        },
    }
}
