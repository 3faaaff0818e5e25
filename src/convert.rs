//! Top-level conversion entry points.
//!
//! [`Pipeline::run`] leaves its artifacts inside a caller-owned [`Staging`]
//! area. The functions here wrap that for the common cases: validate a raw
//! request form, run with a deadline, and copy the final artifacts somewhere
//! that outlives the staging area.

use crate::artifact::{Artifact, ArtifactRole, ConversionOutput};
use crate::config::OptionSet;
use crate::error::ConvertError;
use crate::form::ConvertForm;
use crate::pipeline::Pipeline;
use crate::staging::Staging;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Validate `form` against the pipeline's renderer and build the options.
pub fn options_from_form(
    pipeline: &Pipeline,
    form: ConvertForm,
    inputs: Vec<PathBuf>,
) -> Result<OptionSet, ConvertError> {
    let extensions = pipeline.adapters().renderer.extensions();
    form.into_options(inputs, &extensions)
}

/// Run `options` inside `staging`.
///
/// Artifact paths point into `staging` and are removed with it.
pub async fn convert(
    pipeline: &Pipeline,
    options: &OptionSet,
    staging: &Staging,
) -> Result<ConversionOutput, ConvertError> {
    pipeline.run(options, staging).await
}

/// Run `options` in a private staging area and copy the final artifacts into
/// `dest` (created if missing).
///
/// The returned output lists the copied files, in artifact order. PDFs are
/// named after their input (`report.docx` → `report.pdf`); images and the
/// metadata file keep the names the tools gave them. On error nothing is
/// copied.
pub async fn convert_to_dir(
    pipeline: &Pipeline,
    options: &OptionSet,
    dest: impl AsRef<Path>,
) -> Result<ConversionOutput, ConvertError> {
    let dest = dest.as_ref();
    let staging = Staging::new()?;
    let output = pipeline.run(options, &staging).await?;

    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

    let names = output_names(&output.artifacts, options.inputs());
    let artifacts = copy_artifacts(&output.artifacts, names, dest).await?;
    info!("Wrote {} file(s) to '{}'", artifacts.len(), dest.display());

    Ok(ConversionOutput {
        artifacts,
        stats: output.stats,
    })
}

/// [`convert_to_dir`] with a deadline for the whole run.
///
/// When the deadline passes, the run is dropped: in-flight tool processes are
/// killed and the staging area is removed.
pub async fn convert_with_timeout(
    pipeline: &Pipeline,
    options: &OptionSet,
    dest: impl AsRef<Path>,
    timeout: Duration,
) -> Result<ConversionOutput, ConvertError> {
    tokio::time::timeout(timeout, convert_to_dir(pipeline, options, dest))
        .await
        .map_err(|_| ConvertError::Timeout {
            secs: timeout.as_secs(),
        })?
}

/// Synchronous wrapper around [`convert_to_dir`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    pipeline: &Pipeline,
    options: &OptionSet,
    dest: impl AsRef<Path>,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_to_dir(pipeline, options, dest))
}

/// Copy `artifacts` into `dest` under `names`. On failure the files already
/// copied are removed again, so `dest` never holds a partial result.
async fn copy_artifacts(
    artifacts: &[Artifact],
    names: Vec<String>,
    dest: &Path,
) -> Result<Vec<Artifact>, ConvertError> {
    let mut copied = Vec::with_capacity(artifacts.len());
    for (artifact, name) in artifacts.iter().zip(names) {
        let target = dest.join(name);
        debug!("Copying '{}' → '{}'", artifact.path.display(), target.display());
        if let Err(e) = tokio::fs::copy(&artifact.path, &target).await {
            for done in copied.iter().map(Artifact::path).chain([target.as_path()]) {
                if let Err(cleanup) = tokio::fs::remove_file(done).await {
                    debug!("Could not remove '{}': {cleanup}", done.display());
                }
            }
            return Err(ConvertError::OutputWriteFailed {
                path: target,
                source: e,
            });
        }
        copied.push(Artifact::new(target, artifact.role));
    }
    Ok(copied)
}

/// Destination file names for `artifacts`, unique within the set.
fn output_names(artifacts: &[Artifact], inputs: &[PathBuf]) -> Vec<String> {
    let pdf_count = artifacts.iter().filter(|a| a.is_pdf()).count();
    let mut used = HashSet::new();
    artifacts
        .iter()
        .enumerate()
        .map(|(idx, artifact)| {
            let base = match artifact.role {
                ArtifactRole::Rendered | ArtifactRole::Reformatted if pdf_count == inputs.len() => {
                    pdf_name(inputs.get(idx))
                }
                ArtifactRole::Merged | ArtifactRole::Reformatted => pdf_name(inputs.first()),
                _ => artifact
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("artifact-{idx}")),
            };
            let mut name = base.clone();
            let mut n = 1;
            while !used.insert(name.clone()) {
                name = format!("{n}-{base}");
                n += 1;
            }
            name
        })
        .collect()
}

fn pdf_name(input: Option<&PathBuf>) -> String {
    let stem = input
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn per_input_pdfs_take_input_stems() {
        let artifacts = vec![
            Artifact::new("/s/1b2c.pdf", ArtifactRole::Rendered),
            Artifact::new("/s/9f8e.pdf", ArtifactRole::Rendered),
        ];
        let names = output_names(&artifacts, &paths(&["in/report.docx", "in/budget.xlsx"]));
        assert_eq!(names, vec!["report.pdf", "budget.pdf"]);
    }

    #[tokio::test]
    async fn failed_copy_leaves_destination_empty() {
        let staging = tempfile::tempdir().unwrap();
        let present = staging.path().join("a.pdf");
        std::fs::write(&present, b"%PDF").unwrap();
        let artifacts = vec![
            Artifact::new(&present, ArtifactRole::Rendered),
            Artifact::new(staging.path().join("gone.pdf"), ArtifactRole::Rendered),
        ];
        let dest = tempfile::tempdir().unwrap();

        let err = copy_artifacts(&artifacts, vec!["a.pdf".into(), "b.pdf".into()], dest.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::OutputWriteFailed { ref path, .. } if path.ends_with("b.pdf")));
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn copies_keep_artifact_roles() {
        let staging = tempfile::tempdir().unwrap();
        let image = staging.path().join("slide-0.jpg");
        std::fs::write(&image, b"jpg").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let copied = copy_artifacts(
            &[Artifact::new(&image, ArtifactRole::RasterImage)],
            vec!["slide-0.jpg".into()],
            dest.path(),
        )
        .await
        .unwrap();
        assert_eq!(copied, vec![Artifact::new(dest.path().join("slide-0.jpg"), ArtifactRole::RasterImage)]);
        assert!(dest.path().join("slide-0.jpg").is_file());
    }

    #[test]
    fn merged_pdf_is_named_after_first_input() {
        let artifacts = vec![Artifact::new("/s/1b2c.pdf", ArtifactRole::Merged)];
        let names = output_names(&artifacts, &paths(&["a.docx", "b.docx"]));
        assert_eq!(names, vec!["a.pdf"]);
    }

    #[test]
    fn duplicate_stems_are_disambiguated() {
        let artifacts = vec![
            Artifact::new("/s/1.pdf", ArtifactRole::Reformatted),
            Artifact::new("/s/2.pdf", ArtifactRole::Reformatted),
        ];
        let names = output_names(&artifacts, &paths(&["x/deck.pptx", "y/deck.pptx"]));
        assert_eq!(names, vec!["deck.pdf", "1-deck.pdf"]);
    }

    #[test]
    fn images_and_metadata_keep_their_names() {
        let artifacts = vec![
            Artifact::new("/s/d/slide-0.jpg", ArtifactRole::RasterImage),
            Artifact::new("/s/d/slide-1.jpg", ArtifactRole::RasterImage),
            Artifact::new("/s/d/data.json", ArtifactRole::Metadata),
        ];
        let names = output_names(&artifacts, &paths(&["deck.pptx"]));
        assert_eq!(names, vec!["slide-0.jpg", "slide-1.jpg", "data.json"]);
    }
}
