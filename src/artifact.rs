//! Output types: artifacts produced by the pipeline and run statistics.

use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The part a file plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactRole {
    /// One PDF per input, straight from the renderer.
    Rendered,
    /// All rendered PDFs combined into one.
    Merged,
    /// A PDF converted to the target profile after rendering/merging.
    Reformatted,
    /// A page image produced by the rasteriser.
    RasterImage,
    /// The structured slide description written next to the images.
    Metadata,
}

/// A produced file plus its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub role: ArtifactRole,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, role: ArtifactRole) -> Self {
        Self {
            path: path.into(),
            role,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the artifact is a PDF document (as opposed to an image or
    /// metadata file).
    pub fn is_pdf(&self) -> bool {
        matches!(
            self.role,
            ArtifactRole::Rendered | ArtifactRole::Merged | ArtifactRole::Reformatted
        )
    }
}

/// Counters and timings for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Stages that were entered, in order (always starts with `Render`).
    pub stages: Vec<Stage>,
    /// Number of renderer invocations.
    pub render_calls: usize,
    /// Number of merge invocations (0 or 1).
    pub merge_calls: usize,
    /// Number of post-hoc format conversions.
    pub format_calls: usize,
    /// Number of rasteriser invocations (0 or 1).
    pub raster_calls: usize,
    /// Number of metadata-extractor invocations (0 or 1).
    pub metadata_calls: usize,
    pub render_duration_ms: u64,
    pub merge_duration_ms: u64,
    pub format_duration_ms: u64,
    pub raster_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The complete, ordered output of a successful run.
///
/// A run either yields this in full or returns an error; there is no
/// partially populated output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub artifacts: Vec<Artifact>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Artifact paths in output order.
    pub fn paths(&self) -> Vec<&Path> {
        self.artifacts.iter().map(Artifact::path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_roles() {
        assert!(Artifact::new("a.pdf", ArtifactRole::Rendered).is_pdf());
        assert!(Artifact::new("a.pdf", ArtifactRole::Merged).is_pdf());
        assert!(Artifact::new("a.pdf", ArtifactRole::Reformatted).is_pdf());
        assert!(!Artifact::new("slide.jpg", ArtifactRole::RasterImage).is_pdf());
        assert!(!Artifact::new("data.json", ArtifactRole::Metadata).is_pdf());
    }

    #[test]
    fn output_serialises_roles_in_camel_case() {
        let output = ConversionOutput {
            artifacts: vec![Artifact::new("/tmp/x/slide-0.jpg", ArtifactRole::RasterImage)],
            stats: ConversionStats::default(),
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"rasterImage\""), "got: {json}");
        assert_eq!(output.paths(), vec![Path::new("/tmp/x/slide-0.jpg")]);
    }
}
