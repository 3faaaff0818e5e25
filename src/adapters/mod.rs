//! Collaborator boundaries: the external capabilities the orchestrator drives.
//!
//! Each capability is a small async trait so the orchestrator can be tested
//! against mocks and so deployments can swap one tool for another without
//! touching the stage logic:
//!
//! | Trait | Default implementation | Tool |
//! |-------|------------------------|------|
//! | [`DocumentRenderer`]  | [`LibreOfficeRenderer`] | `soffice --headless --convert-to pdf` |
//! | [`PdfEngine`]         | [`CommandPdfEngine`]    | `qpdf` (merge), `gs` (PDF/A) |
//! | [`Rasterizer`]        | [`ImageMagickRasterizer`] | `convert -density … -resize …` |
//! | [`MetadataExtractor`] | [`crate::metadata::SlideDataWriter`] | native `.pptx` reader |
//!
//! All implementations report failures as [`AdapterError`]; the
//! orchestrator decides which of those are the client's fault.
//!
//! ## Mocking & Testing
//! The traits are annotated for `mockall`; `Mock*` types are generated under
//! `cfg(test)` and exported with the `test-export-mocks` feature.

pub mod command;
pub mod imagemagick;
pub mod libreoffice;
pub mod pdf_engine;

pub use imagemagick::ImageMagickRasterizer;
pub use libreoffice::LibreOfficeRenderer;
pub use pdf_engine::CommandPdfEngine;

use crate::config::{EngineConfig, PdfFormat, RasterOptions, RenderOptions};
use crate::error::AdapterError;
use crate::metadata::SlideDataWriter;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Converts one office document to one PDF.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// File extensions (with leading dot) this renderer accepts.
    fn extensions(&self) -> Vec<&'static str>;

    /// Render `input` into a PDF written at `output`.
    ///
    /// Must report an unparseable page-range expression as
    /// [`AdapterError::MalformedPageRanges`] and an unsupported
    /// `options.format` as [`AdapterError::FormatNotAvailable`].
    async fn render(
        &self,
        input: &Path,
        output: &Path,
        options: &RenderOptions,
    ) -> Result<(), AdapterError>;
}

/// Merges PDFs and converts a PDF to a target profile.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Concatenate `inputs`, in order, into `output`.
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), AdapterError>;

    /// Convert `input` to `format`, writing `output`.
    ///
    /// Must report a profile it cannot produce as
    /// [`AdapterError::FormatNotAvailable`].
    async fn convert(
        &self,
        format: PdfFormat,
        input: &Path,
        output: &Path,
    ) -> Result<(), AdapterError>;
}

/// Renders the pages of a PDF to image files.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Write one image per page of `pdf` into `out_dir`.
    async fn rasterize(
        &self,
        pdf: &Path,
        options: &RasterOptions,
        out_dir: &Path,
    ) -> Result<(), AdapterError>;
}

/// Describes the slides behind a set of rasterised images.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Read the original `document` and the images in `out_dir`, write a
    /// metadata file into `out_dir` and return its path.
    async fn extract(&self, document: &Path, out_dir: &Path) -> Result<PathBuf, AdapterError>;
}

/// The full set of collaborators one pipeline needs.
#[derive(Clone)]
pub struct Adapters {
    pub renderer: Arc<dyn DocumentRenderer>,
    pub engine: Arc<dyn PdfEngine>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub metadata: Arc<dyn MetadataExtractor>,
}

impl Adapters {
    /// Command-line tool adapters configured from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            renderer: Arc::new(LibreOfficeRenderer::new(config)),
            engine: Arc::new(CommandPdfEngine::new(config)),
            rasterizer: Arc::new(ImageMagickRasterizer::new(config)),
            metadata: Arc::new(SlideDataWriter::new()),
        }
    }
}

impl fmt::Debug for Adapters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapters")
            .field("renderer", &"<dyn DocumentRenderer>")
            .field("engine", &"<dyn PdfEngine>")
            .field("rasterizer", &"<dyn Rasterizer>")
            .field("metadata", &"<dyn MetadataExtractor>")
            .finish()
    }
}
