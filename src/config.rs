//! Configuration types for a document conversion.
//!
//! Two structs control everything:
//!
//! * [`OptionSet`] — the validated, immutable parameters of one request
//!   (inputs, orientation, page ranges, target PDF format, merge, images).
//!   Built via [`OptionSetBuilder`], whose [`build`](OptionSetBuilder::build)
//!   enforces every cross-field invariant so the orchestrator never has to.
//! * [`EngineConfig`] — where the external tools live and how long a single
//!   invocation may run. Shared by every request a process serves.
//!
//! Request fields with several historical spellings are collapsed into one
//! canonical `target_format` by [`crate::form`] before they reach the builder.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default rasterisation density (DPI) handed to the rasteriser.
pub const DEFAULT_RASTER_DENSITY: &str = "288";
/// Default JPEG quality handed to the rasteriser.
pub const DEFAULT_RASTER_QUALITY: &str = "85";
/// Default resize applied after rendering at high density.
pub const DEFAULT_RASTER_RESIZE: &str = "50%";

/// The validated parameter bundle driving one pipeline execution.
///
/// Built via [`OptionSet::builder()`]. All fields are read-only once built.
///
/// # Example
/// ```rust
/// use officepdf::{OptionSet, PdfFormat};
///
/// let options = OptionSet::builder()
///     .input("deck.pptx")
///     .target_format(Some(PdfFormat::PdfA2b))
///     .apply_format_natively(false)
///     .build()
///     .unwrap();
/// assert_eq!(options.inputs().len(), 1);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct OptionSet {
    inputs: Vec<PathBuf>,
    landscape: bool,
    page_ranges: String,
    target_format: Option<PdfFormat>,
    apply_format_natively: bool,
    merge: bool,
    rasterize: bool,
    raster: RasterOptions,
    concurrency: usize,
}

impl OptionSet {
    /// Create a new builder with every field at its default.
    pub fn builder() -> OptionSetBuilder {
        OptionSetBuilder {
            options: OptionSet {
                inputs: Vec::new(),
                landscape: false,
                page_ranges: String::new(),
                target_format: None,
                apply_format_natively: true,
                merge: false,
                rasterize: false,
                raster: RasterOptions::default(),
                concurrency: 1,
            },
        }
    }

    /// Input documents in request order.
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn landscape(&self) -> bool {
        self.landscape
    }

    pub fn page_ranges(&self) -> &str {
        &self.page_ranges
    }

    pub fn target_format(&self) -> Option<PdfFormat> {
        self.target_format
    }

    pub fn apply_format_natively(&self) -> bool {
        self.apply_format_natively
    }

    pub fn merge(&self) -> bool {
        self.merge
    }

    pub fn rasterize(&self) -> bool {
        self.rasterize
    }

    pub fn raster(&self) -> &RasterOptions {
        &self.raster
    }

    /// Upper bound on concurrent per-file adapter calls.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The format the renderer should emit directly, if any.
    pub fn native_format(&self) -> Option<PdfFormat> {
        self.target_format.filter(|_| self.apply_format_natively)
    }

    /// The format applied by a separate conversion stage, if any.
    pub fn post_format(&self) -> Option<PdfFormat> {
        self.target_format.filter(|_| !self.apply_format_natively)
    }

    /// Options handed to the renderer for every input.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            landscape: self.landscape,
            page_ranges: self.page_ranges.clone(),
            format: self.native_format(),
        }
    }
}

/// Builder for [`OptionSet`].
#[derive(Debug)]
pub struct OptionSetBuilder {
    options: OptionSet,
}

impl OptionSetBuilder {
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.inputs.push(path.into());
        self
    }

    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.options.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn landscape(mut self, v: bool) -> Self {
        self.options.landscape = v;
        self
    }

    pub fn page_ranges(mut self, ranges: impl Into<String>) -> Self {
        self.options.page_ranges = ranges.into();
        self
    }

    pub fn target_format(mut self, format: Option<PdfFormat>) -> Self {
        self.options.target_format = format;
        self
    }

    pub fn apply_format_natively(mut self, v: bool) -> Self {
        self.options.apply_format_natively = v;
        self
    }

    pub fn merge(mut self, v: bool) -> Self {
        self.options.merge = v;
        self
    }

    pub fn rasterize(mut self, v: bool) -> Self {
        self.options.rasterize = v;
        self
    }

    pub fn raster_density(mut self, density: impl Into<String>) -> Self {
        self.options.raster.density = density.into();
        self
    }

    pub fn raster_quality(mut self, quality: impl Into<String>) -> Self {
        self.options.raster.quality = quality.into();
        self
    }

    pub fn raster_resize(mut self, resize: impl Into<String>) -> Self {
        self.options.raster.resize = resize.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.options.concurrency = n.max(1);
        self
    }

    /// Build the option set, validating cross-field constraints.
    pub fn build(self) -> Result<OptionSet, ConvertError> {
        let o = &self.options;
        if o.inputs.is_empty() {
            return Err(ConvertError::NoInputs);
        }
        if o.rasterize && o.inputs.len() > 1 {
            return Err(ConvertError::AmbiguousRasterTarget {
                inputs: o.inputs.len(),
            });
        }
        for (field, value) in [
            ("slideImageDensity", &o.raster.density),
            ("slideImageQuality", &o.raster.quality),
            ("slideImageResize", &o.raster.resize),
        ] {
            if value.trim().is_empty() {
                return Err(ConvertError::InvalidOption {
                    field: field.to_string(),
                    reason: "must not be empty".into(),
                });
            }
        }
        Ok(self.options)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// A PDF profile a document can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdfFormat {
    #[serde(rename = "PDF/A-1a")]
    PdfA1a,
    #[serde(rename = "PDF/A-1b")]
    PdfA1b,
    #[serde(rename = "PDF/A-2b")]
    PdfA2b,
    #[serde(rename = "PDF/A-3b")]
    PdfA3b,
    #[serde(rename = "PDF/UA-1")]
    PdfUa1,
}

impl PdfFormat {
    pub const ALL: [PdfFormat; 5] = [
        PdfFormat::PdfA1a,
        PdfFormat::PdfA1b,
        PdfFormat::PdfA2b,
        PdfFormat::PdfA3b,
        PdfFormat::PdfUa1,
    ];

    /// Canonical name, e.g. `PDF/A-2b`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfFormat::PdfA1a => "PDF/A-1a",
            PdfFormat::PdfA1b => "PDF/A-1b",
            PdfFormat::PdfA2b => "PDF/A-2b",
            PdfFormat::PdfA3b => "PDF/A-3b",
            PdfFormat::PdfUa1 => "PDF/UA-1",
        }
    }

    /// Look up a format by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }

    /// PDF/A conformance part, `None` for non-PDF/A profiles.
    pub fn pdfa_part(&self) -> Option<u8> {
        match self {
            PdfFormat::PdfA1a | PdfFormat::PdfA1b => Some(1),
            PdfFormat::PdfA2b => Some(2),
            PdfFormat::PdfA3b => Some(3),
            PdfFormat::PdfUa1 => None,
        }
    }

    /// Whether the profile requires a tagged (accessible) PDF.
    pub fn is_tagged(&self) -> bool {
        matches!(self, PdfFormat::PdfA1a | PdfFormat::PdfUa1)
    }
}

impl fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters forwarded verbatim to the rasteriser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterOptions {
    pub density: String,
    pub quality: String,
    pub resize: String,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            density: DEFAULT_RASTER_DENSITY.to_string(),
            quality: DEFAULT_RASTER_QUALITY.to_string(),
            resize: DEFAULT_RASTER_RESIZE.to_string(),
        }
    }
}

/// Per-document options handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Landscape page orientation. The LibreOffice renderer has no command-line
    /// filter option for this and ignores it with a warning.
    pub landscape: bool,
    pub page_ranges: String,
    /// Profile the renderer must emit directly (native application).
    pub format: Option<PdfFormat>,
}

// ── Engine configuration ─────────────────────────────────────────────────

/// Locations of the external tools and the per-command time limit.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// LibreOffice binary. Default: `soffice`.
    pub soffice: PathBuf,
    /// qpdf binary used for merging. Default: `qpdf`.
    pub qpdf: PathBuf,
    /// Ghostscript binary used for PDF/A conversion. Default: `gs`.
    pub ghostscript: PathBuf,
    /// ImageMagick `convert` binary used for slide images. Default: `convert`.
    pub imagemagick: PathBuf,
    /// Maximum wall-clock time for a single tool invocation. Default: 300 s.
    ///
    /// LibreOffice can hang forever on a malformed document; the subprocess
    /// is killed once this elapses.
    pub command_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soffice: PathBuf::from("soffice"),
            qpdf: PathBuf::from("qpdf"),
            ghostscript: PathBuf::from("gs"),
            imagemagick: PathBuf::from("convert"),
            command_timeout_secs: 300,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `OFFICEPDF_SOFFICE`, `OFFICEPDF_QPDF`,
    /// `OFFICEPDF_GS`, `OFFICEPDF_CONVERT` and `OFFICEPDF_COMMAND_TIMEOUT`.
    pub fn from_env() -> Result<Self, ConvertError> {
        let mut config = Self::default();
        let path_var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        if let Some(p) = path_var("OFFICEPDF_SOFFICE") {
            config.soffice = p;
        }
        if let Some(p) = path_var("OFFICEPDF_QPDF") {
            config.qpdf = p;
        }
        if let Some(p) = path_var("OFFICEPDF_GS") {
            config.ghostscript = p;
        }
        if let Some(p) = path_var("OFFICEPDF_CONVERT") {
            config.imagemagick = p;
        }
        if let Ok(secs) = std::env::var("OFFICEPDF_COMMAND_TIMEOUT") {
            config.command_timeout_secs =
                parse_timeout_secs("OFFICEPDF_COMMAND_TIMEOUT", &secs)?;
        }
        Ok(config)
    }

    pub fn with_soffice(mut self, path: impl AsRef<Path>) -> Self {
        self.soffice = path.as_ref().to_path_buf();
        self
    }

    pub fn with_qpdf(mut self, path: impl AsRef<Path>) -> Self {
        self.qpdf = path.as_ref().to_path_buf();
        self
    }

    pub fn with_ghostscript(mut self, path: impl AsRef<Path>) -> Self {
        self.ghostscript = path.as_ref().to_path_buf();
        self
    }

    pub fn with_imagemagick(mut self, path: impl AsRef<Path>) -> Self {
        self.imagemagick = path.as_ref().to_path_buf();
        self
    }

    pub fn with_command_timeout_secs(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs.max(1);
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Parse a whole number of seconds. Zero is clamped to one second.
fn parse_timeout_secs(field: &str, raw: &str) -> Result<u64, ConvertError> {
    raw.trim()
        .parse::<u64>()
        .map(|secs| secs.max(1))
        .map_err(|_| ConvertError::InvalidOption {
            field: field.to_string(),
            reason: format!("expected seconds, got '{raw}'"),
        })
}
