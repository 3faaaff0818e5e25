//! Error types for the officepdf library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`ConvertError`] — **Request-level**: the conversion cannot produce its
//!   output set (bad options, an adapter failed, staging broke). Returned as
//!   `Err(ConvertError)` from [`crate::pipeline::Pipeline::run`] and the
//!   top-level `convert*` functions. Each variant knows whether it is the
//!   client's fault ([`ConvertError::status_code`] = 400) or ours (500).
//!
//! * [`AdapterError`] — **Collaborator-level**: an external tool (LibreOffice,
//!   qpdf, Ghostscript, ImageMagick, the slide-metadata reader) failed. The
//!   orchestrator classifies these into client-facing `ConvertError`
//!   variants (malformed page ranges, unsupported format) or wraps them as
//!   server-side failures.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the officepdf library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Client input errors ───────────────────────────────────────────────
    /// No input file was supplied.
    #[error("At least one input file is required")]
    NoInputs,

    /// An input file has an extension the renderer cannot handle.
    #[error("Input '{path}' has an unsupported extension (supported: {supported})")]
    UnsupportedInput { path: PathBuf, supported: String },

    /// Rasterisation was requested for more than one input.
    #[error("There should be only one input file when converting to images (got {inputs})")]
    AmbiguousRasterTarget { inputs: usize },

    /// More than one spelling of the target PDF format was supplied.
    #[error("Both '{first}' and '{second}' form fields are provided")]
    ConflictingFormatOptions {
        first: &'static str,
        second: &'static str,
    },

    /// A request field could not be interpreted.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidOption { field: String, reason: String },

    /// The renderer rejected the page-range expression.
    #[error("Malformed page ranges '{ranges}' ({field})")]
    MalformedPageRanges { ranges: String, field: &'static str },

    /// An engine does not handle the requested PDF format.
    #[error("At least one PDF engine does not handle the PDF format '{format}' ({field})")]
    UnsupportedFormat { format: String, field: &'static str },

    // ── Stage failures ────────────────────────────────────────────────────
    /// The renderer failed on one input.
    #[error("Convert '{input}' to PDF: {source}")]
    RenderFailed {
        input: PathBuf,
        #[source]
        source: AdapterError,
    },

    /// Merging the rendered PDFs failed.
    #[error("Merge PDFs: {0}")]
    MergeFailed(#[source] AdapterError),

    /// Applying the target PDF format failed for a reason other than support.
    #[error("Convert PDF '{input}': {source}")]
    FormatConversionFailed {
        input: PathBuf,
        #[source]
        source: AdapterError,
    },

    /// The rasteriser failed on the final PDF.
    #[error("Failed to create images from PDF: {0}")]
    RasterizationFailed(#[source] AdapterError),

    /// The slide-metadata extractor failed.
    #[error("Failed to write slide data: {0}")]
    MetadataExtractionFailed(#[source] AdapterError),

    // ── Infrastructure errors ─────────────────────────────────────────────
    /// Could not create a staging file or directory.
    #[error("Staging error at '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not copy a final artifact to its destination.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The whole conversion exceeded its deadline.
    #[error("Conversion timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConvertError::NoInputs
                | ConvertError::UnsupportedInput { .. }
                | ConvertError::AmbiguousRasterTarget { .. }
                | ConvertError::ConflictingFormatOptions { .. }
                | ConvertError::InvalidOption { .. }
                | ConvertError::MalformedPageRanges { .. }
                | ConvertError::UnsupportedFormat { .. }
        )
    }

    /// HTTP status code to surface for this error.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Message safe to return to a client.
    ///
    /// Client errors are reported verbatim (they name the offending field);
    /// server errors never leak paths or tool output.
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        }
    }
}

/// A failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The page-range expression could not be parsed.
    #[error("malformed page ranges '{0}'")]
    MalformedPageRanges(String),

    /// The engine cannot produce the requested PDF format.
    #[error("PDF format '{0}' is not available")]
    FormatNotAvailable(String),

    /// A subprocess exited unsuccessfully.
    #[error("command '{program}' failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A subprocess exceeded its timeout and was killed.
    #[error("command '{program}' timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    /// The adapter's input could not be interpreted (e.g. a corrupt package).
    #[error("invalid input '{path}': {detail}")]
    Invalid { path: PathBuf, detail: String },

    /// I/O failure inside the adapter (spawn, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
