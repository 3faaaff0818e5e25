//! Request boundary: raw form fields → validated [`OptionSet`].
//!
//! Clients have asked for a target PDF format in four different ways over
//! the lifetime of the API (`targetFormat`, `nativePdfFormat`, `pdfFormat`
//! and the deprecated `nativePdfA1aFormat` flag). They are collapsed here
//! into one canonical `target_format` + `apply_format_natively` pair, so the
//! orchestrator never reasons about aliases. Supplying more than one of them
//! is rejected as ambiguous.

use crate::config::{OptionSet, OptionSetBuilder, PdfFormat};
use crate::error::ConvertError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Raw form fields of a conversion request, exactly as received.
///
/// Every value is kept as the client's string; interpretation happens in
/// [`ConvertForm::into_builder`] so errors can name the offending field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertForm {
    pub landscape: Option<String>,
    pub native_page_ranges: Option<String>,
    pub target_format: Option<String>,
    pub apply_format_natively: Option<String>,
    pub native_pdf_format: Option<String>,
    pub pdf_format: Option<String>,
    #[serde(rename = "nativePdfA1aFormat")]
    pub native_pdf_a1a_format: Option<String>,
    pub merge: Option<String>,
    pub as_images: Option<String>,
    pub slide_image_density: Option<String>,
    pub slide_image_quality: Option<String>,
    pub slide_image_resize: Option<String>,
}

impl ConvertForm {
    /// Collect fields from `(name, value)` pairs. Unknown names are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut form = Self::default();
        for (name, value) in pairs {
            let slot = match name {
                "landscape" => &mut form.landscape,
                "nativePageRanges" => &mut form.native_page_ranges,
                "targetFormat" => &mut form.target_format,
                "applyFormatNatively" => &mut form.apply_format_natively,
                "nativePdfFormat" => &mut form.native_pdf_format,
                "pdfFormat" => &mut form.pdf_format,
                "nativePdfA1aFormat" => &mut form.native_pdf_a1a_format,
                "merge" => &mut form.merge,
                "asImages" => &mut form.as_images,
                "slideImageDensity" => &mut form.slide_image_density,
                "slideImageQuality" => &mut form.slide_image_quality,
                "slideImageResize" => &mut form.slide_image_resize,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        form
    }

    /// Validate the fields and produce a builder for the remaining knobs.
    ///
    /// `supported_extensions` comes from the renderer
    /// ([`crate::adapters::DocumentRenderer::extensions`]).
    pub fn into_builder(
        self,
        inputs: Vec<PathBuf>,
        supported_extensions: &[&str],
    ) -> Result<OptionSetBuilder, ConvertError> {
        if inputs.is_empty() {
            return Err(ConvertError::NoInputs);
        }
        for input in &inputs {
            if !has_supported_extension(input, supported_extensions) {
                return Err(ConvertError::UnsupportedInput {
                    path: input.clone(),
                    supported: supported_extensions.join(", "),
                });
            }
        }

        let landscape = parse_bool("landscape", self.landscape.as_deref(), false)?;
        let explicit_natively = non_empty(self.apply_format_natively.as_deref())
            .map(|raw| parse_bool("applyFormatNatively", Some(raw), true))
            .transpose()?;
        let apply_natively = explicit_natively.unwrap_or(true);
        let a1a = parse_bool(
            "nativePdfA1aFormat",
            self.native_pdf_a1a_format.as_deref(),
            false,
        )?;
        let merge = parse_bool("merge", self.merge.as_deref(), false)?;
        let as_images = parse_bool("asImages", self.as_images.as_deref(), false)?;

        if a1a {
            warn!("'nativePdfA1aFormat' is deprecated; prefer 'nativePdfFormat' or 'pdfFormat' form fields instead");
        }

        // Order matters only for which pair an error names first.
        let directives = [
            ("targetFormat", non_empty(self.target_format.as_deref())),
            ("nativePdfFormat", non_empty(self.native_pdf_format.as_deref())),
            ("pdfFormat", non_empty(self.pdf_format.as_deref())),
            ("nativePdfA1aFormat", a1a.then_some(PdfFormat::PdfA1a.as_str())),
        ];
        let mut supplied = directives.iter().filter(|(_, v)| v.is_some());
        let first = supplied.next();
        if let (Some((first, _)), Some((second, _))) = (first, supplied.next()) {
            return Err(ConvertError::ConflictingFormatOptions {
                first: *first,
                second: *second,
            });
        }

        if as_images && inputs.len() > 1 {
            return Err(ConvertError::AmbiguousRasterTarget {
                inputs: inputs.len(),
            });
        }

        let (target_format, natively) = match first {
            None => (None, apply_natively),
            Some((field, Some(name))) => {
                let format = parse_format(field, name)?;
                let natively = match *field {
                    "targetFormat" => apply_natively,
                    "pdfFormat" => false,
                    _ => true,
                };
                // Legacy aliases fix the mode; an explicit flag must agree.
                if explicit_natively.is_some_and(|v| v != natively) {
                    return Err(ConvertError::ConflictingFormatOptions {
                        first: *field,
                        second: "applyFormatNatively",
                    });
                }
                (Some(format), natively)
            }
            Some((_, None)) => (None, apply_natively),
        };

        let mut builder = OptionSet::builder()
            .inputs(inputs)
            .landscape(landscape)
            .page_ranges(self.native_page_ranges.unwrap_or_default())
            .target_format(target_format)
            .apply_format_natively(natively)
            .merge(merge)
            .rasterize(as_images);
        if let Some(v) = non_empty(self.slide_image_density.as_deref()) {
            builder = builder.raster_density(v);
        }
        if let Some(v) = non_empty(self.slide_image_quality.as_deref()) {
            builder = builder.raster_quality(v);
        }
        if let Some(v) = non_empty(self.slide_image_resize.as_deref()) {
            builder = builder.raster_resize(v);
        }
        Ok(builder)
    }

    /// Validate and build in one step with default concurrency.
    pub fn into_options(
        self,
        inputs: Vec<PathBuf>,
        supported_extensions: &[&str],
    ) -> Result<OptionSet, ConvertError> {
        self.into_builder(inputs, supported_extensions)?.build()
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn has_supported_extension(path: &Path, supported: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    supported
        .iter()
        .any(|s| s.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Parse a boolean form value. Empty or missing falls back to `default`.
fn parse_bool(field: &str, value: Option<&str>, default: bool) -> Result<bool, ConvertError> {
    let Some(raw) = non_empty(value) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => Err(ConvertError::InvalidOption {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{raw}'"),
        }),
    }
}

fn parse_format(field: &str, name: &str) -> Result<PdfFormat, ConvertError> {
    PdfFormat::from_name(name).ok_or_else(|| ConvertError::InvalidOption {
        field: field.to_string(),
        reason: format!(
            "unknown PDF format '{name}' (expected one of: {})",
            PdfFormat::ALL.map(|f| f.as_str()).join(", ")
        ),
    })
}
