//! # officepdf
//!
//! Convert office documents (Word, Excel, PowerPoint, OpenDocument, …) to
//! PDF by orchestrating external tools, with optional merging, PDF/A and
//! PDF/UA output, and slide images with per-slide metadata.
//!
//! ## Pipeline Overview
//!
//! ```text
//! documents
//!  │
//!  ├─ 1. Render         one PDF per input (LibreOffice, bounded parallelism)
//!  ├─ 2. Merge          N PDFs → 1, input order (qpdf)             [merge]
//!  ├─ 3. FormatConvert  apply PDF/A after the fact (Ghostscript)   [post-hoc format]
//!  ├─ 4. Rasterize      PDF → slide images + data.json (ImageMagick) [asImages]
//!  └─ 5. Finalize       ordered artifact list
//! ```
//!
//! Requests arrive as loosely typed form fields ([`ConvertForm`]), are
//! validated into an immutable [`OptionSet`], and are then run by a
//! [`Pipeline`] over a private [`Staging`] area. Any stage failure aborts the
//! whole request; there is never a partial result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use officepdf::{convert_to_dir, ConvertForm, EngineConfig, Pipeline};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::from_config(&EngineConfig::from_env()?);
//!     let form = ConvertForm::from_pairs([("merge", "true"), ("pdfFormat", "PDF/A-2b")]);
//!     let options = officepdf::options_from_form(
//!         &pipeline,
//!         form,
//!         vec![PathBuf::from("cover.docx"), PathBuf::from("figures.xlsx")],
//!     )?;
//!     let output = convert_to_dir(&pipeline, &options, "out").await?;
//!     for path in output.paths() {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `officepdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `test-export-mocks` | off | Exports the `mockall` adapter mocks (`MockDocumentRenderer`, …) |
//!
//! ## External Tools
//!
//! | Tool | Used for | Override |
//! |------|----------|----------|
//! | `soffice` | rendering | `OFFICEPDF_SOFFICE` |
//! | `qpdf` | merging | `OFFICEPDF_QPDF` |
//! | `gs` | PDF/A-1b/2b/3b conversion | `OFFICEPDF_GS` |
//! | `convert` | slide images | `OFFICEPDF_CONVERT` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod adapters;
pub mod artifact;
pub mod config;
pub mod convert;
pub mod error;
pub mod form;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod staging;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use adapters::{Adapters, DocumentRenderer, MetadataExtractor, PdfEngine, Rasterizer};
pub use artifact::{Artifact, ArtifactRole, ConversionOutput, ConversionStats};
pub use config::{EngineConfig, OptionSet, OptionSetBuilder, PdfFormat, RasterOptions, RenderOptions};
pub use convert::{convert, convert_sync, convert_to_dir, convert_with_timeout, options_from_form};
pub use error::{AdapterError, ConvertError};
pub use form::ConvertForm;
pub use metadata::{SlideDataWriter, SlideDeck, SlideEntry};
pub use pipeline::{Pipeline, Stage};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use staging::Staging;
