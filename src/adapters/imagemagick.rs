//! PDF → slide images with ImageMagick.
//!
//! Rendering at a high density and then shrinking with `-resize` gives
//! noticeably sharper text than rendering directly at the target size, hence
//! the 288 DPI / 50 % defaults in [`crate::config::RasterOptions`].
//!
//! ImageMagick names the pages `slide-0.jpg`, `slide-1.jpg`, … and a
//! single-page document just `slide.jpg`.

use super::command::run_command;
use super::Rasterizer;
use crate::config::{EngineConfig, RasterOptions};
use crate::error::AdapterError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Base name of the generated images inside the output directory.
pub const IMAGE_FILE_NAME: &str = "slide.jpg";

/// Drives ImageMagick's `convert`.
#[derive(Debug, Clone)]
pub struct ImageMagickRasterizer {
    convert: PathBuf,
    timeout: Duration,
}

impl ImageMagickRasterizer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            convert: config.imagemagick.clone(),
            timeout: config.command_timeout(),
        }
    }
}

#[async_trait]
impl Rasterizer for ImageMagickRasterizer {
    async fn rasterize(
        &self,
        pdf: &Path,
        options: &RasterOptions,
        out_dir: &Path,
    ) -> Result<(), AdapterError> {
        info!("Creating slide images out of '{}'", pdf.display());
        run_command(&self.convert, convert_args(pdf, options, out_dir), self.timeout).await?;
        Ok(())
    }
}

fn convert_args(pdf: &Path, options: &RasterOptions, out_dir: &Path) -> Vec<OsString> {
    vec![
        "-density".into(),
        options.density.clone().into(),
        pdf.as_os_str().to_owned(),
        "-quality".into(),
        options.quality.clone().into(),
        "-resize".into(),
        options.resize.clone().into(),
        out_dir.join(IMAGE_FILE_NAME).into_os_string(),
    ]
}
