//! PDF merging (qpdf) and profile conversion (Ghostscript).

use super::command::run_command;
use super::PdfEngine;
use crate::config::{EngineConfig, PdfFormat};
use crate::error::AdapterError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Drives `qpdf` for merges and `gs` for PDF/A conversion.
#[derive(Debug, Clone)]
pub struct CommandPdfEngine {
    qpdf: PathBuf,
    ghostscript: PathBuf,
    timeout: Duration,
}

impl CommandPdfEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            qpdf: config.qpdf.clone(),
            ghostscript: config.ghostscript.clone(),
            timeout: config.command_timeout(),
        }
    }
}

#[async_trait]
impl PdfEngine for CommandPdfEngine {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), AdapterError> {
        info!("Merging {} PDFs with qpdf", inputs.len());
        run_command(&self.qpdf, merge_args(inputs, output), self.timeout).await?;
        Ok(())
    }

    async fn convert(
        &self,
        format: PdfFormat,
        input: &Path,
        output: &Path,
    ) -> Result<(), AdapterError> {
        let args = ghostscript_args(format, input, output)
            .ok_or_else(|| AdapterError::FormatNotAvailable(format.to_string()))?;
        info!("Converting '{}' to {} with Ghostscript", input.display(), format);
        run_command(&self.ghostscript, args, self.timeout).await?;
        Ok(())
    }
}

/// `qpdf --empty --pages a.pdf b.pdf -- out.pdf`
fn merge_args(inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--empty".into(), "--pages".into()];
    args.extend(inputs.iter().map(|p| p.as_os_str().to_owned()));
    args.push("--".into());
    args.push(output.as_os_str().to_owned());
    args
}

/// Ghostscript arguments for `format`, or `None` when `pdfwrite` cannot
/// produce it (tagged profiles need structure information gs discards).
fn ghostscript_args(format: PdfFormat, input: &Path, output: &Path) -> Option<Vec<OsString>> {
    if format.is_tagged() {
        return None;
    }
    let part = format.pdfa_part()?;
    let mut out_arg = OsString::from("-sOutputFile=");
    out_arg.push(output.as_os_str());
    Some(vec![
        format!("-dPDFA={part}").into(),
        "-dBATCH".into(),
        "-dNOPAUSE".into(),
        "-dSAFER".into(),
        "-dQUIET".into(),
        "-dPDFACompatibilityPolicy=1".into(),
        "-sColorConversionStrategy=RGB".into(),
        "-sDEVICE=pdfwrite".into(),
        out_arg,
        input.as_os_str().to_owned(),
    ])
}
