//! Office document → PDF via a headless LibreOffice.
//!
//! ## Why a profile directory per call?
//!
//! `soffice` refuses to start a second instance against a user profile that
//! is already in use. Giving every invocation its own throw-away
//! `-env:UserInstallation` lets the render stage run several documents in
//! parallel without the instances fighting over `~/.config/libreoffice`.
//!
//! ## Export options
//!
//! Page ranges and the PDF/A / PDF/UA profile are passed as JSON filter
//! options (`pdf:writer_pdf_Export:{...}`). The export filter name depends on
//! the LibreOffice component that opens the document, so it is chosen from
//! the input extension.

use super::command::run_command;
use super::DocumentRenderer;
use crate::config::{EngineConfig, PdfFormat, RenderOptions};
use crate::error::AdapterError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extensions LibreOffice can open, with the leading dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".bib", ".doc", ".docm", ".docx", ".dot", ".dotm", ".dotx", ".fodt", ".htm", ".html",
    ".ltx", ".odt", ".ott", ".pdb", ".psw", ".rtf", ".sdw", ".stw", ".sxw", ".txt", ".uot",
    ".vor", ".wpd", ".wps", ".xml", ".epub", ".pages",
    // Presentations
    ".fodp", ".key", ".odp", ".otp", ".pot", ".potm", ".potx", ".pps", ".ppsx", ".ppt",
    ".pptm", ".pptx", ".pwp", ".sda", ".sdd", ".sti", ".sxi", ".uop",
    // Spreadsheets
    ".csv", ".dbf", ".dif", ".fods", ".numbers", ".ods", ".ots", ".pxl", ".sdc", ".slk",
    ".stc", ".sxc", ".uos", ".xls", ".xlsb", ".xlsm", ".xlsx", ".xlt", ".xltm", ".xltx",
    // Drawings and images
    ".bmp", ".cdr", ".emf", ".eps", ".fodg", ".gif", ".jpeg", ".jpg", ".met", ".odd",
    ".odg", ".otg", ".pbm", ".pct", ".pgm", ".png", ".ppm", ".ras", ".std", ".svg", ".svm",
    ".swf", ".sxd", ".tif", ".tiff", ".vsd", ".vsdx", ".wmf", ".xhtml", ".xpm",
];

/// Renders documents with `soffice --headless --convert-to pdf`.
#[derive(Debug, Clone)]
pub struct LibreOfficeRenderer {
    soffice: PathBuf,
    timeout: Duration,
}

impl LibreOfficeRenderer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            soffice: config.soffice.clone(),
            timeout: config.command_timeout(),
        }
    }
}

#[async_trait]
impl DocumentRenderer for LibreOfficeRenderer {
    fn extensions(&self) -> Vec<&'static str> {
        SUPPORTED_EXTENSIONS.to_vec()
    }

    async fn render(
        &self,
        input: &Path,
        output: &Path,
        options: &RenderOptions,
    ) -> Result<(), AdapterError> {
        if !is_valid_page_ranges(&options.page_ranges) {
            return Err(AdapterError::MalformedPageRanges(options.page_ranges.clone()));
        }
        if options.landscape {
            warn!(
                "Landscape orientation cannot be forced through the soffice CLI; rendering '{}' with its own page setup",
                input.display()
            );
        }

        let parent = output.parent().unwrap_or_else(|| Path::new("."));
        let profile = tempfile::tempdir_in(parent)?;
        let out_dir = tempfile::tempdir_in(parent)?;

        let filter = export_filter(input);
        let target = convert_to_arg(filter, options);
        let mut args: Vec<OsString> = vec![
            format!("-env:UserInstallation={}", file_url(profile.path())).into(),
            "--headless".into(),
            "--invisible".into(),
            "--nologo".into(),
            "--norestore".into(),
            "--convert-to".into(),
            target.into(),
            "--outdir".into(),
        ];
        args.push(out_dir.path().as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());

        info!("Rendering '{}' with {}", input.display(), filter);
        run_command(&self.soffice, args, self.timeout).await?;

        // soffice names the result after the input stem and exits 0 even
        // when it could not load the document.
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let produced = out_dir.path().join(format!("{stem}.pdf"));
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(AdapterError::CommandFailed {
                program: self.soffice.display().to_string(),
                code: Some(0),
                stderr: format!("no PDF produced for '{}'", input.display()),
            });
        }
        tokio::fs::rename(&produced, output).await?;
        debug!("Rendered '{}' → '{}'", input.display(), output.display());
        Ok(())
    }
}

/// LibreOffice export filter for the component that opens `input`.
fn export_filter(input: &Path) -> &'static str {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "fodp" | "key" | "odp" | "otp" | "pot" | "potm" | "potx" | "pps" | "ppsx" | "ppt"
        | "pptm" | "pptx" | "pwp" | "sda" | "sdd" | "sti" | "sxi" | "uop" => "impress_pdf_Export",
        "csv" | "dbf" | "dif" | "fods" | "numbers" | "ods" | "ots" | "pxl" | "sdc" | "slk"
        | "stc" | "sxc" | "uos" | "xls" | "xlsb" | "xlsm" | "xlsx" | "xlt" | "xltm" | "xltx" => {
            "calc_pdf_Export"
        }
        "bmp" | "cdr" | "emf" | "eps" | "fodg" | "gif" | "jpeg" | "jpg" | "met" | "odd" | "odg"
        | "otg" | "pbm" | "pct" | "pgm" | "png" | "ppm" | "ras" | "std" | "svg" | "svm" | "swf"
        | "sxd" | "tif" | "tiff" | "vsd" | "vsdx" | "wmf" | "xpm" => "draw_pdf_Export",
        _ => "writer_pdf_Export",
    }
}

/// Build the `--convert-to` argument, e.g. `pdf:writer_pdf_Export:{...}`.
fn convert_to_arg(filter: &str, options: &RenderOptions) -> String {
    let props = filter_options(options);
    if props.is_empty() {
        return "pdf".to_string();
    }
    format!("pdf:{filter}:{}", Value::Object(props))
}

fn filter_options(options: &RenderOptions) -> Map<String, Value> {
    let mut props = Map::new();
    let ranges = options.page_ranges.trim();
    if !ranges.is_empty() {
        props.insert(
            "PageRange".into(),
            json!({ "type": "string", "value": ranges }),
        );
    }
    if let Some(format) = options.format {
        if let Some(part) = format.pdfa_part() {
            props.insert(
                "SelectPdfVersion".into(),
                json!({ "type": "long", "value": part.to_string() }),
            );
        }
        if format.is_tagged() {
            props.insert(
                "UseTaggedPDF".into(),
                json!({ "type": "boolean", "value": "true" }),
            );
        }
        if format == PdfFormat::PdfUa1 {
            props.insert(
                "PDFUACompliance".into(),
                json!({ "type": "boolean", "value": "true" }),
            );
        }
    }
    props
}

fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.starts_with('/') {
        format!("file://{s}")
    } else {
        format!("file:///{s}")
    }
}

static RE_PAGE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)?\s*(-)?\s*(\d+)?$").unwrap());

/// Check a LibreOffice page-range expression such as `1-3, 5, 8-`.
///
/// Tokens are separated by `,` or `;`. Each is `N`, `N-`, `-N` or `N-M` with
/// pages counted from 1 and `N <= M`. The empty expression means all pages.
pub fn is_valid_page_ranges(expr: &str) -> bool {
    if expr.trim().is_empty() {
        return true;
    }
    expr.split([',', ';']).all(|token| {
        let token = token.trim();
        let Some(caps) = RE_PAGE_RANGE.captures(token) else {
            return false;
        };
        let start = caps.get(1).map(|m| m.as_str().parse::<u64>());
        let dash = caps.get(2).is_some();
        let end = caps.get(3).map(|m| m.as_str().parse::<u64>());
        match (start, dash, end) {
            (Some(Ok(s)), false, None) => s >= 1,
            (Some(Ok(s)), true, None) => s >= 1,
            (None, true, Some(Ok(e))) => e >= 1,
            (Some(Ok(s)), true, Some(Ok(e))) => s >= 1 && s <= e,
            _ => false,
        }
    })
}
