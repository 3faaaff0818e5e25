//! Slide metadata written next to rasterised slide images.
//!
//! For every image in the output directory the writer records which slide it
//! shows, that slide's title and its speaker notes, and stores the result as
//! `data.json`:
//!
//! ```json
//! {"title":"Quarterly Review","slides":[
//!   {"index":0,"title":"Intro","notes":"Say hello","image":"slide-0.jpg"}]}
//! ```
//!
//! Slide titles come from the title placeholder. When a slide has none, the
//! first shape with text is used with everything but ASCII letters, digits and
//! spaces stripped, and as a last resort `Untitled {index}`. Inputs that are
//! not presentations (word-processing documents, spreadsheets) still get one
//! entry per image, all untitled.

mod pptx;

pub use pptx::{read_presentation, Presentation, Slide};

use crate::adapters::MetadataExtractor;
use crate::error::AdapterError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the metadata file inside the image directory.
pub const METADATA_FILE_NAME: &str = "data.json";

/// Longest slide title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Core-properties title PowerPoint writes for never-renamed decks.
const PLACEHOLDER_DECK_TITLE: &str = "PowerPoint Presentation";

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9a-zA-Z ]+").unwrap());

/// Contents of `data.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDeck {
    pub title: String,
    pub slides: Vec<SlideEntry>,
}

/// One image and the slide it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideEntry {
    /// Zero-based slide index parsed from the image name.
    pub index: usize,
    pub title: String,
    pub notes: String,
    /// Image file name, relative to the metadata file.
    pub image: String,
}

/// Native [`MetadataExtractor`] that writes [`SlideDeck`] as `data.json`.
#[derive(Debug, Clone, Default)]
pub struct SlideDataWriter;

impl SlideDataWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataExtractor for SlideDataWriter {
    async fn extract(&self, document: &Path, out_dir: &Path) -> Result<PathBuf, AdapterError> {
        let document = document.to_path_buf();
        let out_dir = out_dir.to_path_buf();
        tokio::task::spawn_blocking(move || write_slide_data(&document, &out_dir))
            .await
            .map_err(|e| {
                AdapterError::Io(std::io::Error::other(format!(
                    "Metadata task panicked: {e}"
                )))
            })?
    }
}

/// Blocking implementation of [`SlideDataWriter::extract`].
pub fn write_slide_data(document: &Path, out_dir: &Path) -> Result<PathBuf, AdapterError> {
    let presentation = read_presentation(document)?.unwrap_or_default();
    let images = list_images(out_dir)?;
    let deck = describe(document, &presentation, &images);

    let path = out_dir.join(METADATA_FILE_NAME);
    let json = serde_json::to_vec(&deck).map_err(|e| AdapterError::Invalid {
        path: path.clone(),
        detail: e.to_string(),
    })?;
    std::fs::write(&path, json)?;
    info!(
        "Wrote metadata for {} slide images to '{}'",
        deck.slides.len(),
        path.display()
    );
    Ok(path)
}

/// Build the deck description for `images` (file names inside the image
/// directory).
pub fn describe(document: &Path, presentation: &Presentation, images: &[String]) -> SlideDeck {
    let mut slides: Vec<SlideEntry> = images
        .iter()
        .map(|image| {
            let index = image_index(image);
            let (title, notes) = match presentation.slides.get(index) {
                Some(slide) => (slide_title(slide, index), slide_notes(slide)),
                None => {
                    debug!("No slide {index} for image '{image}'");
                    (untitled(index), String::new())
                }
            };
            SlideEntry {
                index,
                title,
                notes,
                image: image.clone(),
            }
        })
        .collect();
    slides.sort_by_key(|s| s.index);

    SlideDeck {
        title: deck_title(presentation.title.as_deref(), document),
        slides,
    }
}

/// Zero-based slide index encoded in an image name (`slide-3.jpg` → 3).
/// Names without a numeric suffix (a single-page render) map to 0.
pub fn image_index(file_name: &str) -> usize {
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };
    stem.rsplit_once('-')
        .filter(|(_, digits)| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|(_, digits)| digits.parse().ok())
        .unwrap_or(0)
}

fn deck_title(core_title: Option<&str>, document: &Path) -> String {
    match core_title {
        Some(title) if !title.is_empty() && title != PLACEHOLDER_DECK_TITLE => title.to_string(),
        _ => document
            .file_name()
            .map(|n| n.to_string_lossy())
            .and_then(|n| n.split('.').next().map(str::to_string))
            .unwrap_or_default(),
    }
}

fn slide_title(slide: &Slide, index: usize) -> String {
    let title = match slide.title.as_deref() {
        Some(t) if !t.is_empty() => collapse(t),
        _ => match slide.texts.iter().find(|t| !t.trim().is_empty()) {
            Some(text) => collapse(&RE_NON_ALNUM.replace_all(text.trim(), "")),
            None => untitled(index),
        },
    };
    title.chars().take(MAX_TITLE_CHARS).collect()
}

fn slide_notes(slide: &Slide) -> String {
    slide
        .notes
        .as_deref()
        .map(|n| n.trim().to_string())
        .unwrap_or_default()
}

fn collapse(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn untitled(index: usize) -> String {
    format!("Untitled {index}")
}

/// File names in `dir`, sorted, excluding sub-directories and any previous
/// metadata file.
fn list_images(dir: &Path) -> Result<Vec<String>, AdapterError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != METADATA_FILE_NAME {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
