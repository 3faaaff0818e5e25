//! Minimal reader for PowerPoint (`.pptx`) packages.
//!
//! Only what the slide description needs is extracted: the core-properties
//! title, and per slide the title placeholder text, the text of every
//! top-level text shape (in z-order) and the speaker notes.
//!
//! Parts are located through the package relationships rather than assumed
//! file names, so decks produced by tools other than PowerPoint (Keynote,
//! LibreOffice, python-pptx) resolve correctly.

use crate::error::AdapterError;
use roxmltree::{Document, Node};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Raw content of a presentation, before any title heuristics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    /// `dc:title` from the core properties, if any.
    pub title: Option<String>,
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slide {
    /// Text of the title placeholder, if the slide has one (may be empty).
    pub title: Option<String>,
    /// Text of every top-level text shape, in z-order.
    pub texts: Vec<String>,
    /// Body text of the notes slide, if present.
    pub notes: Option<String>,
}

struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Read `path` as a presentation package.
///
/// Returns `Ok(None)` when the file is not a presentation package at all
/// (a Word document, a legacy binary `.ppt`, a PDF, …).
pub fn read_presentation(path: &Path) -> Result<Option<Presentation>, AdapterError> {
    let file = File::open(path)?;
    let Ok(archive) = zip::ZipArchive::new(BufReader::new(file)) else {
        return Ok(None);
    };
    let mut package = Package {
        archive,
        path: path.to_path_buf(),
    };

    let root_rels = package.relationships("")?;
    let main_part = find_target(&root_rels, "/officeDocument")
        .unwrap_or_else(|| "ppt/presentation.xml".to_string());
    let Some(main_xml) = package.read_part(&main_part)? else {
        return Ok(None);
    };
    let main = package.parse(&main_part, &main_xml)?;
    if main.root_element().tag_name().name() != "presentation" {
        return Ok(None);
    }

    let main_rels = package.relationships(&main_part)?;
    let slide_parts: Vec<String> = main
        .descendants()
        .filter(|n| is(n, "sldId"))
        .filter_map(|n| n.attribute((REL_NS, "id")))
        .filter_map(|id| main_rels.iter().find(|r| r.id == id))
        .map(|r| r.target.clone())
        .collect();

    let mut slides = Vec::with_capacity(slide_parts.len());
    for part in &slide_parts {
        slides.push(package.read_slide(part)?);
    }

    let core_part = find_target(&root_rels, "/core-properties")
        .unwrap_or_else(|| "docProps/core.xml".to_string());
    let title = match package.read_part(&core_part)? {
        Some(xml) => {
            let doc = package.parse(&core_part, &xml)?;
            let title = doc
                .descendants()
                .find(|n| is(n, "title"))
                .map(|n| n.text().unwrap_or_default().to_string());
            title
        }
        None => None,
    };

    Ok(Some(Presentation { title, slides }))
}

struct Package {
    archive: zip::ZipArchive<BufReader<File>>,
    path: PathBuf,
}

impl Package {
    fn read_part(&mut self, name: &str) -> Result<Option<String>, AdapterError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(invalid(&self.path, name, e)),
        };
        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| invalid(&self.path, name, e))?;
        Ok(Some(xml))
    }

    fn parse<'x>(&self, part: &str, xml: &'x str) -> Result<Document<'x>, AdapterError> {
        Document::parse(xml).map_err(|e| invalid(&self.path, part, e))
    }

    fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>, AdapterError> {
        let rels_part = rels_path(part);
        let Some(xml) = self.read_part(&rels_part)? else {
            return Ok(Vec::new());
        };
        let doc = self.parse(&rels_part, &xml)?;
        let rels = doc
            .descendants()
            .filter(|n| is(n, "Relationship"))
            .filter(|n| n.attribute("TargetMode") != Some("External"))
            .filter_map(|n| {
                Some(Relationship {
                    id: n.attribute("Id")?.to_string(),
                    rel_type: n.attribute("Type").unwrap_or_default().to_string(),
                    target: resolve_target(part, n.attribute("Target")?),
                })
            })
            .collect();
        Ok(rels)
    }

    fn read_slide(&mut self, part: &str) -> Result<Slide, AdapterError> {
        let Some(xml) = self.read_part(part)? else {
            return Ok(Slide::default());
        };
        let doc = self.parse(part, &xml)?;
        let mut slide = Slide::default();
        for shape in top_level_shapes(&doc) {
            let text = shape_text(&shape);
            if slide.title.is_none()
                && matches!(placeholder_type(&shape), Some("title") | Some("ctrTitle"))
            {
                slide.title = Some(text.clone().unwrap_or_default());
            }
            if let Some(text) = text {
                slide.texts.push(text);
            }
        }

        let rels = self.relationships(part)?;
        if let Some(notes_part) = find_target(&rels, "/notesSlide") {
            if let Some(notes_xml) = self.read_part(&notes_part)? {
                let notes = self.parse(&notes_part, &notes_xml)?;
                slide.notes = notes_text(&notes);
            }
        }
        Ok(slide)
    }
}

fn invalid(path: &Path, part: &str, e: impl std::fmt::Display) -> AdapterError {
    AdapterError::Invalid {
        path: path.to_path_buf(),
        detail: format!("{part}: {e}"),
    }
}

fn is(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}

fn child<'a, 'x>(node: &Node<'a, 'x>, local: &str) -> Option<Node<'a, 'x>> {
    node.children().find(|n| is(n, local))
}

fn find_target(rels: &[Relationship], type_suffix: &str) -> Option<String> {
    rels.iter()
        .find(|r| r.rel_type.ends_with(type_suffix))
        .map(|r| r.target.clone())
}

/// `<p:sp>` children of the slide's shape tree.
fn top_level_shapes<'a, 'x>(doc: &'a Document<'x>) -> Vec<Node<'a, 'x>> {
    doc.descendants()
        .find(|n| is(n, "spTree"))
        .map(|tree| tree.children().filter(|n| is(n, "sp")).collect())
        .unwrap_or_default()
}

/// `type` of the shape's placeholder. OOXML defaults a missing one to `obj`.
fn placeholder_type<'a>(shape: &Node<'a, '_>) -> Option<&'a str> {
    let ph = child(shape, "nvSpPr")
        .and_then(|n| child(&n, "nvPr"))
        .and_then(|n| child(&n, "ph"))?;
    Some(ph.attribute("type").unwrap_or("obj"))
}

/// Speaker notes: the text of the notes slide's body placeholder.
fn notes_text(notes: &Document) -> Option<String> {
    top_level_shapes(notes)
        .into_iter()
        .find(|s| placeholder_type(s) == Some("body"))
        .and_then(|s| shape_text(&s))
}

/// Text of a shape: paragraphs joined by `\n`, line breaks as `\v`.
/// `None` when the shape has no text body.
fn shape_text(shape: &Node) -> Option<String> {
    let body = child(shape, "txBody")?;
    let paragraphs: Vec<String> = body
        .children()
        .filter(|n| is(n, "p"))
        .map(|p| {
            let mut text = String::new();
            for node in p.descendants() {
                if is(&node, "t") {
                    text.push_str(node.text().unwrap_or_default());
                } else if is(&node, "br") {
                    text.push('\u{b}');
                }
            }
            text
        })
        .collect();
    Some(paragraphs.join("\n"))
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`; the package
/// root (`""`) → `_rels/.rels`.
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target relative to the part that declares it.
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
