use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::DocumentError;

/// Depth limit when walking `/Parent` links for inherited page attributes.
const MAX_TREE_DEPTH: usize = 32;

/// Visible page area in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageGeometry {
    /// US Letter, used when a page carries no usable box.
    pub const LETTER: PageGeometry = PageGeometry {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Maps a top-left-origin document point into PDF user space.
    pub fn to_pdf(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x0 + x, self.y1 - y)
    }
}

#[derive(Debug)]
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    pages: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        let doc = Document::load(&path).map_err(|source| DocumentError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_document(path, doc))
    }

    pub fn from_document(path: PathBuf, doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { path, doc, pages }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_id(&self, page_idx: usize) -> Option<ObjectId> {
        self.pages.get(page_idx).copied()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// CropBox of the page, falling back to MediaBox, then to US Letter.
    pub fn page_geometry(&self, page_idx: usize) -> PageGeometry {
        self.page_id(page_idx)
            .and_then(|page_id| {
                page_box(&self.doc, page_id, b"CropBox")
                    .or_else(|| page_box(&self.doc, page_id, b"MediaBox"))
            })
            .unwrap_or(PageGeometry::LETTER)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| DocumentError::Encode(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DocumentError::Save {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, buffer).map_err(|source| DocumentError::Save {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Page attribute, following `/Parent` links for inheritable keys.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(node).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Resolved copy of a dictionary-valued entry, or an empty dictionary.
pub(crate) fn dictionary_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Dictionary {
    dict.get(key)
        .ok()
        .map(|value| resolve(doc, value))
        .and_then(|value| value.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn page_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PageGeometry> {
    let items = inherited(doc, page_id, key)?.as_array().ok()?;
    let values: Vec<f32> = items
        .iter()
        .filter_map(|item| number(resolve(doc, item)))
        .collect();
    let [a, b, c, d] = values[..] else {
        return None;
    };
    let geometry = PageGeometry {
        x0: a.min(c),
        y0: b.min(d),
        x1: a.max(c),
        y1: b.max(d),
    };
    (geometry.width() > 0.0 && geometry.height() > 0.0).then_some(geometry)
}
