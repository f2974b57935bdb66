use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::core::style::Rgb;
use crate::document::reader::{dictionary_entry, inherited};
use crate::document::PageGeometry;
use crate::error::DocumentError;
use crate::render::layout::{PageOverlay, Shape};

const FONT_RESOURCE: &str = "EmkHelv";
const GSTATE_PREFIX: &str = "EmkGs";

/// Appends overlays to pages without touching their existing content.
///
/// The original content streams are bracketed by `q`/`Q` so the overlay always starts
/// from the default graphics state.
pub struct OverlayWriter<'a> {
    doc: &'a mut Document,
    font_id: ObjectId,
    gstates: Vec<(u32, ObjectId)>,
}

impl<'a> OverlayWriter<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            doc,
            font_id,
            gstates: Vec::new(),
        }
    }

    pub fn write_page(
        &mut self,
        page_id: ObjectId,
        geometry: PageGeometry,
        overlay: &PageOverlay,
    ) -> Result<(), DocumentError> {
        let mut operations = Vec::new();
        let mut used_gstates = Vec::new();
        for shape in &overlay.shapes {
            let gstate = match shape {
                Shape::Fill { opacity, .. } if *opacity < 1.0 => {
                    let name = self.gstate_name(*opacity);
                    used_gstates.push(name.clone());
                    Some(name)
                }
                _ => None,
            };
            operations.extend(shape_operations(shape, &geometry, gstate.as_deref()));
        }

        self.install_resources(page_id, &used_gstates)?;

        // a page's streams are concatenated, so the restore needs its own delimiter
        let mut bytes = b"\nQ\n".to_vec();
        bytes.extend(Content { operations }.encode()?);
        self.append_content(page_id, bytes)
    }

    fn gstate_name(&mut self, opacity: f32) -> String {
        let bits = opacity.to_bits();
        let slot = match self.gstates.iter().position(|(b, _)| *b == bits) {
            Some(slot) => slot,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(opacity),
                    "CA" => Object::Real(opacity),
                });
                self.gstates.push((bits, id));
                self.gstates.len() - 1
            }
        };
        format!("{GSTATE_PREFIX}{slot}")
    }

    /// Gives the page its own resource dictionary carrying the overlay font and states.
    fn install_resources(
        &mut self,
        page_id: ObjectId,
        gstates: &[String],
    ) -> Result<(), DocumentError> {
        let mut resources = inherited(self.doc, page_id, b"Resources")
            .and_then(|value| value.as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);

        let mut fonts = dictionary_entry(self.doc, &resources, b"Font");
        fonts.set(FONT_RESOURCE, Object::Reference(self.font_id));
        resources.set("Font", Object::Dictionary(fonts));

        if !gstates.is_empty() {
            let mut states = dictionary_entry(self.doc, &resources, b"ExtGState");
            for name in gstates {
                if let Some((_, id)) = name
                    .strip_prefix(GSTATE_PREFIX)
                    .and_then(|slot| slot.parse::<usize>().ok())
                    .and_then(|slot| self.gstates.get(slot))
                {
                    states.set(name.as_str(), Object::Reference(*id));
                }
            }
            resources.set("ExtGState", Object::Dictionary(states));
        }

        self.doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn append_content(&mut self, page_id: ObjectId, overlay: Vec<u8>) -> Result<(), DocumentError> {
        let existing = {
            let page = self.doc.get_dictionary(page_id)?;
            match page.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        };

        let save_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let overlay_id = self.doc.add_object(Stream::new(Dictionary::new(), overlay));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(overlay_id));

        self.doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Contents", Object::Array(contents));
        Ok(())
    }
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.r), real(color.g), real(color.b)]
}

/// Latin-1 bytes for the standard-font text; other characters become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn shape_operations(
    shape: &Shape,
    geometry: &PageGeometry,
    gstate: Option<&str>,
) -> Vec<Operation> {
    match shape {
        Shape::Outline { rect, color, width } => {
            let (x, y) = geometry.to_pdf(rect.x0, rect.y1);
            vec![
                Operation::new("q", vec![]),
                Operation::new("w", vec![real(*width)]),
                Operation::new("RG", color_operands(*color)),
                Operation::new(
                    "re",
                    vec![real(x), real(y), real(rect.width()), real(rect.height())],
                ),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ]
        }
        Shape::Fill { rect, color, .. } => {
            let (x, y) = geometry.to_pdf(rect.x0, rect.y1);
            let mut ops = vec![Operation::new("q", vec![])];
            if let Some(name) = gstate {
                ops.push(Operation::new("gs", vec![Object::Name(name.as_bytes().to_vec())]));
            }
            ops.extend([
                Operation::new("rg", color_operands(*color)),
                Operation::new(
                    "re",
                    vec![real(x), real(y), real(rect.width()), real(rect.height())],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ]);
            ops
        }
        Shape::Text {
            origin,
            text,
            size,
            color,
        } => {
            let (x, y) = geometry.to_pdf(origin.x, origin.y);
            vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(*size)],
                ),
                Operation::new("rg", color_operands(*color)),
                Operation::new(
                    "Tm",
                    vec![real(1.0), real(0.0), real(0.0), real(1.0), real(x), real(y)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_text(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]
        }
    }
}
