//! Template loading
//!
//! A template is the first page of an existing PDF. Everything a drawing
//! surface needs from it (page box, content bytes, resources) is resolved
//! once at load time so that every copy starts from the same state.

use crate::page::PageCanvas;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// A4 portrait, used when a page tree carries no usable box at all
const A4_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 595.28, 841.89];

/// Page entries that reference the page itself or other pages of the
/// source document and must not be carried over into copies.
const PAGE_LOCAL_KEYS: [&[u8]; 10] = [
    b"Parent",
    b"Contents",
    b"Resources",
    b"MediaBox",
    b"CropBox",
    b"Rotate",
    b"Annots",
    b"StructParents",
    b"B",
    b"Thumb",
];

/// Page box in PDF user space (bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl MediaBox {
    /// Normalize two arbitrary corners into a box with `x0 <= x1`, `y0 <= y1`
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Width in points
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height in points
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Overlap of two boxes, `None` when they do not overlap
    pub fn intersect(&self, other: &MediaBox) -> Option<MediaBox> {
        let clipped = MediaBox {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (clipped.width() > 0.0 && clipped.height() > 0.0).then_some(clipped)
    }
}

/// The first page of a template PDF, ready to be copied
#[derive(Debug, Clone)]
pub struct TemplatePage {
    /// The source document; its shared objects (fonts, forms, images
    /// referenced by the page resources) are reused by the output
    document: Document,
    /// Number of pages in the source (only the first is used)
    source_pages: usize,
    /// MediaBox of the first page
    media_box: MediaBox,
    /// Visible area: the CropBox clipped to the MediaBox
    page_box: MediaBox,
    /// Clockwise display rotation in degrees (0, 90, 180 or 270)
    rotation: u16,
    /// Page dictionary without page-local entries
    page_attributes: Dictionary,
    /// Decompressed, concatenated content of the first page
    content: Vec<u8>,
    /// Fully resolved resources dictionary of the first page
    resources: Dictionary,
}

impl TemplatePage {
    /// Open a template from a file path
    ///
    /// # Example
    /// ```ignore
    /// let template = TemplatePage::open("Template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let document = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(document)
    }

    /// Open a template from PDF bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: Document) -> Result<Self> {
        if document.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfError::OpenError(
                "Encrypted templates are not supported".to_string(),
            ));
        }

        let pages = document.get_pages();
        let source_pages = pages.len();
        let page_id = *pages
            .get(&1)
            .ok_or_else(|| PdfError::OpenError("Template has no pages".to_string()))?;

        let page_dict = document
            .get_object(page_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Page object is not a dictionary".to_string()))?;

        let media_box = inherited_media_box(&document, page_id)?;
        let page_box = visible_box(&document, page_id, media_box)?;
        let rotation = inherited_rotation(&document, page_id)?;
        let content = page_content(&document, page_dict);
        let resources = resolve_resources(&document, page_id)?;

        let mut page_attributes = page_dict.clone();
        for key in PAGE_LOCAL_KEYS {
            page_attributes.remove(key);
        }

        Ok(Self {
            document,
            source_pages,
            media_box,
            page_box,
            rotation,
            page_attributes,
            content,
            resources,
        })
    }

    /// MediaBox of the template page
    pub fn media_box(&self) -> MediaBox {
        self.media_box
    }

    /// Visible area of the template page in user space
    ///
    /// This is the CropBox clipped to the MediaBox, or the MediaBox when
    /// the page has no CropBox.
    pub fn page_box(&self) -> MediaBox {
        self.page_box
    }

    /// Clockwise display rotation in degrees: 0, 90, 180 or 270
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// Width and height of the page as displayed (rotation applied)
    pub fn page_size(&self) -> (f64, f64) {
        displayed_size(self.page_box, self.rotation)
    }

    /// Number of pages in the source document (only the first is used)
    pub fn source_page_count(&self) -> usize {
        self.source_pages
    }

    /// Create a fresh, independent copy of the template page to draw on
    pub fn new_page(&self) -> PageCanvas {
        PageCanvas::new(
            self.media_box,
            self.page_box,
            self.rotation,
            self.page_attributes.clone(),
            self.content.clone(),
            self.resources.clone(),
        )
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }
}

/// Width and height of `page_box` once rotated for display
pub(crate) fn displayed_size(page_box: MediaBox, rotation: u16) -> (f64, f64) {
    match rotation {
        90 | 270 => (page_box.height(), page_box.width()),
        _ => (page_box.width(), page_box.height()),
    }
}

/// Look up a page attribute, following the Parent chain for inheritable
/// keys and resolving a direct reference
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut current_id = page_id;

    // Follow parent chain up to 10 levels (safety limit)
    for _ in 0..10 {
        let dict = doc
            .get_object(current_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

        if let Ok(value) = dict.get(key) {
            let value = match value {
                Object::Reference(ref_id) => doc.get_object(*ref_id)?.clone(),
                other => other.clone(),
            };
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current_id = *parent_id,
            _ => break,
        }
    }

    Ok(None)
}

fn box_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<MediaBox>> {
    match inherited_attribute(doc, page_id, key)? {
        Some(Object::Array(array)) => media_box_from_array(&array).map(Some),
        Some(_) => Err(PdfError::ParseError(format!(
            "{} is not an array",
            String::from_utf8_lossy(key)
        ))),
        None => Ok(None),
    }
}

fn inherited_media_box(doc: &Document, page_id: ObjectId) -> Result<MediaBox> {
    if let Some(media_box) = box_attribute(doc, page_id, b"MediaBox")? {
        return Ok(media_box);
    }

    log::warn!("Template page has no MediaBox; assuming A4");
    let [x0, y0, x1, y1] = A4_MEDIA_BOX;
    Ok(MediaBox::new(x0, y0, x1, y1))
}

/// The CropBox clipped to the MediaBox
fn visible_box(doc: &Document, page_id: ObjectId, media_box: MediaBox) -> Result<MediaBox> {
    let Some(crop_box) = box_attribute(doc, page_id, b"CropBox")? else {
        return Ok(media_box);
    };

    match crop_box.intersect(&media_box) {
        Some(visible) => Ok(visible),
        None => {
            log::warn!("Template CropBox lies outside the MediaBox; using the MediaBox");
            Ok(media_box)
        }
    }
}

/// Normalized /Rotate value
fn inherited_rotation(doc: &Document, page_id: ObjectId) -> Result<u16> {
    let degrees = match inherited_attribute(doc, page_id, b"Rotate")? {
        Some(Object::Integer(degrees)) => degrees,
        Some(Object::Real(degrees)) if degrees.fract() == 0.0 => degrees as i64,
        Some(other) => {
            return Err(PdfError::OpenError(format!(
                "Template /Rotate is not an integer: {other:?}"
            )))
        }
        None => 0,
    };

    if degrees % 90 != 0 {
        return Err(PdfError::OpenError(format!(
            "Template /Rotate must be a multiple of 90, got {degrees}"
        )));
    }
    Ok(degrees.rem_euclid(360) as u16)
}

fn media_box_from_array(array: &[Object]) -> Result<MediaBox> {
    if array.len() < 4 {
        return Err(PdfError::ParseError("Invalid page box format".to_string()));
    }

    let number = |obj: &Object| -> Result<f64> {
        obj.as_float()
            .map(|v| v as f64)
            .map_err(|_| PdfError::ParseError("Invalid page box value".to_string()))
    };

    Ok(MediaBox::new(
        number(&array[0])?,
        number(&array[1])?,
        number(&array[2])?,
        number(&array[3])?,
    ))
}

/// Read and concatenate the page content streams
fn page_content(doc: &Document, page_dict: &Dictionary) -> Vec<u8> {
    let stream_bytes = |obj: &Object| -> Vec<u8> {
        let stream = match obj {
            Object::Stream(stream) => Some(stream),
            Object::Reference(ref_id) => match doc.get_object(*ref_id) {
                Ok(Object::Stream(stream)) => Some(stream),
                _ => None,
            },
            _ => None,
        };
        stream
            .map(|s| {
                s.decompressed_content()
                    .unwrap_or_else(|_| s.content.clone())
            })
            .unwrap_or_default()
    };

    let concat = |streams: &[Object]| -> Vec<u8> {
        let mut combined = Vec::new();
        for obj in streams {
            combined.extend_from_slice(&stream_bytes(obj));
            // Streams are concatenated as if separated by whitespace
            combined.push(b'\n');
        }
        combined
    };

    match page_dict.get(b"Contents") {
        Ok(Object::Array(arr)) => concat(arr),
        // Contents may also be a reference to an array of streams
        Ok(Object::Reference(ref_id)) => match doc.get_object(*ref_id) {
            Ok(Object::Array(arr)) => concat(arr),
            Ok(obj) => stream_bytes(obj),
            Err(_) => Vec::new(),
        },
        Ok(obj) => stream_bytes(obj),
        Err(_) => Vec::new(),
    }
}

/// Resolve the page's (possibly inherited, possibly indirect) Resources
/// into a direct dictionary whose Font and XObject entries are direct too
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current_id = page_id;
    let mut resources = None;

    for _ in 0..10 {
        let dict = doc
            .get_object(current_id)?
            .as_dict()
            .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

        if let Ok(obj) = dict.get(b"Resources") {
            resources = Some(resolve_dict(doc, obj));
            break;
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current_id = *parent_id,
            _ => break,
        }
    }

    let mut resources = resources.unwrap_or_default();
    for key in [b"Font".as_slice(), b"XObject".as_slice()] {
        if let Ok(obj) = resources.get(key) {
            let direct = resolve_dict(doc, obj);
            resources.set(key, Object::Dictionary(direct));
        }
    }

    Ok(resources)
}

/// Clone a dictionary that may be stored directly or behind a reference
fn resolve_dict(doc: &Document, obj: &Object) -> Dictionary {
    match obj {
        Object::Dictionary(dict) => dict.clone(),
        Object::Reference(ref_id) => doc
            .get_object(*ref_id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

impl From<MediaBox> for Object {
    fn from(media_box: MediaBox) -> Self {
        Object::Array(vec![
            Object::Real(media_box.x0 as f32),
            Object::Real(media_box.y0 as f32),
            Object::Real(media_box.x1 as f32),
            Object::Real(media_box.y1 as f32),
        ])
    }
}
