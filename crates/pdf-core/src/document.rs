//! Output document assembled from template page copies

use crate::font::{FontObjects, PdfFont};
use crate::page::{PageCanvas, OVERLAY_FONT_RESOURCE};
use crate::template::TemplatePage;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Catalog entries that point into the template's own page list
const CATALOG_PAGE_REFERENCES: [&[u8]; 6] = [
    b"Outlines",
    b"OpenAction",
    b"PageLabels",
    b"AcroForm",
    b"StructTreeRoot",
    b"Dests",
];

/// A multi-page PDF built from copies of one template page
///
/// The document starts as a clone of the template's source document so
/// that objects shared by every copy (fonts, forms and images used by the
/// template content) are stored once. Its page list starts empty; the
/// template's own pages are dropped when the document is written.
pub struct PdfDocument {
    inner: Document,
    /// Root of the page tree
    pages_id: ObjectId,
    /// Appended pages, in order
    page_ids: Vec<ObjectId>,
    /// Overlay font and the object id reserved for it
    font: PdfFont,
    font_id: ObjectId,
    font_used: bool,
    /// Characters drawn with an embedded font, across all pages
    used_chars: BTreeSet<char>,
    /// Shared template content streams (content hash -> object ID)
    base_contents: HashMap<u64, ObjectId>,
    /// Embedded images (content hash -> object ID)
    embedded_images: HashMap<u64, ObjectId>,
    finalized: bool,
}

impl PdfDocument {
    /// Start an empty output document for pages copied from `template`
    ///
    /// Canvases appended later must come from the same template.
    ///
    /// # Arguments
    /// * `template` - Template the pages will be copied from
    /// * `font` - Font used for all overlay text
    pub fn from_template(template: &TemplatePage, font: PdfFont) -> Result<Self> {
        let mut inner = template.document().clone();
        let pages_id = page_tree_root(&inner)?;
        let font_id = inner.new_object_id();

        Ok(Self {
            inner,
            pages_id,
            page_ids: Vec::new(),
            font,
            font_id,
            font_used: false,
            used_chars: BTreeSet::new(),
            base_contents: HashMap::new(),
            embedded_images: HashMap::new(),
            finalized: false,
        })
    }

    /// Number of pages appended so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a finished page
    ///
    /// # Returns
    /// New page number (1-indexed)
    pub fn append_page(&mut self, canvas: PageCanvas) -> Result<usize> {
        if self.finalized {
            return Err(PdfError::SaveError(
                "Document has already been written".to_string(),
            ));
        }

        let parts = canvas.into_parts();

        let base_id = self.base_content_ref(parts.wrapped_base());
        let overlay_id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), parts.overlay_content()));

        let mut resources = parts.resources.clone();
        if parts.uses_font {
            let mut fonts = resource_subdict(&resources, b"Font");
            fonts.set(OVERLAY_FONT_RESOURCE, Object::Reference(self.font_id));
            resources.set("Font", Object::Dictionary(fonts));
            self.font_used = true;
            self.used_chars.extend(parts.used_chars.iter().copied());
        }

        if !parts.images.is_empty() {
            let mut xobjects = resource_subdict(&resources, b"XObject");
            for (name, xobject) in &parts.images {
                let image_id = *self
                    .embedded_images
                    .entry(xobject.content_hash())
                    .or_insert_with(|| self.inner.add_object(xobject.to_pdf_stream()));
                xobjects.set(name.as_bytes(), Object::Reference(image_id));
            }
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let mut page_dict = parts.attributes;
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("MediaBox", parts.media_box);
        page_dict.set("CropBox", parts.page_box);
        page_dict.set("Rotate", i64::from(parts.rotation));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set(
            "Contents",
            Object::Array(vec![
                Object::Reference(base_id),
                Object::Reference(overlay_id),
            ]),
        );

        let page_id = self.inner.add_object(Object::Dictionary(page_dict));
        self.page_ids.push(page_id);
        Ok(self.page_ids.len())
    }

    /// Store the wrapped template content once and share it between pages
    fn base_content_ref(&mut self, content: Vec<u8>) -> ObjectId {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        let key = hasher.finish();

        if let Some(id) = self.base_contents.get(&key) {
            return *id;
        }
        let id = self
            .inner
            .add_object(Stream::new(Dictionary::new(), content));
        self.base_contents.insert(key, id);
        id
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Save the document to bytes
    ///
    /// The first call fixes the page list; no pages can be appended after it.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        if self.page_ids.is_empty() {
            return Err(PdfError::SaveError("Document has no pages".to_string()));
        }
        if !self.finalized {
            self.finalize()?;
        }

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }

    fn finalize(&mut self) -> Result<()> {
        if self.font_used {
            self.embed_font()?;
        }

        let pages_dict = self
            .inner
            .get_object_mut(self.pages_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError("Pages object is not a dictionary".to_string()))?;
        pages_dict.set(
            "Kids",
            Object::Array(self.page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages_dict.set("Count", Object::Integer(self.page_ids.len() as i64));

        let catalog_id = catalog_id(&self.inner)?;
        let catalog = self
            .inner
            .get_object_mut(catalog_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?;
        for key in CATALOG_PAGE_REFERENCES {
            if catalog.remove(key).is_some() {
                log::debug!("Dropped catalog entry /{}", String::from_utf8_lossy(key));
            }
        }

        let pruned = self.inner.prune_objects();
        log::debug!("Pruned {} unreachable template objects", pruned.len());
        self.inner.renumber_objects();
        self.inner.compress();

        self.finalized = true;
        Ok(())
    }

    /// Write the overlay font into the id reserved for it
    fn embed_font(&mut self) -> Result<()> {
        match self.font.to_pdf_objects(&self.used_chars)? {
            FontObjects::Standard(dict) => {
                self.inner
                    .objects
                    .insert(self.font_id, Object::Dictionary(dict));
            }
            FontObjects::Embedded(objects) => {
                let font_file_id = self.inner.add_object(objects.font_file_stream);

                let mut descriptor = objects.font_descriptor;
                descriptor.set("FontFile2", Object::Reference(font_file_id));
                let descriptor_id = self.inner.add_object(descriptor);

                let mut cid_font = objects.cid_font;
                cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
                let cid_font_id = self.inner.add_object(cid_font);

                let tounicode_id = self.inner.add_object(objects.tounicode_stream);

                let mut type0 = objects.type0_font;
                type0.set(
                    "DescendantFonts",
                    Object::Array(vec![Object::Reference(cid_font_id)]),
                );
                type0.set("ToUnicode", Object::Reference(tounicode_id));
                self.inner
                    .objects
                    .insert(self.font_id, Object::Dictionary(type0));
            }
        }
        Ok(())
    }
}

fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?
        .as_reference()
        .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))
}

/// Find the page tree root through trailer -> Root -> Pages
fn page_tree_root(doc: &Document) -> Result<ObjectId> {
    let catalog = doc
        .get_object(catalog_id(doc)?)?
        .as_dict()
        .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?;
    catalog
        .get(b"Pages")
        .map_err(|_| PdfError::ParseError("Catalog missing Pages entry".to_string()))?
        .as_reference()
        .map_err(|_| PdfError::ParseError("Pages is not a reference".to_string()))
}

/// Clone a resources sub-dictionary, or start an empty one
fn resource_subdict(resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .and_then(Object::as_dict)
        .cloned()
        .unwrap_or_default()
}
