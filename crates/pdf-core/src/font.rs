//! Font handling for PDF documents

use crate::text::encode_winansi_literal;
use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

/// The standard 14 fonts used for label text (no embedding needed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
}

impl StandardFont {
    /// PostScript name used as BaseFont
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
        }
    }
}

/// Font used to draw overlay text
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// One of the standard fonts, WinAnsi encoded
    Standard(StandardFont),
    /// A TrueType font embedded as Type0/CIDFontType2 with Identity-H encoding
    Embedded(Arc<FontData>),
}

impl PdfFont {
    /// Standard Helvetica
    pub fn helvetica() -> Self {
        PdfFont::Standard(StandardFont::Helvetica)
    }

    /// Parse a TrueType font for embedding
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        Ok(PdfFont::Embedded(Arc::new(FontData::from_ttf(name, ttf_data)?)))
    }

    /// Encode text as a string operand for the Tj operator
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            PdfFont::Standard(_) => encode_winansi_literal(text),
            PdfFont::Embedded(data) => data.encode_text_hex(text).into_bytes(),
        }
    }

    /// Build the font dictionary (and any supporting objects) for a document
    ///
    /// `used_chars` lists every character drawn with this font; it drives the
    /// glyph widths and the ToUnicode map of embedded fonts.
    pub(crate) fn to_pdf_objects(&self, used_chars: &BTreeSet<char>) -> Result<FontObjects> {
        match self {
            PdfFont::Standard(font) => Ok(FontObjects::Standard(Dictionary::from_iter(vec![
                ("Type", "Font".into()),
                ("Subtype", "Type1".into()),
                ("BaseFont", font.base_font().into()),
                ("Encoding", "WinAnsiEncoding".into()),
            ]))),
            PdfFont::Embedded(data) => data.to_pdf_objects(used_chars).map(FontObjects::Embedded),
        }
    }
}

/// PDF objects generated for a font
pub(crate) enum FontObjects {
    Standard(Dictionary),
    Embedded(EmbeddedFontObjects),
}

/// PDF objects generated for font embedding
pub(crate) struct EmbeddedFontObjects {
    /// Type0 font dictionary
    pub type0_font: Dictionary,
    /// CIDFont Type2 dictionary
    pub cid_font: Dictionary,
    /// Font descriptor dictionary
    pub font_descriptor: Dictionary,
    /// Font file stream (TTF data)
    pub font_file_stream: Stream,
    /// ToUnicode CMap stream
    pub tounicode_stream: Stream,
}

/// Font data structure for embedded fonts
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw TTF data
    ttf_data: Vec<u8>,
}

impl FontData {
    /// Create font data from TTF bytes
    ///
    /// # Arguments
    /// * `name` - Font identifier (used as BaseFont)
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{e:?}")))?;

        Ok(Self {
            name: sanitize_font_name(name),
            ttf_data: ttf_data.to_vec(),
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.ttf_data, 0).ok()
    }

    /// Get glyph ID for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face()
            .and_then(|face| face.glyph_index(c).map(|id| id.0))
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Get font units per em
    pub fn units_per_em(&self) -> u16 {
        self.face().map(|face| face.units_per_em()).unwrap_or(1000)
    }

    /// Get font ascender
    pub fn ascender(&self) -> i16 {
        self.face().map(|face| face.ascender()).unwrap_or(800)
    }

    /// Get font descender
    pub fn descender(&self) -> i16 {
        self.face().map(|face| face.descender()).unwrap_or(-200)
    }

    /// Encode text as a hex string of glyph IDs for the Tj operator
    ///
    /// Characters missing from the font map to glyph 0.
    pub fn encode_text_hex(&self, text: &str) -> String {
        let face = self.face();
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for c in text.chars() {
            let gid = face.as_ref().and_then(|f| f.glyph_index(c)).map_or(0, |id| id.0);
            let _ = write!(hex, "{gid:04X}");
        }
        hex.push('>');
        hex
    }

    /// Generate all PDF objects needed to embed this font
    fn to_pdf_objects(&self, used_chars: &BTreeSet<char>) -> Result<EmbeddedFontObjects> {
        let font_name = Object::Name(self.name.clone().into_bytes());

        let tounicode_content = self.generate_tounicode_cmap(used_chars);
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![("Type", "CMap".into())]),
            tounicode_content.into_bytes(),
        );

        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![("Length1", (self.ttf_data.len() as i64).into())]),
            self.ttf_data.clone(),
        );

        // Metrics are expressed in glyph space (1000 units per em)
        let scale = 1000.0 / self.units_per_em() as f64;
        let ascent = (self.ascender() as f64 * scale).round() as i64;
        let descent = (self.descender() as f64 * scale).round() as i64;

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // Symbolic font
            (
                "FontBBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(descent),
                    Object::Integer(1000),
                    Object::Integer(ascent),
                ]),
            ),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascent.into()),
            ("Descent", descent.into()),
            ("CapHeight", ascent.into()),
            ("StemV", 80.into()),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("CIDToGIDMap", "Identity".into()),
            ("W", Object::Array(self.generate_widths_array(used_chars))),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
        ]);

        Ok(EmbeddedFontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        })
    }

    /// Generate /W array for glyph widths
    fn generate_widths_array(&self, used_chars: &BTreeSet<char>) -> Vec<Object> {
        let mut widths = Vec::new();
        let face = match self.face() {
            Some(f) => f,
            None => return widths,
        };
        let scale = 1000.0 / face.units_per_em() as f64;

        let mut gids: Vec<u16> = used_chars
            .iter()
            .filter_map(|&c| face.glyph_index(c).map(|id| id.0))
            .collect();
        gids.sort_unstable();
        gids.dedup();

        // Individual mapping format: [gid1 [width1] gid2 [width2] ...]
        for gid in gids {
            let advance = face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(1000);
            let width = (advance as f64 * scale).round() as i64;
            widths.push(Object::Integer(gid as i64));
            widths.push(Object::Array(vec![Object::Integer(width)]));
        }

        widths
    }

    /// ToUnicode CMap mapping each used glyph back to its character
    fn generate_tounicode_cmap(&self, used_chars: &BTreeSet<char>) -> String {
        let mut cmap = String::from(TOUNICODE_HEADER);

        let mappings: Vec<(u16, char)> = match self.face() {
            Some(face) => used_chars
                .iter()
                .filter_map(|&c| face.glyph_index(c).map(|gid| (gid.0, c)))
                .collect(),
            None => Vec::new(),
        };

        // At most 100 entries per bfchar block
        for block in mappings.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", block.len());
            for (gid, c) in block {
                let mut units = [0u16; 2];
                let _ = write!(cmap, "<{gid:04X}> <");
                for unit in c.encode_utf16(&mut units).iter() {
                    let _ = write!(cmap, "{unit:04X}");
                }
                cmap.push_str(">\n");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(TOUNICODE_FOOTER);
        cmap
    }
}

const TOUNICODE_HEADER: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

const TOUNICODE_FOOTER: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// PDF names cannot contain whitespace or delimiters
fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "LabelFont".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_without_face() -> FontData {
        FontData {
            name: "test".to_string(),
            ttf_data: vec![0u8; 100],
        }
    }

    #[test]
    fn test_from_ttf_rejects_invalid_data() {
        let result = FontData::from_ttf("broken", &[0u8; 100]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
    }

    #[test]
    fn test_metrics_defaults_without_face() {
        let font = font_without_face();
        assert_eq!(font.units_per_em(), 1000);
        assert_eq!(font.ascender(), 800);
        assert_eq!(font.descender(), -200);
        assert!(!font.has_glyph('A'));
    }

    #[test]
    fn test_encode_text_hex_no_face() {
        let font = font_without_face();
        assert_eq!(font.encode_text_hex(""), "<>");
        assert_eq!(font.encode_text_hex("AB"), "<00000000>");
    }

    #[test]
    fn test_tounicode_cmap_without_face_has_no_mappings() {
        let font = font_without_face();
        let used: BTreeSet<char> = "AB".chars().collect();
        let cmap = font.generate_tounicode_cmap(&used);

        assert!(cmap.contains("/CIDInit"));
        assert!(cmap.contains("begincmap"));
        assert!(cmap.contains("endcmap"));
        assert!(!cmap.contains("beginbfchar"));
    }

    #[test]
    fn test_embedded_objects_without_face() {
        let font = font_without_face();
        let used: BTreeSet<char> = "Hello".chars().collect();
        let objects = font.to_pdf_objects(&used).unwrap();

        assert_eq!(
            objects.type0_font.get(b"Encoding").unwrap().as_name().unwrap(),
            b"Identity-H"
        );
        assert!(!objects.cid_font.is_empty());
        assert!(!objects.font_descriptor.is_empty());
        assert!(!objects.font_file_stream.content.is_empty());
        assert!(!objects.tounicode_stream.content.is_empty());
    }

    #[test]
    fn test_standard_font_dictionary() {
        let objects = PdfFont::helvetica()
            .to_pdf_objects(&BTreeSet::new())
            .unwrap();
        match objects {
            FontObjects::Standard(dict) => {
                assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
                assert_eq!(
                    dict.get(b"Encoding").unwrap().as_name().unwrap(),
                    b"WinAnsiEncoding"
                );
            }
            FontObjects::Embedded(_) => panic!("expected a standard font"),
        }
    }

    #[test]
    fn test_standard_font_encodes_literal() {
        assert_eq!(PdfFont::helvetica().encode("Red"), b"(Red)".to_vec());
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(sanitize_font_name("Noto Sans (Bold)"), "NotoSansBold");
        assert_eq!(sanitize_font_name("   "), "LabelFont");
    }
}
