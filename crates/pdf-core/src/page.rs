//! Drawing surface for one output page

use crate::font::PdfFont;
use crate::image::{generate_image_operators, ImageXObject};
use crate::template::{displayed_size, MediaBox};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::Result;
use lopdf::Dictionary;
use std::collections::BTreeSet;

/// Resource name of the overlay font on every page
pub(crate) const OVERLAY_FONT_RESOURCE: &str = "LblF1";

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// An independent copy of the template page plus everything drawn on it
///
/// Coordinates passed to the drawing methods are in points with y growing
/// downward, as the page is displayed: `(page_box.x0, page_box.y0)` is the
/// top-left corner of the visible area whatever the page rotation. They are
/// converted to PDF user space here.
#[derive(Debug, Clone)]
pub struct PageCanvas {
    media_box: MediaBox,
    page_box: MediaBox,
    rotation: u16,
    attributes: Dictionary,
    base_content: Vec<u8>,
    resources: Dictionary,
    overlay: Vec<u8>,
    images: Vec<(String, ImageXObject)>,
    used_chars: BTreeSet<char>,
    uses_font: bool,
}

impl PageCanvas {
    pub(crate) fn new(
        media_box: MediaBox,
        page_box: MediaBox,
        rotation: u16,
        attributes: Dictionary,
        base_content: Vec<u8>,
        resources: Dictionary,
    ) -> Self {
        Self {
            media_box,
            page_box,
            rotation,
            attributes,
            base_content,
            resources,
            overlay: Vec::new(),
            images: Vec::new(),
            used_chars: BTreeSet::new(),
            uses_font: false,
        }
    }

    /// Convert a displayed top-origin y coordinate into a bottom-origin y
    ///
    /// Unrotated pages draw straight into user space. Rotated pages draw
    /// into an upright frame that [`PageParts::overlay_content`] maps back
    /// onto the page.
    fn pdf_y(&self, y: f64) -> f64 {
        let (_, height) = displayed_size(self.page_box, self.rotation);
        let top = match self.rotation {
            0 => self.page_box.y0 + height,
            _ => height,
        };
        top - (y - self.page_box.y0)
    }

    fn pdf_x(&self, x: f64) -> f64 {
        match self.rotation {
            0 => x,
            _ => x - self.page_box.x0,
        }
    }

    /// Draw text with its baseline starting at `(x, y)`
    ///
    /// # Arguments
    /// * `font` - Font to draw with (must be the font the output document uses)
    /// * `text` - Text to draw; empty text draws nothing
    /// * `x` - X coordinate in points
    /// * `y` - Baseline Y coordinate in points (from top)
    /// * `font_size` - Font size in points
    /// * `color` - Fill color
    pub fn insert_text(
        &mut self,
        font: &PdfFont,
        text: &str,
        x: f64,
        y: f64,
        font_size: f32,
        color: Color,
    ) {
        if text.is_empty() {
            return;
        }

        let encoded = font.encode(text);
        if let PdfFont::Embedded(data) = font {
            for c in text.chars().filter(|c| !data.has_glyph(*c)) {
                log::debug!("Font {} has no glyph for {c:?}", data.name);
            }
            self.used_chars.extend(text.chars());
        }

        let ctx = TextRenderContext {
            font_name: OVERLAY_FONT_RESOURCE.to_string(),
            font_size,
            color,
        };
        let operators = generate_text_operators(&encoded, self.pdf_x(x), self.pdf_y(y), &ctx);
        self.overlay.extend_from_slice(&operators);
        self.uses_font = true;
    }

    /// Place a raster image with its top-left corner at `(x, y)`
    ///
    /// # Arguments
    /// * `data` - Image file bytes (JPEG or PNG)
    /// * `x` - X coordinate in points
    /// * `y` - Y coordinate in points (from top)
    /// * `width` - Placed width in points
    /// * `height` - Placed height in points
    pub fn insert_image(
        &mut self,
        data: &[u8],
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let xobject = ImageXObject::from_jpeg(data).or_else(|_| ImageXObject::from_png(data))?;

        let resource_name = format!("LblIm{}", self.images.len() + 1);
        let pdf_y = self.pdf_y(y + height);
        let operators =
            generate_image_operators(&resource_name, self.pdf_x(x), pdf_y, width, height);
        self.overlay.extend_from_slice(&operators);
        self.images.push((resource_name, xobject));

        Ok(())
    }

    /// Consume the canvas for assembly into a document
    pub(crate) fn into_parts(self) -> PageParts {
        PageParts {
            media_box: self.media_box,
            page_box: self.page_box,
            rotation: self.rotation,
            attributes: self.attributes,
            base_content: self.base_content,
            resources: self.resources,
            overlay: self.overlay,
            images: self.images,
            used_chars: self.used_chars,
            uses_font: self.uses_font,
        }
    }
}

/// The pieces of a finished canvas, consumed by `PdfDocument::append_page`
pub(crate) struct PageParts {
    pub media_box: MediaBox,
    pub page_box: MediaBox,
    pub rotation: u16,
    pub attributes: Dictionary,
    pub base_content: Vec<u8>,
    pub resources: Dictionary,
    pub overlay: Vec<u8>,
    pub images: Vec<(String, ImageXObject)>,
    pub used_chars: BTreeSet<char>,
    pub uses_font: bool,
}

impl PageParts {
    /// Template content isolated in its own graphics state, so the overlay
    /// always starts from the default coordinate system
    pub fn wrapped_base(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(self.base_content.len() + 6);
        content.extend_from_slice(b"q\n");
        content.extend_from_slice(&self.base_content);
        content.extend_from_slice(b"\nQ\n");
        content
    }

    /// Overlay operators, turned onto the page for rotated templates
    pub fn overlay_content(&self) -> Vec<u8> {
        let Some(matrix) = self.upright_matrix() else {
            return self.overlay.clone();
        };

        let [a, b, c, d, e, f] = matrix;
        let mut content = format!("q\n{a} {b} {c} {d} {e} {f} cm\n").into_bytes();
        content.extend_from_slice(&self.overlay);
        content.extend_from_slice(b"Q\n");
        content
    }

    /// Matrix from the upright drawing frame into user space
    ///
    /// The frame has its origin at the displayed bottom-left corner of the
    /// visible area. `/Rotate` turns the page clockwise for display.
    fn upright_matrix(&self) -> Option<[f64; 6]> {
        let MediaBox { x0, y0, x1, y1 } = self.page_box;
        match self.rotation {
            90 => Some([0.0, 1.0, -1.0, 0.0, x1, y0]),
            180 => Some([-1.0, 0.0, 0.0, -1.0, x1, y1]),
            270 => Some([0.0, -1.0, 1.0, 0.0, x0, y1]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_canvas() -> PageCanvas {
        let media_box = MediaBox::new(0.0, 0.0, 200.0, 100.0);
        PageCanvas::new(
            media_box,
            media_box,
            0,
            Dictionary::new(),
            b"0 0 m 10 10 l S".to_vec(),
            Dictionary::new(),
        )
    }

    #[test]
    fn test_insert_text_flips_y() {
        let mut canvas = blank_canvas();
        canvas.insert_text(&PdfFont::helvetica(), "Hi", 20.0, 30.0, 12.0, Color::black());

        let parts = canvas.into_parts();
        let overlay = String::from_utf8(parts.overlay).unwrap();
        assert!(overlay.contains("/LblF1 12 Tf"));
        assert!(overlay.contains("20 70 Td"));
        assert!(overlay.contains("(Hi) Tj"));
        assert!(parts.uses_font);
    }

    #[test]
    fn test_insert_empty_text_draws_nothing() {
        let mut canvas = blank_canvas();
        canvas.insert_text(&PdfFont::helvetica(), "", 20.0, 30.0, 12.0, Color::black());

        let parts = canvas.into_parts();
        assert!(parts.overlay.is_empty());
        assert!(!parts.uses_font);
    }

    fn canvas_on(page_box: MediaBox, rotation: u16) -> PageCanvas {
        PageCanvas::new(
            MediaBox::new(0.0, 0.0, 300.0, 200.0),
            page_box,
            rotation,
            Dictionary::new(),
            Vec::new(),
            Dictionary::new(),
        )
    }

    #[test]
    fn test_pdf_y_respects_box_offset() {
        let canvas = canvas_on(MediaBox::new(0.0, 50.0, 200.0, 150.0), 0);
        assert_eq!(canvas.pdf_y(50.0), 150.0);
        assert_eq!(canvas.pdf_y(150.0), 50.0);
    }

    #[test]
    fn test_crop_box_top_left_is_the_origin() {
        let mut canvas = canvas_on(MediaBox::new(20.0, 20.0, 280.0, 180.0), 0);
        canvas.insert_text(&PdfFont::helvetica(), "A", 20.0, 20.0, 10.0, Color::black());

        let parts = canvas.into_parts();
        let overlay = String::from_utf8(parts.overlay_content()).unwrap();
        assert!(overlay.contains("20 180 Td"));
        assert!(!overlay.contains(" cm"));
    }

    /// Apply a `cm` matrix to a point
    fn transform(m: [f64; 6], x: f64, y: f64) -> (f64, f64) {
        (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
    }

    #[test]
    fn test_rotated_corners_land_on_displayed_corners() {
        // 300x200 box; rotated by 90 it displays as 200 wide, 300 high
        let page_box = MediaBox::new(0.0, 0.0, 300.0, 200.0);
        let canvas = canvas_on(page_box, 90);
        let m = canvas.clone().into_parts().upright_matrix().unwrap();

        // Displayed top-left is the user-space bottom-left after a
        // clockwise turn
        let top_left = transform(m, canvas.pdf_x(0.0), canvas.pdf_y(0.0));
        assert_eq!(top_left, (0.0, 0.0));
        // Displayed top-right (x = 200) runs up the left edge
        let top_right = transform(m, canvas.pdf_x(200.0), canvas.pdf_y(0.0));
        assert_eq!(top_right, (0.0, 200.0));
        // Displayed bottom-left (y = 300) is the user-space bottom-right
        let bottom_left = transform(m, canvas.pdf_x(0.0), canvas.pdf_y(300.0));
        assert_eq!(bottom_left, (300.0, 0.0));
    }

    #[test]
    fn test_rotation_180_and_270_corners() {
        let page_box = MediaBox::new(10.0, 20.0, 310.0, 220.0);

        let canvas = canvas_on(page_box, 180);
        let m = canvas.clone().into_parts().upright_matrix().unwrap();
        let top_left = transform(m, canvas.pdf_x(10.0), canvas.pdf_y(20.0));
        assert_eq!(top_left, (310.0, 20.0));

        let canvas = canvas_on(page_box, 270);
        let m = canvas.clone().into_parts().upright_matrix().unwrap();
        let top_left = transform(m, canvas.pdf_x(10.0), canvas.pdf_y(20.0));
        assert_eq!(top_left, (310.0, 220.0));
    }

    #[test]
    fn test_rotated_overlay_is_wrapped_in_matrix() {
        let mut canvas = canvas_on(MediaBox::new(0.0, 0.0, 300.0, 200.0), 90);
        canvas.insert_text(&PdfFont::helvetica(), "A", 10.0, 30.0, 10.0, Color::black());

        let overlay = String::from_utf8(canvas.into_parts().overlay_content()).unwrap();
        assert!(overlay.starts_with("q\n0 1 -1 0 300 0 cm\n"));
        assert!(overlay.contains("10 270 Td"));
        assert!(overlay.ends_with("Q\n"));
    }

    #[test]
    fn test_insert_image_rejects_garbage() {
        let mut canvas = blank_canvas();
        assert!(canvas
            .insert_image(&[1, 2, 3, 4, 5, 6, 7, 8, 9], 0.0, 0.0, 10.0, 10.0)
            .is_err());
    }

    #[test]
    fn test_content_wraps_template_in_graphics_state() {
        let parts = blank_canvas().into_parts();
        let content = String::from_utf8(parts.wrapped_base()).unwrap();
        assert_eq!(content, "q\n0 0 m 10 10 l S\nQ\n");
    }
}
