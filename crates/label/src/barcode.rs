//! Barcode text normalization and raster barcode images
//!
//! Symbol encoding is done by `barcoders`; this module turns the encoded
//! modules into a 300 dpi grayscale PNG: 0.2 mm modules, a quiet zone on
//! both sides, bars `module_height` mm tall and an optional human-readable
//! caption 5 mm below the bars.

use crate::{LabelError, Result};
use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use barcoders::sym::code128::Code128;
use barcoders::sym::ean13::EAN13;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

/// Text used when a row has no barcode value
pub const PLACEHOLDER_BARCODE: &str = "000000000000";

const EAN13_DATA_DIGITS: usize = 12;

const DPI: f64 = 300.0;
const MODULE_WIDTH_MM: f64 = 0.2;
const MARGIN_MM: f64 = 1.0;
const TEXT_DISTANCE_MM: f64 = 5.0;

/// Code 128 character set markers understood by `barcoders`
const CODE128_SET_A: char = 'À';
const CODE128_SET_B: char = 'Ɓ';

/// Supported barcode symbologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbology {
    #[default]
    Code128,
    Ean13,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Code128 => write!(f, "CODE128"),
            Symbology::Ean13 => write!(f, "EAN13"),
        }
    }
}

impl FromStr for Symbology {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CODE128" => Ok(Symbology::Code128),
            "EAN13" => Ok(Symbology::Ean13),
            other => Err(LabelError::InvalidLayout(format!(
                "Unknown barcode type '{other}' (expected CODE128 or EAN13)"
            ))),
        }
    }
}

/// Normalize a raw BARCODE cell for the given symbology
///
/// Empty or whitespace-only text becomes [`PLACEHOLDER_BARCODE`]. EAN-13
/// keeps digits only, left-padded with zeros and cut to 12 digits (the
/// check digit is computed by the encoder). Code 128 text is unchanged.
pub fn normalize_barcode_text(raw: &str, symbology: Symbology) -> String {
    if raw.trim().is_empty() {
        return PLACEHOLDER_BARCODE.to_string();
    }

    match symbology {
        Symbology::Code128 => raw.to_string(),
        Symbology::Ean13 => {
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            let padded = format!("{digits:0>width$}", width = EAN13_DATA_DIGITS);
            padded.chars().take(EAN13_DATA_DIGITS).collect()
        }
    }
}

/// Code 128 data for `barcoders`: set B, switching to set A around control
/// characters
///
/// Characters neither set can encode are passed through and rejected by
/// the encoder.
fn code128_data(text: &str) -> String {
    let in_a = |c: char| (c as u32) < 0x60;
    let in_b = |c: char| (0x20..0x7f).contains(&(c as u32));

    let mut current = match text.chars().next() {
        Some(c) if in_a(c) && !in_b(c) => CODE128_SET_A,
        _ => CODE128_SET_B,
    };
    let mut data = String::with_capacity(text.len() + 2);
    data.push(current);

    for c in text.chars() {
        let wanted = match current {
            CODE128_SET_A if !in_a(c) && in_b(c) => CODE128_SET_B,
            CODE128_SET_B if !in_b(c) && in_a(c) => CODE128_SET_A,
            _ => current,
        };
        if wanted != current {
            data.push(wanted);
            current = wanted;
        }
        data.push(c);
    }
    data
}

/// Check digit for 12 EAN-13 data digits
fn ean13_check_digit(digits: &str) -> Option<u32> {
    let sum = digits.chars().enumerate().try_fold(0, |acc, (i, c)| {
        let d = c.to_digit(10)?;
        Some(acc + if i % 2 == 0 { d } else { d * 3 })
    })?;
    Some((10 - sum % 10) % 10)
}

/// The barcode part of a row: what to encode and how
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeSpec {
    pub raw_text: String,
    pub symbology: Symbology,
    pub include_human_readable_text: bool,
}

impl BarcodeSpec {
    /// Build the provider request: normalized text plus the fixed writer options
    pub fn request(&self) -> BarcodeRequest {
        BarcodeRequest {
            text: normalize_barcode_text(&self.raw_text, self.symbology),
            symbology: self.symbology,
            options: BarcodeOptions {
                include_text: self.include_human_readable_text,
                ..BarcodeOptions::default()
            },
        }
    }
}

/// Writer options sent with every barcode request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarcodeOptions {
    pub include_text: bool,
    /// Blank space left and right of the bars, in mm
    pub quiet_zone: f64,
    /// Caption size in points
    pub text_font_size: f32,
    /// Bar height in mm
    pub module_height: f64,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            include_text: true,
            quiet_zone: 4.0,
            text_font_size: 10.0,
            module_height: 15.0,
        }
    }
}

/// A request for one barcode image
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeRequest {
    /// Normalized text
    pub text: String,
    pub symbology: Symbology,
    pub options: BarcodeOptions,
}

/// A rendered barcode raster
#[derive(Debug, Clone)]
pub struct BarcodeImage {
    /// PNG (or JPEG) file bytes
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Source of barcode raster images
pub trait BarcodeImageProvider {
    /// Encode and rasterize one barcode
    fn render(&self, request: &BarcodeRequest) -> Result<BarcodeImage>;

    /// Whether requested captions are actually drawn
    fn supports_caption(&self) -> bool {
        true
    }
}

/// Barcode provider backed by `barcoders` and `image`
///
/// Captions need a TrueType font; without one they are left out.
#[derive(Clone, Default)]
pub struct RasterBarcodeProvider {
    caption_font: Option<FontArc>,
}

impl fmt::Debug for RasterBarcodeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterBarcodeProvider")
            .field("caption_font", &self.caption_font.is_some())
            .finish()
    }
}

impl RasterBarcodeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a TrueType font for human-readable captions
    pub fn with_caption_font(mut self, ttf_data: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(ttf_data)
            .map_err(|e| LabelError::Font(format!("Invalid caption font: {e}")))?;
        self.caption_font = Some(font);
        Ok(self)
    }

    fn encode(request: &BarcodeRequest) -> Result<(Vec<u8>, String)> {
        match request.symbology {
            Symbology::Code128 => {
                let code = Code128::new(code128_data(&request.text)).map_err(|e| {
                    LabelError::Barcode(format!("CODE128 '{}': {e}", request.text))
                })?;
                Ok((code.encode(), request.text.clone()))
            }
            Symbology::Ean13 => {
                let code = EAN13::new(request.text.as_str()).map_err(|e| {
                    LabelError::Barcode(format!("EAN13 '{}': {e}", request.text))
                })?;
                let check = ean13_check_digit(&request.text).ok_or_else(|| {
                    LabelError::Barcode(format!("EAN13 '{}': not all digits", request.text))
                })?;
                Ok((code.encode(), format!("{}{check}", request.text)))
            }
        }
    }
}

/// Draw `text` horizontally centred with its top at `top`
fn draw_caption(canvas: &mut GrayImage, font: &FontArc, text: &str, top: f32, size_px: f32) {
    let scaled = font.as_scaled(PxScale::from(size_px));
    let advance: f32 = text
        .chars()
        .map(|c| scaled.h_advance(font.glyph_id(c)))
        .sum();

    let mut caret = (canvas.width() as f32 - advance) / 2.0;
    let baseline = top + scaled.ascent();

    for c in text.chars() {
        let id = font.glyph_id(c);
        let glyph = id.with_scale_and_position(scaled.scale(), point(caret, baseline));
        caret += scaled.h_advance(id);

        let Some(outline) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outline.px_bounds();
        outline.draw(|x, y, coverage| {
            let px = bounds.min.x as i64 + x as i64;
            let py = bounds.min.y as i64 + y as i64;
            if px < 0 || py < 0 || px >= canvas.width() as i64 || py >= canvas.height() as i64 {
                return;
            }
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            let ink = (255.0 * coverage.clamp(0.0, 1.0)) as u8;
            pixel.0[0] = pixel.0[0].saturating_sub(ink);
        });
    }
}

fn mm_to_px(mm: f64) -> u32 {
    (mm * DPI / 25.4).round().max(0.0) as u32
}

fn pt_to_px(pt: f32) -> f32 {
    pt * DPI as f32 / 72.0
}

impl BarcodeImageProvider for RasterBarcodeProvider {
    fn render(&self, request: &BarcodeRequest) -> Result<BarcodeImage> {
        let (modules, caption) = Self::encode(request)?;
        let options = request.options;

        let module_px = mm_to_px(MODULE_WIDTH_MM).max(1);
        let quiet_px = mm_to_px(options.quiet_zone);
        let margin_px = mm_to_px(MARGIN_MM);
        let bar_px = mm_to_px(options.module_height).max(1);

        let caption_font = if options.include_text {
            self.caption_font.as_ref()
        } else {
            None
        };
        let caption_px = pt_to_px(options.text_font_size);
        let caption_area = match caption_font {
            Some(_) => mm_to_px(TEXT_DISTANCE_MM) + caption_px.ceil() as u32,
            None => 0,
        };

        let width = quiet_px * 2 + module_px * modules.len() as u32;
        let height = margin_px * 2 + bar_px + caption_area;
        let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));

        for (i, _) in modules.iter().enumerate().filter(|(_, m)| **m == 1) {
            let x0 = quiet_px + i as u32 * module_px;
            for x in x0..x0 + module_px {
                for y in margin_px..margin_px + bar_px {
                    canvas.put_pixel(x, y, Luma([0]));
                }
            }
        }

        if let Some(font) = caption_font {
            // Caption is centred on the text distance line
            let bars_bottom = (margin_px + bar_px) as f32;
            let top = bars_bottom + mm_to_px(TEXT_DISTANCE_MM) as f32 - caption_px / 2.0;
            draw_caption(&mut canvas, font, &caption, top, caption_px);
        } else if options.include_text {
            log::debug!("No caption font; barcode '{}' drawn without text", request.text);
        }

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(canvas)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| LabelError::BarcodeImage(e.to_string()))?;

        Ok(BarcodeImage { png, width, height })
    }

    fn supports_caption(&self) -> bool {
        self.caption_font.is_some()
    }
}
