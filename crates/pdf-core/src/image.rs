//! Raster images placed on label pages

use crate::{PdfError, Result};
use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Object, Stream};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Raster formats that can be embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RasterFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
fn sniff_format(data: &[u8]) -> Result<RasterFormat> {
    if data.len() < 8 {
        return Err(PdfError::ImageError("Image data too short".to_string()));
    }
    if data[..3] == [0xFF, 0xD8, 0xFF] {
        return Ok(RasterFormat::Jpeg);
    }
    if data[..8] == PNG_SIGNATURE {
        return Ok(RasterFormat::Png);
    }
    Err(PdfError::ImageError("Unknown image format".to_string()))
}

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Read pixel dimensions from the image header without decoding
pub fn get_dimensions(data: &[u8]) -> Result<ImageDimensions> {
    match sniff_format(data)? {
        RasterFormat::Jpeg => {
            let (dims, _) = jpeg_frame_header(data)?;
            Ok(dims)
        }
        RasterFormat::Png => png_header_dimensions(data),
    }
}

/// Scan for the first SOF segment: returns dimensions and component count
fn jpeg_frame_header(data: &[u8]) -> Result<(ImageDimensions, u8)> {
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];
        // C4 (DHT), C8 (JPG) and CC (DAC) share the range but are not frames
        if (0xC0..=0xCF).contains(&marker) && ![0xC4, 0xC8, 0xCC].contains(&marker) {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Ok((ImageDimensions { width, height }, data[i + 9]));
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(PdfError::ImageError("Could not parse JPEG header".to_string()))
}

fn png_header_dimensions(data: &[u8]) -> Result<ImageDimensions> {
    if data.len() < 24 {
        return Err(PdfError::ImageError("PNG data too short".to_string()));
    }
    if &data[12..16] != b"IHDR" {
        return Err(PdfError::ImageError("Invalid PNG: IHDR not found".to_string()));
    }

    Ok(ImageDimensions {
        width: u32::from_be_bytes([data[16], data[17], data[18], data[19]]),
        height: u32::from_be_bytes([data[20], data[21], data[22], data[23]]),
    })
}

/// An image ready to be written as a PDF XObject
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    /// "DeviceGray" or "DeviceRGB"
    pub color_space: &'static str,
    /// "DCTDecode" for JPEG passthrough, "FlateDecode" for decoded rasters
    pub filter: &'static str,
    /// Encoded sample data
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Embed a JPEG as-is with DCTDecode
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        if sniff_format(data)? != RasterFormat::Jpeg {
            return Err(PdfError::ImageError("Not a JPEG image".to_string()));
        }
        let (dims, components) = jpeg_frame_header(data)?;

        Ok(Self {
            width: dims.width,
            height: dims.height,
            color_space: if components == 1 { "DeviceGray" } else { "DeviceRGB" },
            filter: "DCTDecode",
            data: data.to_vec(),
        })
    }

    /// Decode a PNG and re-encode its samples with FlateDecode
    ///
    /// Grayscale images stay single-channel. Transparent pixels are
    /// composited onto white.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        if sniff_format(data)? != RasterFormat::Png {
            return Err(PdfError::ImageError("Not a PNG image".to_string()));
        }
        let image = image::load_from_memory_with_format(data, ImageFormat::Png)?;
        let (width, height) = (image.width(), image.height());

        let (samples, color_space) = flatten_onto_white(&image);
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&samples)?;

        Ok(Self {
            width,
            height,
            color_space,
            filter: "FlateDecode",
            data: encoder.finish()?,
        })
    }

    /// Hash of the encoded data, used to share identical images between pages
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.width.hash(&mut hasher);
        self.height.hash(&mut hasher);
        self.data.hash(&mut hasher);
        hasher.finish()
    }

    /// Convert to lopdf Stream object
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set("ColorSpace", Object::Name(self.color_space.as_bytes().to_vec()));
        dict.set("BitsPerComponent", 8i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));

        // Data is already encoded; keep lopdf from compressing it again
        Stream::new(dict, self.data.clone()).with_compression(false)
    }
}

fn blend(value: u8, alpha: u8) -> u8 {
    let a = alpha as f32 / 255.0;
    (value as f32 * a + 255.0 * (1.0 - a)) as u8
}

fn flatten_onto_white(image: &DynamicImage) -> (Vec<u8>, &'static str) {
    use image::ColorType;

    match image.color() {
        ColorType::L8 | ColorType::L16 => (image.to_luma8().into_raw(), "DeviceGray"),
        ColorType::La8 | ColorType::La16 => {
            let samples = image
                .to_luma_alpha8()
                .pixels()
                .map(|p| blend(p[0], p[1]))
                .collect();
            (samples, "DeviceGray")
        }
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => {
            let rgba = image.to_rgba8();
            let mut samples = Vec::with_capacity((rgba.width() * rgba.height() * 3) as usize);
            for p in rgba.pixels() {
                samples.extend_from_slice(&[blend(p[0], p[3]), blend(p[1], p[3]), blend(p[2], p[3])]);
            }
            (samples, "DeviceRGB")
        }
        _ => (image.to_rgb8().into_raw(), "DeviceRGB"),
    }
}

/// Generate operators to draw an image XObject
///
/// `(x, y)` is the bottom-left corner in PDF user space.
pub fn generate_image_operators(image_name: &str, x: f64, y: f64, width: f64, height: f64) -> Vec<u8> {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}
