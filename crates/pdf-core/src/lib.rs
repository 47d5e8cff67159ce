//! PDF Core - Low-level PDF manipulation for label generation
//!
//! This crate provides functionality for:
//! - Loading a single-page PDF template and reading its page box
//! - Producing independent copies of the template page to draw on
//! - Drawing text (standard Helvetica or an embedded TrueType font)
//! - Placing raster images (JPEG, PNG)
//! - Collecting drawn pages into one output document
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Color, PdfDocument, PdfFont, TemplatePage};
//!
//! let template = TemplatePage::open("template.pdf")?;
//! let font = PdfFont::helvetica();
//! let mut doc = PdfDocument::from_template(&template, font.clone())?;
//!
//! let mut page = template.new_page();
//! page.insert_text(&font, "Hello, World!", 100.0, 700.0, 12.0, Color::black());
//! doc.append_page(page)?;
//! doc.save("output.pdf")?;
//! ```

mod document;
mod font;
mod image;
mod page;
mod template;
mod text;

pub use document::PdfDocument;
pub use font::{FontData, PdfFont, StandardFont};
pub use image::{get_dimensions, ImageDimensions, ImageXObject};
pub use page::{Color, PageCanvas};
pub use template::{MediaBox, TemplatePage};
pub use text::{encode_winansi_literal, generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;
