//! Label - batch label pages from a PDF template and CSV rows
//!
//! This crate provides:
//! - Percent-of-page geometry mapping
//! - Aspect-preserving barcode fitting
//! - Barcode text normalization and a raster barcode provider
//! - CSV data rows addressed by column name
//! - Per-row page rendering and batch composition
//!
//! # Example
//!
//! ```ignore
//! use label::{BatchComposer, DataTable, LabelLayout, RasterBarcodeProvider, RowRange};
//! use pdf_core::{PdfFont, TemplatePage};
//!
//! let template = TemplatePage::open("templates/Template.pdf")?;
//! let table = DataTable::from_path("data/Data.csv")?;
//! let provider = RasterBarcodeProvider::new();
//! let composer = BatchComposer::new(&template, LabelLayout::default(), PdfFont::helvetica(), &provider)?;
//!
//! let range = RowRange::full(table.len())?;
//! let output = composer.compose(&table, range, |p| println!("{}/{}", p.completed, p.total))?;
//! output.save("generated_labels.pdf")?;
//! println!("{}", output.summary());
//! ```

pub mod barcode;
pub mod composer;
pub mod config;
pub mod data;
pub mod fit;
mod generate;
pub mod geometry;
mod renderer;

pub use barcode::{
    normalize_barcode_text, BarcodeImage, BarcodeImageProvider, BarcodeOptions, BarcodeRequest,
    BarcodeSpec, RasterBarcodeProvider, Symbology, PLACEHOLDER_BARCODE,
};
pub use composer::{BatchComposer, BatchOutput, BatchRun, Progress, RowFailure, RowRange};
pub use config::{
    BarcodePlacement, BarcodeSettings, Field, FieldPlacement, LabelLayout, RenderConfig,
    TextColor,
};
pub use data::{DataRow, DataTable};
pub use fit::{fit_barcode, FittedSize};
pub use generate::{generate_labels, label_fonts, GenerateRequest};
pub use geometry::{to_absolute_x, to_absolute_y, PageGeometry};
pub use renderer::{RowOutcome, RowRenderer};

use thiserror::Error;

/// Errors that can occur while generating labels
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Failed to read template: {0}")]
    TemplateUnreadable(String),

    #[error("Failed to read data: {0}")]
    Data(String),

    #[error("Data has no rows")]
    EmptyData,

    #[error("Invalid row range {start}..={end} for {row_count} row(s)")]
    InvalidRange {
        start: usize,
        end: usize,
        row_count: usize,
    },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Layout JSON error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Barcode encoding failed: {0}")]
    Barcode(String),

    #[error("Invalid barcode image: {0}")]
    BarcodeImage(String),

    #[error("Barcode image has zero size ({width}x{height})")]
    ZeroSizedImage { width: u32, height: u32 },

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("Failed to write output: {0}")]
    Serialization(String),
}

impl LabelError {
    /// Whether this error stops a whole run
    ///
    /// Non-fatal errors are confined to a single row: the row is recorded as
    /// failed and the batch moves on.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LabelError::Barcode(_)
                | LabelError::BarcodeImage(_)
                | LabelError::ZeroSizedImage { .. }
                | LabelError::Pdf(_)
        )
    }
}

impl From<csv::Error> for LabelError {
    fn from(err: csv::Error) -> Self {
        LabelError::Data(err.to_string())
    }
}

/// Result type for label operations
pub type Result<T> = std::result::Result<T, LabelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_level_errors_are_not_fatal() {
        assert!(!LabelError::Barcode("bad".to_string()).is_fatal());
        assert!(!LabelError::ZeroSizedImage { width: 0, height: 10 }.is_fatal());
        assert!(!LabelError::Pdf(pdf_core::PdfError::ImageError("x".to_string())).is_fatal());
    }

    #[test]
    fn test_input_errors_are_fatal() {
        assert!(LabelError::EmptyData.is_fatal());
        assert!(LabelError::InvalidRange {
            start: 3,
            end: 2,
            row_count: 5
        }
        .is_fatal());
        assert!(LabelError::Serialization("disk full".to_string()).is_fatal());
    }

    #[test]
    fn test_invalid_range_message() {
        let err = LabelError::InvalidRange {
            start: 0,
            end: 4,
            row_count: 3,
        };
        assert_eq!(err.to_string(), "Invalid row range 0..=4 for 3 row(s)");
    }
}
