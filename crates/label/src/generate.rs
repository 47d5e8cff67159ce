//! File-to-file label generation

use crate::barcode::RasterBarcodeProvider;
use crate::composer::{BatchComposer, BatchOutput, Progress, RowRange};
use crate::config::LabelLayout;
use crate::data::DataTable;
use crate::{LabelError, Result};
use pdf_core::{PdfFont, TemplatePage};
use std::path::PathBuf;

/// Everything needed to turn a template and a CSV file into a label PDF
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub template_path: PathBuf,
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    pub layout: LabelLayout,
    /// First row (1-indexed); defaults to 1
    pub start: Option<usize>,
    /// Last row (inclusive); defaults to the last row
    pub end: Option<usize>,
}

/// Build the text font and barcode provider for an optional TrueType font
///
/// Without a font, text uses Helvetica and barcodes carry no caption.
pub fn label_fonts(ttf_data: Option<Vec<u8>>, name: &str) -> Result<(PdfFont, RasterBarcodeProvider)> {
    match ttf_data {
        Some(data) => {
            let font = PdfFont::from_ttf(name, &data).map_err(|e| LabelError::Font(e.to_string()))?;
            let provider = RasterBarcodeProvider::new().with_caption_font(data)?;
            Ok((font, provider))
        }
        None => Ok((PdfFont::helvetica(), RasterBarcodeProvider::new())),
    }
}

/// Load the inputs, render the selected rows and write the output file
///
/// Input problems (unreadable template or CSV, bad range or layout) fail
/// before any row is rendered. Rows that fail are listed in the returned
/// summary and skipped.
pub fn generate_labels<F>(request: &GenerateRequest, on_progress: F) -> Result<BatchOutput>
where
    F: FnMut(Progress),
{
    let template = TemplatePage::open(&request.template_path).map_err(|e| {
        LabelError::TemplateUnreadable(format!("{}: {e}", request.template_path.display()))
    })?;
    if template.source_page_count() > 1 {
        log::info!(
            "Template has {} pages; only the first is used",
            template.source_page_count()
        );
    }

    let table = DataTable::from_path(&request.data_path)?;
    let range = RowRange::new(
        request.start.unwrap_or(1),
        request.end.unwrap_or(table.len()),
        table.len(),
    )?;

    let font_name = request
        .layout
        .font_path
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "LabelFont".to_string());
    let (font, provider) = label_fonts(request.layout.font_bytes()?, &font_name)?;

    let composer = BatchComposer::new(&template, request.layout.clone(), font, &provider)?;
    let output = composer.compose(&table, range, on_progress)?;
    output.save(&request.output_path)?;
    Ok(output)
}
