//! WASM bindings for the label generator
//!
//! Everything runs in memory: the caller hands over the template PDF bytes,
//! the CSV text and optionally a layout and a TrueType font, then gets the
//! generated PDF back as bytes.
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { LabelGenerator } from 'label-wasm';
//!
//! await init();
//!
//! const generator = new LabelGenerator();
//! generator.loadTemplate(templateBytes);
//! generator.loadCsv(csvText);
//! generator.setLayout(layoutJson);   // optional
//! generator.loadFont(fontBytes);     // optional, enables barcode captions
//!
//! const pdf = generator.generate(1, generator.rowCount(), (done, total) => {
//!   progress.value = done / total;
//! });
//! console.log(generator.lastSummary().text);
//! ```

use label::{BatchComposer, BatchOutput, DataTable, LabelLayout, Progress, RowRange};
use pdf_core::TemplatePage;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// A row that produced no page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRow {
    pub row: usize,
    pub reason: String,
}

/// Result of the last `generate` call, as handed to JavaScript
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub rendered: usize,
    pub requested: usize,
    pub start_row: usize,
    pub end_row: usize,
    pub failures: Vec<FailedRow>,
    pub text: String,
}

impl From<&BatchOutput> for GenerationSummary {
    fn from(output: &BatchOutput) -> Self {
        Self {
            rendered: output.rendered,
            requested: output.requested(),
            start_row: output.range.start(),
            end_row: output.range.end(),
            failures: output
                .failures
                .iter()
                .map(|f| FailedRow {
                    row: f.row,
                    reason: f.reason.to_string(),
                })
                .collect(),
            text: output.summary(),
        }
    }
}

/// In-memory label generator
#[wasm_bindgen]
#[derive(Default)]
pub struct LabelGenerator {
    template: Option<TemplatePage>,
    table: Option<DataTable>,
    layout: LabelLayout,
    font: Option<Vec<u8>>,
    summary: Option<GenerationSummary>,
}

#[wasm_bindgen]
impl LabelGenerator {
    #[wasm_bindgen(constructor)]
    pub fn new() -> LabelGenerator {
        LabelGenerator::default()
    }

    /// Load the template PDF; only its first page is used
    ///
    /// @param data - PDF file bytes (Uint8Array)
    #[wasm_bindgen(js_name = loadTemplate)]
    pub fn load_template(&mut self, data: &[u8]) -> Result<(), JsValue> {
        let template = TemplatePage::from_bytes(data)
            .map_err(|e| to_js(label::LabelError::TemplateUnreadable(e.to_string())))?;
        self.template = Some(template);
        Ok(())
    }

    /// Load the CSV data
    ///
    /// @param text - CSV content with a header row
    #[wasm_bindgen(js_name = loadCsv)]
    pub fn load_csv(&mut self, text: &str) -> Result<(), JsValue> {
        self.table = Some(DataTable::parse(text).map_err(to_js)?);
        Ok(())
    }

    /// Replace the default layout
    ///
    /// @param json - Layout JSON; missing keys keep their defaults
    #[wasm_bindgen(js_name = setLayout)]
    pub fn set_layout(&mut self, json: &str) -> Result<(), JsValue> {
        let layout = LabelLayout::from_json(json).map_err(to_js)?;
        self.layout = layout;
        Ok(())
    }

    /// Load a TrueType font for field text and barcode captions
    ///
    /// @param data - TTF file bytes (Uint8Array)
    #[wasm_bindgen(js_name = loadFont)]
    pub fn load_font(&mut self, data: &[u8]) -> Result<(), JsValue> {
        // Reject unusable fonts here rather than at generate time
        label::label_fonts(Some(data.to_vec()), "LabelFont").map_err(to_js)?;
        self.font = Some(data.to_vec());
        Ok(())
    }

    /// Number of data rows loaded, 0 before `loadCsv`
    #[wasm_bindgen(js_name = rowCount)]
    pub fn row_count(&self) -> usize {
        self.table.as_ref().map_or(0, DataTable::len)
    }

    /// Generate labels for rows `start..=end` (1-indexed)
    ///
    /// @param start - First row, defaults to 1
    /// @param end - Last row, defaults to the last row
    /// @param onProgress - Optional `(completed, total) => void`
    /// @returns PDF bytes (Uint8Array)
    pub fn generate(
        &mut self,
        start: Option<usize>,
        end: Option<usize>,
        on_progress: Option<js_sys::Function>,
    ) -> Result<Vec<u8>, JsValue> {
        let output = self
            .generate_output(start, end, |progress| {
                if let Some(callback) = &on_progress {
                    // A throwing callback must not abort the run
                    let _ = callback.call2(
                        &JsValue::NULL,
                        &JsValue::from(progress.completed as u32),
                        &JsValue::from(progress.total as u32),
                    );
                }
            })
            .map_err(to_js)?;
        Ok(output.pdf)
    }

    /// Summary of the last successful `generate` call, or `undefined`
    #[wasm_bindgen(js_name = lastSummary)]
    pub fn last_summary(&self) -> Result<JsValue, JsValue> {
        match &self.summary {
            Some(summary) => Ok(serde_wasm_bindgen::to_value(summary)?),
            None => Ok(JsValue::UNDEFINED),
        }
    }
}

impl LabelGenerator {
    fn generate_output<F>(
        &mut self,
        start: Option<usize>,
        end: Option<usize>,
        on_progress: F,
    ) -> label::Result<BatchOutput>
    where
        F: FnMut(Progress),
    {
        let template = self.template.as_ref().ok_or_else(|| {
            label::LabelError::TemplateUnreadable(
                "No template loaded; call loadTemplate() first".to_string(),
            )
        })?;
        let table = self.table.as_ref().ok_or_else(|| {
            label::LabelError::Data("No data loaded; call loadCsv() first".to_string())
        })?;

        let range = RowRange::new(start.unwrap_or(1), end.unwrap_or(table.len()), table.len())?;
        let (font, provider) = label::label_fonts(self.font.clone(), "LabelFont")?;

        let composer = BatchComposer::new(template, self.layout.clone(), font, &provider)?;
        let output = composer.compose(table, range, on_progress)?;
        self.summary = Some(GenerationSummary::from(&output));
        Ok(output)
    }
}
