//! Batch Composer - renders a range of rows into one document
//!
//! Rows are processed strictly in order. A row that fails is recorded and
//! skipped; the output holds one page per successful row.

use crate::barcode::BarcodeImageProvider;
use crate::config::{LabelLayout, RenderConfig};
use crate::data::DataTable;
use crate::renderer::{RowOutcome, RowRenderer};
use crate::{LabelError, Result};
use pdf_core::{PdfDocument, PdfFont, TemplatePage};
use std::fmt::Write as _;
use std::path::Path;

/// Inclusive, 1-indexed range of data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    start: usize,
    end: usize,
}

impl RowRange {
    /// Validate `1 <= start <= end <= row_count`
    pub fn new(start: usize, end: usize, row_count: usize) -> Result<Self> {
        if start < 1 || start > end || end > row_count {
            return Err(LabelError::InvalidRange {
                start,
                end,
                row_count,
            });
        }
        Ok(Self { start, end })
    }

    /// Every row of a table with `row_count` rows
    pub fn full(row_count: usize) -> Result<Self> {
        Self::new(1, row_count, row_count)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of rows in the range
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a valid range holds at least one row
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Rows finished so far out of the rows requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed share in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// A row that produced no page
#[derive(Debug)]
pub struct RowFailure {
    /// 1-indexed row number
    pub row: usize,
    pub reason: LabelError,
}

/// The serialized document and what went into it
#[derive(Debug)]
pub struct BatchOutput {
    /// PDF file bytes
    pub pdf: Vec<u8>,
    pub range: RowRange,
    /// Pages in the document
    pub rendered: usize,
    pub failures: Vec<RowFailure>,
}

impl BatchOutput {
    /// Rows requested
    pub fn requested(&self) -> usize {
        self.range.len()
    }

    /// Human-readable summary of the run
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Generated {} of {} label page(s) (rows {}-{})",
            self.rendered,
            self.requested(),
            self.range.start(),
            self.range.end()
        );
        for failure in &self.failures {
            let _ = write!(summary, "\n  row {}: {}", failure.row, failure.reason);
        }
        summary
    }

    /// Write the PDF to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.pdf)
            .map_err(|e| LabelError::Serialization(format!("{}: {e}", path.display())))?;
        log::info!("Saved {} page(s) to {}", self.rendered, path.display());
        Ok(())
    }
}

/// Renders rows of a data table onto copies of one template
pub struct BatchComposer<'a> {
    template: &'a TemplatePage,
    config: RenderConfig,
    font: PdfFont,
    provider: &'a dyn BarcodeImageProvider,
}

impl<'a> BatchComposer<'a> {
    /// Create a composer
    ///
    /// Fails if the layout is invalid.
    pub fn new(
        template: &'a TemplatePage,
        layout: LabelLayout,
        font: PdfFont,
        provider: &'a dyn BarcodeImageProvider,
    ) -> Result<Self> {
        let config = RenderConfig::new(template, layout)?;
        if config.layout.barcode_settings.include_text && !provider.supports_caption() {
            log::warn!("No caption font available; barcodes are drawn without text");
        }

        Ok(Self {
            template,
            config,
            font,
            provider,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Begin a step-wise run over `range`
    pub fn start<'r>(&'r self, table: &'r DataTable, range: RowRange) -> Result<BatchRun<'r>> {
        // The range may have been built for another table
        let range = RowRange::new(range.start(), range.end(), table.len())?;
        let document = PdfDocument::from_template(self.template, self.font.clone())?;

        log::info!(
            "Generating rows {}-{} ({} row(s), {})",
            range.start(),
            range.end(),
            range.len(),
            self.config.layout.barcode_settings.symbology
        );

        Ok(BatchRun {
            renderer: RowRenderer::new(self.template, &self.config, &self.font, self.provider),
            table,
            range,
            next: range.start(),
            document,
            failures: Vec::new(),
        })
    }

    /// Render every row of `range`, reporting progress after each row
    pub fn compose<F>(&self, table: &DataTable, range: RowRange, mut on_progress: F) -> Result<BatchOutput>
    where
        F: FnMut(Progress),
    {
        let mut run = self.start(table, range)?;
        while let Some(progress) = run.next_row()? {
            on_progress(progress);
        }
        run.finish()
    }
}

/// An in-progress batch
///
/// Each call to [`BatchRun::next_row`] renders exactly one row. A caller
/// may stop calling it at any point and [`finish`](BatchRun::finish) with
/// the rows done so far.
pub struct BatchRun<'r> {
    renderer: RowRenderer<'r>,
    table: &'r DataTable,
    range: RowRange,
    next: usize,
    document: PdfDocument,
    failures: Vec<RowFailure>,
}

impl BatchRun<'_> {
    /// Progress so far
    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.next - self.range.start(),
            total: self.range.len(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.next > self.range.end()
    }

    /// Render the next row
    ///
    /// Returns the progress after the row, or `None` once every row in the
    /// range has been processed. Row-level failures are recorded, not
    /// returned.
    pub fn next_row(&mut self) -> Result<Option<Progress>> {
        if self.is_done() {
            return Ok(None);
        }

        let number = self.next;
        self.next += 1;

        let outcome = match self.table.row(number) {
            Some(row) => self.renderer.render(&row),
            None => {
                return Err(LabelError::InvalidRange {
                    start: self.range.start(),
                    end: self.range.end(),
                    row_count: self.table.len(),
                })
            }
        };

        let result = match outcome {
            RowOutcome::Rendered(page) => self
                .document
                .append_page(page)
                .map(|_| ())
                .map_err(LabelError::from),
            RowOutcome::Failed { reason, .. } => Err(reason),
        };

        match result {
            Ok(()) => log::debug!("Row {number} rendered"),
            Err(reason) if !reason.is_fatal() => {
                log::warn!("Skipping row {number}: {reason}");
                self.failures.push(RowFailure { row: number, reason });
            }
            Err(reason) => return Err(reason),
        }

        Ok(Some(self.progress()))
    }

    /// Serialize the pages rendered so far
    pub fn finish(mut self) -> Result<BatchOutput> {
        let rendered = self.document.page_count();
        if rendered == 0 {
            let first = self
                .failures
                .first()
                .map(|f| format!("; row {}: {}", f.row, f.reason))
                .unwrap_or_default();
            return Err(LabelError::Serialization(format!(
                "No label pages were rendered ({} row(s) failed{first})",
                self.failures.len()
            )));
        }

        let pdf = self
            .document
            .to_bytes()
            .map_err(|e| LabelError::Serialization(e.to_string()))?;

        log::info!(
            "Generated {} of {} label page(s), {} failed",
            rendered,
            self.range.len(),
            self.failures.len()
        );

        Ok(BatchOutput {
            pdf,
            range: self.range,
            rendered,
            failures: self.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_range_validation() {
        assert!(RowRange::new(1, 5, 5).is_ok());
        assert!(RowRange::new(3, 3, 5).is_ok());
        assert!(matches!(
            RowRange::new(0, 2, 5),
            Err(LabelError::InvalidRange { start: 0, .. })
        ));
        assert!(RowRange::new(4, 2, 5).is_err());
        assert!(RowRange::new(1, 6, 5).is_err());
        assert!(RowRange::full(0).is_err());
    }

    #[test]
    fn test_row_range_len() {
        assert_eq!(RowRange::new(2, 4, 5).unwrap().len(), 3);
        assert_eq!(RowRange::full(7).unwrap().len(), 7);
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress { completed: 1, total: 4 }.fraction(), 0.25);
        assert_eq!(Progress { completed: 0, total: 0 }.fraction(), 1.0);
    }

    #[test]
    fn test_summary_lists_failures() {
        let output = BatchOutput {
            pdf: Vec::new(),
            range: RowRange::new(2, 4, 5).unwrap(),
            rendered: 2,
            failures: vec![RowFailure {
                row: 3,
                reason: LabelError::Barcode("bad input".to_string()),
            }],
        };
        assert_eq!(
            output.summary(),
            "Generated 2 of 3 label page(s) (rows 2-4)\n  row 3: Barcode encoding failed: bad input"
        );
    }
}
