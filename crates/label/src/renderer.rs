//! Row Renderer - one data row onto one copy of the template page

use crate::barcode::{BarcodeImageProvider, BarcodeSpec};
use crate::config::{Field, RenderConfig};
use crate::data::{DataRow, BARCODE};
use crate::fit::fit_barcode;
use crate::geometry::{to_absolute_x, to_absolute_y};
use crate::{LabelError, Result};
use pdf_core::{get_dimensions, Color, PageCanvas, PdfFont, TemplatePage};

/// Result of rendering one row
#[derive(Debug)]
pub enum RowOutcome {
    /// The finished page
    Rendered(PageCanvas),
    /// The row could not be rendered; nothing was produced for it
    Failed { row: usize, reason: LabelError },
}

/// Renders data rows onto fresh copies of a template page
pub struct RowRenderer<'a> {
    template: &'a TemplatePage,
    config: &'a RenderConfig,
    font: &'a PdfFont,
    provider: &'a dyn BarcodeImageProvider,
}

impl<'a> RowRenderer<'a> {
    /// Create a renderer
    ///
    /// # Arguments
    /// * `template` - Template page to copy for every row
    /// * `config` - Page geometry and layout
    /// * `font` - Font for the field text
    /// * `provider` - Source of barcode images
    pub fn new(
        template: &'a TemplatePage,
        config: &'a RenderConfig,
        font: &'a PdfFont,
        provider: &'a dyn BarcodeImageProvider,
    ) -> Self {
        Self {
            template,
            config,
            font,
            provider,
        }
    }

    /// Render one row
    pub fn render(&self, row: &DataRow<'_>) -> RowOutcome {
        match self.try_render(row) {
            Ok(page) => RowOutcome::Rendered(page),
            Err(reason) => RowOutcome::Failed {
                row: row.number(),
                reason,
            },
        }
    }

    fn try_render(&self, row: &DataRow<'_>) -> Result<PageCanvas> {
        let geometry = &self.config.geometry;
        let layout = &self.config.layout;
        let color: Color = layout.text_color.into();

        let mut page = self.template.new_page();

        for field in Field::ALL {
            let placement = layout.field(field);
            let x = to_absolute_x(geometry, placement.x_percent);
            let y = to_absolute_y(geometry, placement.y_percent);
            page.insert_text(self.font, row.get(field.column()), x, y, placement.font_size, color);
        }

        let spec = BarcodeSpec {
            raw_text: row.get(BARCODE).to_string(),
            symbology: layout.barcode_settings.symbology,
            include_human_readable_text: layout.barcode_settings.include_text,
        };
        let request = spec.request();
        let image = self.provider.render(&request)?;

        // Trust the image header over what the provider reports
        let dims = get_dimensions(&image.png)
            .map_err(|e| LabelError::BarcodeImage(e.to_string()))?;
        if (dims.width, dims.height) != (image.width, image.height) {
            log::debug!(
                "Row {}: provider reported {}x{}px, image is {}x{}px",
                row.number(),
                image.width,
                image.height,
                dims.width,
                dims.height
            );
        }

        let placement = &layout.barcode;
        let size = fit_barcode(
            dims.width,
            dims.height,
            geometry,
            placement.width_percent,
            placement.height_percent,
        )?;
        let x = to_absolute_x(geometry, placement.x_percent);
        let y = to_absolute_y(geometry, placement.y_percent);
        page.insert_image(&image.png, x, y, size.width, size.height)?;

        log::debug!(
            "Row {}: barcode '{}' at ({x:.2}, {y:.2}) size {:.2}x{:.2}",
            row.number(),
            request.text,
            size.width,
            size.height
        );

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{BarcodeImage, BarcodeRequest, RasterBarcodeProvider};
    use crate::config::LabelLayout;
    use crate::data::DataTable;
    use lopdf::dictionary;
    use std::cell::RefCell;

    /// Records requests and always fails
    struct Recorder {
        requests: RefCell<Vec<BarcodeRequest>>,
    }

    impl BarcodeImageProvider for Recorder {
        fn render(&self, request: &BarcodeRequest) -> Result<BarcodeImage> {
            self.requests.borrow_mut().push(request.clone());
            Err(LabelError::Barcode("recorder".to_string()))
        }
    }

    fn template() -> TemplatePage {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
        });
        doc.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        TemplatePage::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_blank_barcode_requests_placeholder() {
        let template = template();
        let config = RenderConfig::new(&template, LabelLayout::default()).unwrap();
        let font = PdfFont::helvetica();
        let recorder = Recorder {
            requests: RefCell::new(Vec::new()),
        };
        let renderer = RowRenderer::new(&template, &config, &font, &recorder);

        let table = DataTable::parse("PRODUCT_NAME,BARCODE\nTee,  \n").unwrap();
        let outcome = renderer.render(&table.row(1).unwrap());

        assert!(matches!(outcome, RowOutcome::Failed { row: 1, .. }));
        let requests = recorder.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, "000000000000");
        assert_eq!(requests[0].options.quiet_zone, 4.0);
    }

    #[test]
    fn test_rendered_row() {
        let template = template();
        let config = RenderConfig::new(&template, LabelLayout::default()).unwrap();
        let font = PdfFont::helvetica();
        let provider = RasterBarcodeProvider::new();
        let renderer = RowRenderer::new(&template, &config, &font, &provider);

        let table = DataTable::parse("PRODUCT_NAME,COLOUR,BARCODE\nTee,Navy,LBL-1\n").unwrap();
        assert!(matches!(
            renderer.render(&table.row(1).unwrap()),
            RowOutcome::Rendered(_)
        ));
    }

    #[test]
    fn test_undecodable_image_fails_row() {
        struct Garbage;
        impl BarcodeImageProvider for Garbage {
            fn render(&self, _: &BarcodeRequest) -> Result<BarcodeImage> {
                Ok(BarcodeImage {
                    png: vec![0; 4],
                    width: 10,
                    height: 10,
                })
            }
        }

        let template = template();
        let config = RenderConfig::new(&template, LabelLayout::default()).unwrap();
        let font = PdfFont::helvetica();
        let renderer = RowRenderer::new(&template, &config, &font, &Garbage);

        let table = DataTable::parse("BARCODE\n1\n").unwrap();
        match renderer.render(&table.row(1).unwrap()) {
            RowOutcome::Failed { reason, .. } => {
                assert!(matches!(reason, LabelError::BarcodeImage(_)))
            }
            RowOutcome::Rendered(_) => panic!("expected a failed row"),
        }
    }
}
