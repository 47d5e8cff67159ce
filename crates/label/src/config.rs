//! Label layout configuration
//!
//! Field and barcode positions are percentages of the template page. The
//! layout can be read from JSON (camelCase keys); anything left out keeps
//! its default.
//!
//! ```json
//! {
//!   "productName": { "xPercent": 20, "yPercent": 60, "fontSize": 12 },
//!   "barcode": { "xPercent": 75, "yPercent": 20, "widthPercent": 20, "heightPercent": 12 },
//!   "barcodeSettings": { "symbology": "EAN13", "includeText": false }
//! }
//! ```

use crate::barcode::Symbology;
use crate::data::{BATCH, COLOUR, PRODUCT_NAME, STYLE};
use crate::geometry::PageGeometry;
use crate::{LabelError, Result};
use pdf_core::{Color, TemplatePage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The four text fields drawn on every label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ProductName,
    Colour,
    Style,
    Batch,
}

impl Field {
    /// All fields in drawing order
    pub const ALL: [Field; 4] = [Field::ProductName, Field::Colour, Field::Style, Field::Batch];

    /// CSV column the field reads
    pub fn column(self) -> &'static str {
        match self {
            Field::ProductName => PRODUCT_NAME,
            Field::Colour => COLOUR,
            Field::Style => STYLE,
            Field::Batch => BATCH,
        }
    }
}

/// Position and size of one text field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPlacement {
    pub x_percent: f64,
    pub y_percent: f64,
    /// Font size in points
    pub font_size: f32,
}

impl FieldPlacement {
    pub fn new(x_percent: f64, y_percent: f64, font_size: f32) -> Self {
        Self {
            x_percent,
            y_percent,
            font_size,
        }
    }
}

/// Top-left corner and size budget of the barcode image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodePlacement {
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
}

impl Default for BarcodePlacement {
    fn default() -> Self {
        Self {
            x_percent: 75.0,
            y_percent: 20.0,
            width_percent: 20.0,
            height_percent: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeSettings {
    #[serde(default)]
    pub symbology: Symbology,
    #[serde(default = "default_include_text")]
    pub include_text: bool,
}

fn default_include_text() -> bool {
    true
}

impl Default for BarcodeSettings {
    fn default() -> Self {
        Self {
            symbology: Symbology::default(),
            include_text: default_include_text(),
        }
    }
}

/// RGB text color (0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl From<TextColor> for Color {
    fn from(c: TextColor) -> Self {
        Color::rgb(c.r, c.g, c.b)
    }
}

/// Where and how everything is drawn on a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelLayout {
    pub product_name: FieldPlacement,
    pub colour: FieldPlacement,
    pub style: FieldPlacement,
    pub batch: FieldPlacement,
    pub barcode: BarcodePlacement,
    pub barcode_settings: BarcodeSettings,
    pub text_color: TextColor,
    /// TrueType font for field text and barcode captions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            product_name: FieldPlacement::new(20.0, 60.0, 12.0),
            colour: FieldPlacement::new(20.0, 70.0, 11.0),
            style: FieldPlacement::new(20.0, 80.0, 11.0),
            batch: FieldPlacement::new(20.0, 90.0, 11.0),
            barcode: BarcodePlacement::default(),
            barcode_settings: BarcodeSettings::default(),
            text_color: TextColor::default(),
            font_path: None,
        }
    }
}

impl LabelLayout {
    /// Parse a layout from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Read a layout from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LabelError::InvalidLayout(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn field(&self, field: Field) -> &FieldPlacement {
        match field {
            Field::ProductName => &self.product_name,
            Field::Colour => &self.colour,
            Field::Style => &self.style,
            Field::Batch => &self.batch,
        }
    }

    /// Check that every value can be drawn
    ///
    /// Positions may lie outside the page; sizes must be finite, barcode
    /// sizes non-negative and font sizes positive.
    pub fn validate(&self) -> Result<()> {
        for field in Field::ALL {
            let p = self.field(field);
            if !p.x_percent.is_finite() || !p.y_percent.is_finite() {
                return Err(LabelError::InvalidLayout(format!(
                    "{} position must be finite",
                    field.column()
                )));
            }
            if !(p.font_size.is_finite() && p.font_size > 0.0) {
                return Err(LabelError::InvalidLayout(format!(
                    "{} font size must be positive, got {}",
                    field.column(),
                    p.font_size
                )));
            }
        }

        let b = &self.barcode;
        if !b.x_percent.is_finite() || !b.y_percent.is_finite() {
            return Err(LabelError::InvalidLayout(
                "Barcode position must be finite".to_string(),
            ));
        }
        for (name, value) in [("width", b.width_percent), ("height", b.height_percent)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LabelError::InvalidLayout(format!(
                    "Barcode {name} must be a non-negative number, got {value}"
                )));
            }
        }

        let c = &self.text_color;
        if [c.r, c.g, c.b].iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(LabelError::InvalidLayout(
                "Text color components must be between 0 and 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Bytes of the configured font, if any
    pub fn font_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.font_path
            .as_ref()
            .map(|path| {
                std::fs::read(path)
                    .map_err(|e| LabelError::Font(format!("{}: {e}", path.display())))
            })
            .transpose()
    }
}

/// Everything fixed for one run: the page geometry and the layout
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub geometry: PageGeometry,
    pub layout: LabelLayout,
}

impl RenderConfig {
    /// Validate `layout` and pair it with the template's geometry
    pub fn new(template: &TemplatePage, layout: LabelLayout) -> Result<Self> {
        layout.validate()?;
        let geometry = PageGeometry::from_template(template);
        log::debug!(
            "Template page {:.2}x{:.2}pt at ({:.2}, {:.2}), rotated {}",
            geometry.width,
            geometry.height,
            geometry.origin_x,
            geometry.origin_y,
            template.rotation()
        );
        Ok(Self { geometry, layout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let layout = LabelLayout::default();
        assert_eq!(layout.product_name, FieldPlacement::new(20.0, 60.0, 12.0));
        assert_eq!(layout.batch, FieldPlacement::new(20.0, 90.0, 11.0));
        assert_eq!(layout.barcode.width_percent, 20.0);
        assert_eq!(layout.barcode_settings.symbology, Symbology::Code128);
        assert!(layout.barcode_settings.include_text);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let layout = LabelLayout::from_json(
            r#"{
                "colour": { "xPercent": 50, "yPercent": 10, "fontSize": 9 },
                "barcodeSettings": { "symbology": "EAN13" }
            }"#,
        )
        .unwrap();

        assert_eq!(layout.colour, FieldPlacement::new(50.0, 10.0, 9.0));
        assert_eq!(layout.product_name, LabelLayout::default().product_name);
        assert_eq!(layout.barcode_settings.symbology, Symbology::Ean13);
        assert!(layout.barcode_settings.include_text);
    }

    #[test]
    fn test_json_round_trip_keys() {
        let json = serde_json::to_value(LabelLayout::default()).unwrap();
        assert_eq!(json["barcode"]["heightPercent"], 12.0);
        assert_eq!(json["barcodeSettings"]["symbology"], "CODE128");
        assert!(json.get("fontPath").is_none());
    }

    #[test]
    fn test_out_of_page_positions_are_valid() {
        let mut layout = LabelLayout::default();
        layout.style.x_percent = -5.0;
        layout.barcode.y_percent = 120.0;
        layout.barcode.width_percent = 80.0;
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut layout = LabelLayout::default();
        layout.batch.font_size = 0.0;
        assert!(matches!(layout.validate(), Err(LabelError::InvalidLayout(_))));

        let mut layout = LabelLayout::default();
        layout.barcode.height_percent = -1.0;
        assert!(layout.validate().is_err());

        let mut layout = LabelLayout::default();
        layout.colour.y_percent = f64::NAN;
        assert!(layout.validate().is_err());

        let mut layout = LabelLayout::default();
        layout.text_color.r = 2.0;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_unknown_symbology_is_config_error() {
        let result = LabelLayout::from_json(r#"{ "barcodeSettings": { "symbology": "QR" } }"#);
        assert!(matches!(result, Err(LabelError::Config(_))));
    }

    #[test]
    fn test_field_columns() {
        let columns: Vec<&str> = Field::ALL.iter().map(|f| f.column()).collect();
        assert_eq!(columns, vec!["PRODUCT_NAME", "COLOUR", "STYLE", "BATCH"]);
    }
}
