//! Percent-of-page to absolute coordinate mapping
//!
//! Absolute coordinates are in points with a top-left origin and y growing
//! downward.

use pdf_core::{MediaBox, TemplatePage};
use serde::{Deserialize, Serialize};

/// Page origin and size in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Geometry of the visible area of a template page, as displayed
    pub fn from_template(template: &TemplatePage) -> Self {
        let (width, height) = template.page_size();
        Self::from_page_box(template.page_box(), width, height)
    }

    /// Origin at the top-left corner of `page_box`, with the displayed size
    ///
    /// Rotated pages display with width and height swapped.
    pub fn from_page_box(page_box: MediaBox, width: f64, height: f64) -> Self {
        Self::new(page_box.x0, page_box.y0, width, height)
    }
}

/// Map a horizontal percentage of the page width to an absolute x
///
/// Percentages outside `[0, 100]` map outside the page.
pub fn to_absolute_x(geometry: &PageGeometry, percent: f64) -> f64 {
    geometry.origin_x + (percent / 100.0) * geometry.width
}

/// Map a vertical percentage of the page height to an absolute y
pub fn to_absolute_y(geometry: &PageGeometry, percent: f64) -> f64 {
    geometry.origin_y + (percent / 100.0) * geometry.height
}
