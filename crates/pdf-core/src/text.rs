//! Text rendering utilities

use crate::page::Color;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "LblF1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text color (RGB)
    pub color: Color,
}

/// Generate PDF operators for text insertion
///
/// Creates the PDF text operators (BT, rg, Tf, Td, Tj, ET) to render
/// already-encoded text with its baseline starting at `(x, y)`.
///
/// # Arguments
/// * `encoded` - Encoded string operand, either a hex string (`<0041>`)
///   or a literal string (`(AB)`)
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Y coordinate in points (PDF coordinates, from bottom)
/// * `ctx` - Text rendering context
///
/// # Returns
/// Vector of bytes containing the PDF operators
pub fn generate_text_operators(encoded: &[u8], x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = Vec::new();

    ops.extend_from_slice(b"BT\n");
    ops.extend_from_slice(
        format!("{} {} {} rg\n", ctx.color.r, ctx.color.g, ctx.color.b).as_bytes(),
    );
    ops.extend_from_slice(format!("/{} {} Tf\n", ctx.font_name, ctx.font_size).as_bytes());
    ops.extend_from_slice(format!("{x} {y} Td\n").as_bytes());
    ops.extend_from_slice(encoded);
    ops.extend_from_slice(b" Tj\n");
    ops.extend_from_slice(b"ET\n");

    ops
}

/// Encode text as a PDF literal string in WinAnsi (Windows-1252)
///
/// Characters outside WinAnsi are replaced with `?`. Parentheses and
/// backslashes are escaped.
pub fn encode_winansi_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        match char_to_winansi(c) {
            Some(b'(') => out.extend_from_slice(b"\\("),
            Some(b')') => out.extend_from_slice(b"\\)"),
            Some(b'\\') => out.extend_from_slice(b"\\\\"),
            Some(b'\r') => out.extend_from_slice(b"\\r"),
            Some(b'\n') => out.extend_from_slice(b"\\n"),
            Some(byte) => out.push(byte),
            None => out.push(b'?'),
        }
    }
    out.push(b')');
    out
}

/// Map a single Unicode char to its WinAnsi byte
fn char_to_winansi(c: char) -> Option<u8> {
    match c as u32 {
        0x0000..=0x007F => Some(c as u8),
        0x00A0..=0x00FF => Some(c as u8),
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}
