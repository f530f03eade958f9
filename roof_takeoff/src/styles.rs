//! Display names, colors and stroke styles for roof entities.

use serde::{Deserialize, Serialize};

use crate::model::LineType;

/// Width of a stroked outline in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineWeight(pub f32);

impl Default for LineWeight {
    fn default() -> Self {
        Self(1.5)
    }
}

/// Dash pattern of a stroked line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokePattern {
    Solid,
    /// Alternating dash and gap lengths in pixels.
    Dashed([u8; 2]),
}

/// A color with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub rgb: [u8; 3],
    pub alpha: f32,
}

impl Rgba {
    pub fn new(rgb: [u8; 3], alpha: f32) -> Self {
        Self { rgb, alpha }
    }

    pub fn opaque(rgb: [u8; 3]) -> Self {
        Self::new(rgb, 1.0)
    }

    /// CSS `rgba(..)` notation.
    pub fn css(&self) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            self.rgb[0], self.rgb[1], self.rgb[2], self.alpha
        )
    }
}

/// Name and color shown for a line type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTypeStyle {
    pub name: &'static str,
    pub color: [u8; 3],
}

impl LineTypeStyle {
    const fn new(name: &'static str, color: [u8; 3]) -> Self {
        Self { name, color }
    }
}

/// Returns the display style of `line_type`.
pub fn line_type_style(line_type: LineType) -> LineTypeStyle {
    match line_type {
        LineType::Eave => LineTypeStyle::new("Eave", [0x00, 0x7B, 0xFF]),
        LineType::Rake => LineTypeStyle::new("Rake", [0x28, 0xA7, 0x45]),
        LineType::Ridge => LineTypeStyle::new("Ridge", [0xDC, 0x35, 0x45]),
        LineType::Valley => LineTypeStyle::new("Valley", [0xFF, 0xC1, 0x07]),
        LineType::Flashing => LineTypeStyle::new("Flashing", [0x6F, 0x42, 0xC1]),
        LineType::StepFlash => LineTypeStyle::new("Step Flashing", [0xFD, 0x7E, 0x14]),
        LineType::Parapet => LineTypeStyle::new("Parapet", [0x17, 0xA2, 0xB8]),
        LineType::Hip => LineTypeStyle::new("Hip", [0xE8, 0x3E, 0x8C]),
        LineType::Other => LineTypeStyle::new("Other", [0x6C, 0x75, 0x7D]),
    }
}

pub const TOTAL_AREA_COLOR: [u8; 3] = [0x80, 0x80, 0x80];
pub const PITCH_COLOR: [u8; 3] = [0xA9, 0xA9, 0xA9];

/// Face fill colors of the 2D view.
pub mod view_colors {
    pub const SELECTED: [u8; 3] = [0xAD, 0xD8, 0xE6];
    pub const HOVER_ADD: [u8; 3] = [0x28, 0xA7, 0x45];
    pub const HOVER_REMOVE: [u8; 3] = [0xDC, 0x35, 0x45];
    pub const UNSELECTED: [u8; 3] = [0x80, 0x80, 0x80];
    pub const LABEL: [u8; 3] = [0x33, 0x33, 0x33];
}

/// Formats a color as `#RRGGBB`.
pub fn to_hex(color: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formatting() {
        assert_eq!(to_hex(line_type_style(LineType::Eave).color), "#007BFF");
        assert_eq!(to_hex(TOTAL_AREA_COLOR), "#808080");
    }

    #[test]
    fn step_flash_name() {
        assert_eq!(line_type_style(LineType::StepFlash).name, "Step Flashing");
    }

    #[test]
    fn rgba_css() {
        let c = Rgba::new(view_colors::SELECTED, 0.6);
        assert_eq!(c.css(), "rgba(173, 216, 230, 0.6)");
    }
}
