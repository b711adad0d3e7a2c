//! Subtitle appearance.

use serde::{Deserialize, Serialize};

/// Style configuration for burned-in subtitles.
///
/// Colours use the ASS `&HAABBGGRR` notation.  Font size and bottom margin
/// are given relative to the render height so one style works for both
/// portrait and landscape output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    pub font_name: String,
    /// Font size as a fraction of the render height
    pub font_scale: f64,
    pub primary_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub bold: bool,
    /// Outline width in pixels
    pub outline: u32,
    /// Shadow depth in pixels
    pub shadow: u32,
    /// Distance from the bottom edge as a fraction of the render height
    pub margin_scale: f64,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: "Helvetica".to_string(),
            font_scale: 0.06,
            primary_color: "&H00FFFFFF".to_string(),
            outline_color: "&H00000000".to_string(),
            back_color: "&H80000000".to_string(),
            bold: true,
            outline: 3,
            shadow: 1,
            margin_scale: 0.08,
        }
    }
}

impl SubtitleStyle {
    /// Font size in pixels for a frame `render_height` pixels tall.
    pub fn font_size_for(&self, render_height: u32) -> u32 {
        ((render_height as f64 * self.font_scale).round() as u32).max(8)
    }

    /// Bottom margin in pixels for a frame `render_height` pixels tall.
    pub fn margin_for(&self, render_height: u32) -> u32 {
        (render_height as f64 * self.margin_scale).round() as u32
    }

    /// Horizontal margin: a twentieth of the frame width.
    pub fn side_margin_for(&self, render_width: u32) -> u32 {
        render_width / 20
    }
}
