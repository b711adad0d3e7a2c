//! Library configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::composition::DEFAULT_TOLERANCE;
use crate::subtitle::SubtitleStyle;

/// Settings for the subtitled video composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Directory for composed movies.  `None` means the system temp dir.
    pub temp_dir: Option<PathBuf>,
    /// File name prefix of composed movies
    pub file_prefix: String,
    /// Output frame rate
    pub frame_rate: u32,
    /// Allowed deviation when matching a transform to a canonical rotation
    pub orientation_tolerance: f64,
    pub subtitle: SubtitleStyle,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            file_prefix: "finalVideo".to_string(),
            frame_rate: 30,
            orientation_tolerance: DEFAULT_TOLERANCE,
            subtitle: SubtitleStyle::default(),
        }
    }
}

impl ComposerConfig {
    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Encoder settings used by the FFmpeg export backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub audio_sample_rate: u32,
    pub aac_bitrate: u64,
    /// x264 constant rate factor for the highest-quality preset
    pub video_crf: u8,
    pub x264_preset: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            audio_sample_rate: 48000,
            aac_bitrate: 128_000,
            video_crf: 18,
            x264_preset: "slow".to_string(),
        }
    }
}
