//! Export presets and output container types.

use serde::{Deserialize, Serialize};

use crate::types::TrackKind;

/// Encoding preset of an export session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportPreset {
    /// AAC audio only
    AppleM4A,
    /// H.264 video at high quality plus AAC audio
    HighestQuality,
}

impl ExportPreset {
    /// Track kinds the preset writes.  Tracks of other kinds are dropped.
    pub fn exports(self, kind: TrackKind) -> bool {
        match self {
            ExportPreset::AppleM4A => kind == TrackKind::Audio,
            ExportPreset::HighestQuality => true,
        }
    }
}

/// Container written by an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFileType {
    AppleM4A,
    QuickTimeMovie,
}

impl OutputFileType {
    /// FFmpeg muxer name
    pub fn muxer(self) -> &'static str {
        match self {
            OutputFileType::AppleM4A => "ipod",
            OutputFileType::QuickTimeMovie => "mov",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFileType::AppleM4A => "m4a",
            OutputFileType::QuickTimeMovie => "mov",
        }
    }

    pub fn allows_video(self) -> bool {
        matches!(self, OutputFileType::QuickTimeMovie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_types() {
        assert_eq!(OutputFileType::AppleM4A.muxer(), "ipod");
        assert_eq!(OutputFileType::AppleM4A.extension(), "m4a");
        assert_eq!(OutputFileType::QuickTimeMovie.muxer(), "mov");
        assert!(!OutputFileType::AppleM4A.allows_video());
    }

    #[test]
    fn test_preset_track_kinds() {
        assert!(ExportPreset::AppleM4A.exports(TrackKind::Audio));
        assert!(!ExportPreset::AppleM4A.exports(TrackKind::Video));
        assert!(ExportPreset::HighestQuality.exports(TrackKind::Video));
    }
}
