pub mod api;
pub mod composer;
pub mod composition;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub(crate) mod ffmpeg_utils;
pub(crate) mod index;
pub mod subtitle;
pub(crate) mod transcode;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use api::*;
pub use composer::{PreparedComposition, SubtitledVideoComposer};
pub use config::{ComposerConfig, ExportConfig};
pub use error::{FfmpegError, MediaError, Result};
pub use extractor::{extract_audio, extract_audio_with};
pub use ffmpeg_utils::version_info as ffmpeg_version_info;
pub use ffmpeg_utils::{init, install_log_filter};
pub use subtitle::SpeechEntry;
pub use types::{Asset, AssetTrack, MediaTime, Size, TimeRange, TrackKind};
