//! Asset probing
//!
//! Opens a media file and describes its audio and video streams as
//! [`AssetTrack`](crate::types::AssetTrack)s:
//! - Video streams (codec, coded size, display matrix); cover art is skipped
//! - Audio streams (codec, sample rate, channels, language)
//! - Track time ranges from stream or container duration

pub mod audio;
pub mod scanner;
pub mod video;

pub use audio::analyze_audio_stream;
pub use scanner::scan_asset;
pub use video::{analyze_video_stream, is_attached_picture};
