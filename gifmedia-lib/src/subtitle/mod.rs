//! Subtitle module
//!
//! Turns recognised speech into timed text cues, attaches them to a video
//! composition and renders them as an ASS script for burn-in.

pub mod ass;
pub mod overlay;
pub mod speech;
pub mod style;

pub use overlay::{DynamicSubtitles, SubtitleOverlay, SubtitleOverlayTrack, TextCue};
pub use speech::{load_speech_file, parse_speech_json, SpeechEntry};
pub use style::SubtitleStyle;
