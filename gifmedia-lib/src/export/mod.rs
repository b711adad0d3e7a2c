//! Exporting compositions to media files
//!
//! [`ExportSession`] drives the export lifecycle; [`FfmpegBackend`] does the
//! decoding, filtering, encoding and muxing.

pub mod audio_track;
pub mod ffmpeg_backend;
pub mod filters;
pub mod muxer;
pub mod preset;
pub mod session;
pub mod source;
pub mod video_track;

pub use ffmpeg_backend::FfmpegBackend;
pub use muxer::FileMuxer;
pub use preset::{ExportPreset, OutputFileType};
pub use session::{CancelFlag, ExportBackend, ExportJob, ExportSession, ExportStatus};
