//! Integration testing module
//!
//! - Synthetic assets and a scripted export backend
//! - Properties of audio extraction and subtitled composition
//! - End-to-end exports through FFmpeg

pub mod e2e;
pub mod extractor;
