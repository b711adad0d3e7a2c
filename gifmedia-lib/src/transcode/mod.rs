//! Transcoding building blocks
//!
//! This module handles the codec work of an export:
//! - Audio and video decoders opened from source streams
//! - Audio resampling to the configured output rate (stereo FLTP)
//! - Rechunking PCM to the AAC frame size
//! - AAC and H.264 encoders

pub mod decoder;
pub mod encoder;
pub mod fifo;
pub mod resampler;

pub use decoder::{AudioDecoder, VideoDecoder};
pub use encoder::{AacEncoder, H264Encoder, VideoEncoderSettings};
pub use fifo::PcmFifo;
pub use resampler::AudioResampler;
