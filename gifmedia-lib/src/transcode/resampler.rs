//! Audio resampler for the export pipeline
//!
//! Converts decoded PCM frames to stereo `FLTP` at the configured output rate
//! for the AAC encoder.

use crate::error::{FfmpegError, MediaError, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;

/// Output channel layout
pub const OUTPUT_CHANNEL_LAYOUT: ChannelLayout = ChannelLayout::STEREO;
/// Output sample format required by the AAC encoder
pub const OUTPUT_SAMPLE_FORMAT: Sample = Sample::F32(ffmpeg::util::format::sample::Type::Planar);

/// Audio resampler wrapping FFmpeg's `SwrContext`
pub struct AudioResampler {
    context: resampling::Context,
    output_rate: u32,
}

impl AudioResampler {
    /// Create a resampler that converts the format described by `src_frame`
    /// to stereo FLTP at `target_rate`.
    pub fn new(src_frame: &ffmpeg::util::frame::Audio, target_rate: u32) -> Result<Self> {
        let context = resampling::Context::get(
            src_frame.format(),
            source_layout(src_frame),
            src_frame.rate(),
            OUTPUT_SAMPLE_FORMAT,
            OUTPUT_CHANNEL_LAYOUT,
            target_rate,
        )
        .map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::ResamplerCreate(format!(
                "{} Hz {:?} -> {} Hz: {}",
                src_frame.rate(),
                src_frame.format(),
                target_rate,
                e
            )))
        })?;

        Ok(Self {
            context,
            output_rate: target_rate,
        })
    }

    /// Convert one input PCM frame.  Returns `None` when the resampler needs
    /// more input before it can produce output.
    pub fn convert(
        &mut self,
        frame: &ffmpeg::util::frame::Audio,
    ) -> Result<Option<ffmpeg::util::frame::Audio>> {
        // Output frame must be empty: swr_convert_frame allocates the buffer
        // from the SwrContext config.
        let mut out = ffmpeg::util::frame::Audio::empty();

        self.context.run(frame, &mut out).map_err(|e| {
            MediaError::Ffmpeg(FfmpegError::ResamplerCreate(format!(
                "Resampling error: {}",
                e
            )))
        })?;

        Ok((out.samples() > 0).then_some(out))
    }

    /// Flush any remaining samples from the internal resampler buffer.
    ///
    /// A passthrough context has nothing buffered and reports an error on
    /// flush; that is treated as "no samples".
    pub fn flush(&mut self) -> Result<Option<ffmpeg::util::frame::Audio>> {
        let mut out = ffmpeg::util::frame::Audio::empty();
        if let Err(e) = self.context.flush(&mut out) {
            tracing::debug!("Resampler flush returned non-fatal error: {}", e);
            return Ok(None);
        }

        Ok((out.samples() > 0).then_some(out))
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

/// Channel layout of a decoded frame, falling back to a layout derived from
/// the channel count when the decoder left it unset.
fn source_layout(frame: &ffmpeg::util::frame::Audio) -> ChannelLayout {
    if frame.channel_layout().bits() != 0 {
        return frame.channel_layout();
    }
    layout_for_channels(frame.channels() as u16)
}

pub fn layout_for_channels(channels: u16) -> ChannelLayout {
    match channels {
        1 => ChannelLayout::MONO,
        _ => ChannelLayout::STEREO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_channels() {
        assert_eq!(layout_for_channels(1), ChannelLayout::MONO);
        assert_eq!(layout_for_channels(2), ChannelLayout::STEREO);
        assert_eq!(layout_for_channels(0), ChannelLayout::STEREO);
    }

    #[test]
    fn test_resampler_converts_rate() {
        let mut frame = ffmpeg::util::frame::Audio::new(
            Sample::I16(ffmpeg::util::format::sample::Type::Packed),
            441,
            ChannelLayout::MONO,
        );
        frame.set_rate(44100);
        for b in frame.data_mut(0).iter_mut() {
            *b = 0;
        }

        let mut resampler = AudioResampler::new(&frame, 48000).unwrap();
        assert_eq!(resampler.output_rate(), 48000);
        let out = resampler.convert(&frame).unwrap();
        if let Some(out) = out {
            assert_eq!(out.rate(), 48000);
            assert_eq!(out.format(), OUTPUT_SAMPLE_FORMAT);
        }
    }
}
