//! Planar float sample FIFO.
//!
//! The AAC encoder demands exactly `frame_size` samples per frame (except the
//! last), while decoders and the resampler emit frames of arbitrary length.
//! `PcmFifo` accumulates resampled FLTP frames and hands them back out in
//! fixed-size chunks.

use crate::error::{FfmpegError, MediaError, Result};
use crate::ffmpeg_utils::helpers::{audio_plane_f32, audio_plane_f32_mut};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::format::sample::Sample;

use super::resampler::layout_for_channels;

const FLTP: Sample = Sample::F32(ffmpeg::util::format::sample::Type::Planar);

pub struct PcmFifo {
    planes: Vec<Vec<f32>>,
    rate: u32,
}

impl PcmFifo {
    pub fn new(channels: usize, rate: u32) -> Self {
        Self {
            planes: vec![Vec::new(); channels.max(1)],
            rate,
        }
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Buffered samples per channel
    pub fn len(&self) -> usize {
        self.planes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one plane per channel.  All planes must be the same length.
    pub fn push_planes(&mut self, planes: &[&[f32]]) {
        for (dst, src) in self.planes.iter_mut().zip(planes) {
            dst.extend_from_slice(src);
        }
    }

    /// Append an FLTP frame.
    pub fn push_frame(&mut self, frame: &ffmpeg::util::frame::Audio) -> Result<()> {
        self.push_frame_range(frame, 0, frame.samples())
    }

    /// Append samples `from..to` of an FLTP frame.  The range is clamped to
    /// the frame length.
    pub fn push_frame_range(
        &mut self,
        frame: &ffmpeg::util::frame::Audio,
        from: usize,
        to: usize,
    ) -> Result<()> {
        if frame.format() != FLTP {
            return Err(MediaError::Ffmpeg(FfmpegError::StreamConfig(format!(
                "PCM FIFO expects FLTP, got {:?}",
                frame.format()
            ))));
        }
        let n = frame.samples();
        let to = to.min(n);
        if from >= to {
            return Ok(());
        }
        for ch in 0..self.planes.len() {
            let floats = audio_plane_f32(frame, ch, n).ok_or_else(|| {
                MediaError::Ffmpeg(FfmpegError::StreamConfig(format!(
                    "FLTP plane {} unreadable for {} samples",
                    ch, n
                )))
            })?;
            self.planes[ch].extend_from_slice(&floats[from..to]);
        }
        Ok(())
    }

    /// Append `n` samples of silence per channel.
    pub fn push_silence(&mut self, n: usize) {
        for plane in &mut self.planes {
            plane.resize(plane.len() + n, 0.0);
        }
    }

    /// Remove up to `n` samples per channel from the front.
    pub fn pop_planes(&mut self, n: usize) -> Vec<Vec<f32>> {
        let n = n.min(self.len());
        self.planes
            .iter_mut()
            .map(|plane| plane.drain(..n).collect())
            .collect()
    }

    /// Pop exactly `n` samples as an FLTP frame, or `None` if fewer are
    /// buffered.
    pub fn pop_frame(&mut self, n: usize) -> Result<Option<ffmpeg::util::frame::Audio>> {
        if n == 0 || self.len() < n {
            return Ok(None);
        }
        self.build_frame(n).map(Some)
    }

    /// Pop everything left as a final, possibly short, frame.
    pub fn drain_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Audio>> {
        if self.is_empty() {
            return Ok(None);
        }
        let n = self.len();
        self.build_frame(n).map(Some)
    }

    fn build_frame(&mut self, n: usize) -> Result<ffmpeg::util::frame::Audio> {
        let planes = self.pop_planes(n);
        let layout = layout_for_channels(planes.len() as u16);
        let mut out = ffmpeg::util::frame::Audio::new(FLTP, n, layout);
        out.set_rate(self.rate);
        for (ch, samples) in planes.iter().enumerate() {
            let floats = audio_plane_f32_mut(&mut out, ch, n).ok_or_else(|| {
                MediaError::Ffmpeg(FfmpegError::StreamConfig(format!(
                    "output FLTP plane {} has bad alignment or length",
                    ch
                )))
            })?;
            floats.copy_from_slice(samples);
        }
        Ok(out)
    }
}
