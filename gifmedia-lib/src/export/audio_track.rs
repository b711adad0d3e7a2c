//! Audio track rendering.
//!
//! Each composition audio track becomes one AAC stream.  Segments are
//! decoded from their sources, resampled to stereo FLTP, trimmed to the
//! exact source range and laid out on the output timeline.  Gaps between
//! segments are filled with silence.

use crate::composition::{CompositionTrack, TrackSegment};
use crate::config::ExportConfig;
use crate::error::Result;
use crate::transcode::{AacEncoder, AudioDecoder, AudioResampler, PcmFifo};
use crate::types::MediaTime;
use ffmpeg_next as ffmpeg;

use super::muxer::FileMuxer;
use super::session::CancelFlag;
use super::source::SegmentSource;

const OUTPUT_CHANNELS: u16 = 2;

pub struct AudioTrackWriter {
    encoder: AacEncoder,
    out_index: usize,
    fifo: PcmFifo,
    sample_rate: u32,
    /// Samples queued so far, i.e. the output position of the next sample
    queued: i64,
    /// pts of the next frame sent to the encoder
    next_pts: i64,
}

impl AudioTrackWriter {
    /// Open an AAC encoder and register its stream with the muxer.
    pub fn open(muxer: &mut FileMuxer, config: &ExportConfig) -> Result<Self> {
        let encoder = AacEncoder::open(
            config.audio_sample_rate,
            OUTPUT_CHANNELS,
            config.aac_bitrate,
            muxer.needs_global_header(),
        )?;
        let out_index = muxer.add_stream(encoder.codec_parameters(), encoder.output_timebase())?;

        Ok(Self {
            encoder,
            out_index,
            fifo: PcmFifo::new(OUTPUT_CHANNELS as usize, config.audio_sample_rate),
            sample_rate: config.audio_sample_rate,
            queued: 0,
            next_pts: 0,
        })
    }

    fn time_base(&self) -> ffmpeg::Rational {
        ffmpeg::Rational::new(1, self.sample_rate as i32)
    }

    /// Render every segment of `track`, then flush the encoder.
    pub fn write(
        mut self,
        track: &CompositionTrack,
        muxer: &mut FileMuxer,
        cancel: &CancelFlag,
    ) -> Result<()> {
        for segment in track.segments() {
            cancel.check()?;

            let start = segment.target_start.to_ts(self.time_base());
            if start > self.queued {
                let gap = (start - self.queued) as usize;
                self.fifo.push_silence(gap);
                self.queued += gap as i64;
            }

            self.write_segment(segment, muxer, cancel)?;
        }

        self.finish(muxer)?;
        tracing::debug!(
            track_id = track.track_id(),
            samples = self.queued,
            "audio track written"
        );
        Ok(())
    }

    fn write_segment(
        &mut self,
        segment: &TrackSegment,
        muxer: &mut FileMuxer,
        cancel: &CancelFlag,
    ) -> Result<()> {
        // ── 1. Open source and decoder ─────────────────────────────────────
        let mut source = SegmentSource::open(segment)?;
        let mut decoder = AudioDecoder::open(&source.stream()?)?;
        let mut trim = SegmentTrim::new(segment, self.time_base());

        tracing::debug!(
            path = %segment.source_path.display(),
            source = %segment.source_range,
            target_start = %segment.target_start,
            expected = trim.expected,
            "audio segment"
        );

        // ── 2. Decode until the source range is covered ────────────────────
        let stream_index = source.stream_index;
        let time_base = source.time_base;
        for (stream, packet) in source.input.packets() {
            if stream.index() != stream_index {
                continue;
            }
            cancel.check()?;
            decoder.send_packet(&packet)?;
            while let Some(frame) = decoder.receive_frame()? {
                self.push_decoded(&mut trim, &frame, time_base)?;
            }
            self.encode_ready(muxer)?;
            if trim.is_complete() {
                break;
            }
        }

        // ── 3. Drain decoder and resampler ─────────────────────────────────
        if !trim.is_complete() {
            decoder.send_eof()?;
            while let Some(frame) = decoder.receive_frame()? {
                self.push_decoded(&mut trim, &frame, time_base)?;
            }
            let flushed = match trim.resampler.as_mut() {
                Some(resampler) => resampler.flush()?,
                None => None,
            };
            if let Some(out) = flushed {
                self.push_resampled(&mut trim, &out)?;
            }
        }

        // ── 4. Pad a short source with silence ─────────────────────────────
        let missing = trim.expected - trim.taken;
        if missing > 0 {
            tracing::debug!(missing, "audio segment shorter than its range, padding");
            self.fifo.push_silence(missing);
            self.queued += missing as i64;
        }

        self.encode_ready(muxer)
    }

    fn push_decoded(
        &mut self,
        trim: &mut SegmentTrim,
        frame: &ffmpeg::util::frame::Audio,
        time_base: ffmpeg::Rational,
    ) -> Result<()> {
        if trim.is_complete() {
            return Ok(());
        }
        if trim.anchor.is_none() {
            trim.anchor = Some(
                frame
                    .pts()
                    .map(|pts| MediaTime::from_ts(pts, time_base))
                    .unwrap_or(trim.source_start),
            );
        }
        if trim.resampler.is_none() {
            trim.resampler = Some(AudioResampler::new(frame, self.sample_rate)?);
        }
        let converted = match trim.resampler.as_mut() {
            Some(resampler) => resampler.convert(frame)?,
            None => None,
        };
        if let Some(out) = converted {
            self.push_resampled(trim, &out)?;
        }
        Ok(())
    }

    /// Queue the part of a resampled frame that falls inside the segment.
    fn push_resampled(
        &mut self,
        trim: &mut SegmentTrim,
        frame: &ffmpeg::util::frame::Audio,
    ) -> Result<()> {
        let (from, to) = trim.window(frame.samples());
        if from < to {
            self.fifo.push_frame_range(frame, from, to)?;
            self.queued += (to - from) as i64;
        }
        Ok(())
    }

    /// Encode every full frame in the FIFO.
    fn encode_ready(&mut self, muxer: &mut FileMuxer) -> Result<()> {
        let frame_size = self.encoder.frame_size();
        while let Some(frame) = self.fifo.pop_frame(frame_size)? {
            self.encode(frame, muxer)?;
        }
        Ok(())
    }

    fn encode(&mut self, mut frame: ffmpeg::util::frame::Audio, muxer: &mut FileMuxer) -> Result<()> {
        frame.set_pts(Some(self.next_pts));
        self.next_pts += frame.samples() as i64;
        self.encoder.send_frame(&frame)?;
        while let Some(mut packet) = self.encoder.receive_packet()? {
            muxer.write_packet(&mut packet, self.out_index)?;
        }
        Ok(())
    }

    fn finish(&mut self, muxer: &mut FileMuxer) -> Result<()> {
        self.encode_ready(muxer)?;
        if let Some(tail) = self.fifo.drain_frame()? {
            self.encode(tail, muxer)?;
        }
        for mut packet in self.encoder.flush()? {
            muxer.write_packet(&mut packet, self.out_index)?;
        }
        Ok(())
    }
}

/// Tracks which resampled samples of a segment belong to its source range.
struct SegmentTrim {
    source_start: MediaTime,
    time_base: ffmpeg::Rational,
    /// Samples the segment contributes to the output
    expected: usize,
    taken: usize,
    /// Source time of the first decoded sample
    anchor: Option<MediaTime>,
    /// Resampled samples seen so far, counted from the anchor
    produced: usize,
    resampler: Option<AudioResampler>,
}

impl SegmentTrim {
    fn new(segment: &TrackSegment, time_base: ffmpeg::Rational) -> Self {
        Self {
            source_start: segment.source_range.start,
            time_base,
            expected: segment.source_range.duration.to_ts(time_base).max(0) as usize,
            taken: 0,
            anchor: None,
            produced: 0,
            resampler: None,
        }
    }

    fn is_complete(&self) -> bool {
        self.taken >= self.expected
    }

    /// Index range of the next `n` resampled samples to keep, and advance.
    fn window(&mut self, n: usize) -> (usize, usize) {
        let anchor = self.anchor.unwrap_or(self.source_start);
        let lead_in = (self.source_start - anchor).to_ts(self.time_base).max(0) as usize;

        let from = lead_in.saturating_sub(self.produced).min(n);
        let to = (from + (self.expected - self.taken)).min(n);
        self.produced += n;
        self.taken += to.saturating_sub(from);
        (from, to)
    }
}
