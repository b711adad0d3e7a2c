//! Video track rendering.
//!
//! Frames of each segment are decoded, retimed onto the output timeline and
//! run through a libavfilter graph that applies the layer transform, scales
//! to the render size, resamples to the output frame rate, applies opacity
//! and burns in subtitles.  The result is encoded to H.264.

use std::path::Path;

use crate::composition::{CompositionTrack, TrackSegment, VideoComposition};
use crate::config::ExportConfig;
use crate::error::{FfmpegError, MediaError, Result};
use crate::ffmpeg_utils::helpers::buffersink_time_base;
use crate::ffmpeg_utils::rescale_ts;
use crate::transcode::{H264Encoder, VideoDecoder, VideoEncoderSettings};
use crate::types::{AffineTransform, MediaTime};
use ffmpeg_next as ffmpeg;

use super::filters::{video_filter_spec, VideoFilterParams};
use super::muxer::FileMuxer;
use super::session::CancelFlag;
use super::source::SegmentSource;

fn filter_err(context: &str, e: ffmpeg::Error) -> MediaError {
    MediaError::Ffmpeg(FfmpegError::FilterGraph(format!("{}: {}", context, e)))
}

/// Integer output frame rate of a video composition.
pub fn output_frame_rate(video_composition: &VideoComposition) -> u32 {
    let rate = video_composition.frame_rate();
    if rate.denominator() == 0 {
        return 1;
    }
    (rate.numerator() as f64 / rate.denominator() as f64)
        .round()
        .max(1.0) as u32
}

/// Filter chain for one segment of a composition video track.
///
/// The layer transform is classified with the composition's own tolerance,
/// so the rotation always agrees with how `render_size` was chosen.
pub fn segment_filter_spec(
    video_composition: &VideoComposition,
    track_id: u32,
    segment: &TrackSegment,
    frame_rate: u32,
    subtitle_file: Option<&Path>,
) -> String {
    let target = segment.target_range();
    let layer = video_composition.layer_instruction(track_id, target.start);
    let transform = layer
        .map(|l| l.transform_at(target.start))
        .unwrap_or(AffineTransform::IDENTITY);
    let opacity_spans = layer
        .map(|l| l.opacity_spans(target))
        .unwrap_or_default();

    video_filter_spec(&VideoFilterParams {
        orientation: video_composition.orientation_of(&transform).orientation,
        render_size: video_composition.render_size,
        frame_rate,
        opacity_spans: &opacity_spans,
        subtitle_file,
    })
}

pub struct VideoTrackWriter {
    encoder: H264Encoder,
    out_index: usize,
    frame_rate: u32,
    /// Last pts handed to the encoder, in encoder timebase
    last_pts: Option<i64>,
    frames: u64,
    /// Decoded frames dropped for lack of any timestamp
    untimed: u64,
}

impl VideoTrackWriter {
    /// Open an H.264 encoder at the composition's render size and register
    /// its stream with the muxer.
    pub fn open(
        muxer: &mut FileMuxer,
        config: &ExportConfig,
        video_composition: &VideoComposition,
    ) -> Result<Self> {
        let size = video_composition.render_size.even();
        if size.is_empty() {
            return Err(MediaError::ExportFailed(format!(
                "render size {} is too small",
                video_composition.render_size
            )));
        }
        let frame_rate = output_frame_rate(video_composition);

        let encoder = H264Encoder::open(&VideoEncoderSettings {
            width: size.width,
            height: size.height,
            frame_rate,
            crf: config.video_crf,
            preset: config.x264_preset.clone(),
            global_header: muxer.needs_global_header(),
        })?;
        let out_index = muxer.add_stream(encoder.codec_parameters(), encoder.time_base())?;

        Ok(Self {
            encoder,
            out_index,
            frame_rate,
            last_pts: None,
            frames: 0,
            untimed: 0,
        })
    }

    /// Render every segment of `track`, then flush the encoder.
    pub fn write(
        mut self,
        track: &CompositionTrack,
        video_composition: &VideoComposition,
        subtitle_file: Option<&Path>,
        muxer: &mut FileMuxer,
        cancel: &CancelFlag,
    ) -> Result<()> {
        for segment in track.segments() {
            cancel.check()?;

            let spec = segment_filter_spec(
                video_composition,
                track.track_id(),
                segment,
                self.frame_rate,
                subtitle_file,
            );
            self.write_segment(segment, &spec, muxer, cancel)?;
        }

        self.finish(muxer)?;
        tracing::debug!(
            track_id = track.track_id(),
            frames = self.frames,
            "video track written"
        );
        Ok(())
    }

    fn write_segment(
        &mut self,
        segment: &TrackSegment,
        spec: &str,
        muxer: &mut FileMuxer,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let frames_before = self.frames;
        let untimed_before = self.untimed;

        // ── 1. Open source and decoder ─────────────────────────────────────
        let mut source = SegmentSource::open(segment)?;
        let mut decoder = VideoDecoder::open(&source.stream()?)?;
        let mut graph: Option<ffmpeg::filter::Graph> = None;

        tracing::debug!(
            path = %segment.source_path.display(),
            source = %segment.source_range,
            target_start = %segment.target_start,
            filters = spec,
            "video segment"
        );

        // ── 2. Decode, retime and filter ───────────────────────────────────
        let stream_index = source.stream_index;
        let time_base = source.time_base;
        let mut done = false;
        for (stream, packet) in source.input.packets() {
            if stream.index() != stream_index {
                continue;
            }
            cancel.check()?;
            decoder.send_packet(&packet)?;
            while let Some(frame) = decoder.receive_frame()? {
                if !self.push_decoded(segment, spec, &mut graph, frame, time_base)? {
                    done = true;
                    break;
                }
            }
            self.pull_filtered(&mut graph, muxer)?;
            if done {
                break;
            }
        }

        // ── 3. Drain decoder and filter graph ──────────────────────────────
        if !done {
            decoder.send_eof()?;
            while let Some(frame) = decoder.receive_frame()? {
                if !self.push_decoded(segment, spec, &mut graph, frame, time_base)? {
                    break;
                }
            }
        }
        if let Some(g) = graph.as_mut() {
            if let Some(mut input) = g.get("in") {
                input
                    .source()
                    .flush()
                    .map_err(|e| filter_err("flush buffer source", e))?;
            }
        }
        self.pull_filtered(&mut graph, muxer)?;

        if self.frames == frames_before {
            tracing::warn!(
                path = %segment.source_path.display(),
                source = %segment.source_range,
                untimed = self.untimed - untimed_before,
                "video segment produced no frames"
            );
        }
        Ok(())
    }

    /// Feed one decoded frame to the graph.  Returns `false` once frames
    /// pass the end of the segment's source range.
    fn push_decoded(
        &mut self,
        segment: &TrackSegment,
        spec: &str,
        graph: &mut Option<ffmpeg::filter::Graph>,
        mut frame: ffmpeg::util::frame::Video,
        time_base: ffmpeg::Rational,
    ) -> Result<bool> {
        let Some(pts) = frame_time(&frame) else {
            self.untimed += 1;
            tracing::debug!(
                path = %segment.source_path.display(),
                "dropping decoded frame without a timestamp"
            );
            return Ok(true);
        };
        let source_time = MediaTime::from_ts(pts, time_base);
        if source_time >= segment.source_range.end() {
            return Ok(false);
        }
        if source_time < segment.source_range.start {
            return Ok(true);
        }

        frame.set_pts(Some(segment.to_target(source_time).as_micros()));

        if graph.is_none() {
            *graph = Some(build_graph(&frame, spec)?);
        }
        if let Some(g) = graph.as_mut() {
            let mut input = g
                .get("in")
                .ok_or_else(|| filter_err("buffer source", ffmpeg::Error::Bug))?;
            input
                .source()
                .add(&frame)
                .map_err(|e| filter_err("push frame", e))?;
        }
        Ok(true)
    }

    /// Encode every frame the graph has ready.
    fn pull_filtered(
        &mut self,
        graph: &mut Option<ffmpeg::filter::Graph>,
        muxer: &mut FileMuxer,
    ) -> Result<()> {
        let Some(g) = graph.as_mut() else {
            return Ok(());
        };
        let mut sink = g
            .get("out")
            .ok_or_else(|| filter_err("buffer sink", ffmpeg::Error::Bug))?;
        let sink_tb = buffersink_time_base(&sink);
        let encoder_tb = self.encoder.time_base();

        loop {
            let mut filtered = ffmpeg::util::frame::Video::empty();
            match sink.sink().frame(&mut filtered) {
                Ok(()) => {}
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => break,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => return Err(filter_err("pull frame", e)),
            }

            let Some(pts) = filtered.pts() else {
                continue;
            };
            let pts = rescale_ts(pts, sink_tb, encoder_tb);
            if self.last_pts.is_some_and(|last| pts <= last) {
                continue;
            }
            self.last_pts = Some(pts);
            filtered.set_pts(Some(pts));
            self.encode(&filtered, muxer)?;
        }
        Ok(())
    }

    fn encode(&mut self, frame: &ffmpeg::util::frame::Video, muxer: &mut FileMuxer) -> Result<()> {
        self.encoder.send_frame(frame)?;
        self.frames += 1;
        self.write_packets(muxer)
    }

    fn write_packets(&mut self, muxer: &mut FileMuxer) -> Result<()> {
        while let Some(mut packet) = self.encoder.receive_packet()? {
            muxer.write_packet(&mut packet, self.out_index)?;
        }
        Ok(())
    }

    fn finish(&mut self, muxer: &mut FileMuxer) -> Result<()> {
        self.encoder.send_eof()?;
        self.write_packets(muxer)
    }
}

/// Build a `buffer -> spec -> buffersink` graph for frames shaped like
/// `frame`, timed in microseconds.
/// Source timestamp of a decoded frame: its pts, else the decoder's
/// best-effort guess.
fn frame_time(frame: &ffmpeg::util::frame::Video) -> Option<i64> {
    frame.pts().or_else(|| frame.timestamp())
}

fn build_graph(frame: &ffmpeg::util::frame::Video, spec: &str) -> Result<ffmpeg::filter::Graph> {
    let mut graph = ffmpeg::filter::Graph::new();

    let aspect = frame.aspect_ratio();
    let (sar_num, sar_den) = if aspect.numerator() <= 0 || aspect.denominator() <= 0 {
        (1, 1)
    } else {
        (aspect.numerator(), aspect.denominator())
    };
    let pix_fmt: ffmpeg::ffi::AVPixelFormat = frame.format().into();
    let args = format!(
        "video_size={}x{}:pix_fmt={}:time_base=1/{}:pixel_aspect={}/{}",
        frame.width(),
        frame.height(),
        pix_fmt as i32,
        crate::types::TIME_SCALE,
        sar_num,
        sar_den
    );

    let buffer = ffmpeg::filter::find("buffer")
        .ok_or_else(|| filter_err("buffer filter", ffmpeg::Error::FilterNotFound))?;
    let buffersink = ffmpeg::filter::find("buffersink")
        .ok_or_else(|| filter_err("buffersink filter", ffmpeg::Error::FilterNotFound))?;

    graph
        .add(&buffer, "in", &args)
        .map_err(|e| filter_err("add buffer source", e))?;
    graph
        .add(&buffersink, "out", "")
        .map_err(|e| filter_err("add buffer sink", e))?;

    graph
        .output("in", 0)
        .and_then(|p| p.input("out", 0))
        .and_then(|p| p.parse(spec))
        .map_err(|e| filter_err(spec, e))?;
    graph.validate().map_err(|e| filter_err("validate graph", e))?;

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;

    #[test]
    fn test_output_frame_rate() {
        let vc = VideoComposition::new(Size::new(640, 360), ffmpeg::Rational::new(1, 30));
        assert_eq!(output_frame_rate(&vc), 30);

        let ntsc = VideoComposition::new(Size::new(640, 360), ffmpeg::Rational::new(1001, 30000));
        assert_eq!(output_frame_rate(&ntsc), 30);
    }

    #[test]
    fn test_frame_time_falls_back_to_best_effort() {
        let mut frame = ffmpeg::util::frame::Video::new(ffmpeg::format::Pixel::YUV420P, 16, 16);
        assert_eq!(frame_time(&frame), None);

        // SAFETY: the frame owns a valid AVFrame.
        unsafe {
            (*frame.as_mut_ptr()).best_effort_timestamp = 1200;
        }
        assert_eq!(frame_time(&frame), Some(1200));

        frame.set_pts(Some(900));
        assert_eq!(frame_time(&frame), Some(900));
    }

    #[test]
    fn test_graph_builds_for_plain_chain() {
        crate::ffmpeg_utils::init().unwrap();
        let frame = ffmpeg::util::frame::Video::new(ffmpeg::format::Pixel::YUV420P, 64, 48);
        let graph = build_graph(&frame, "scale=32:24,setsar=1,fps=30,format=yuv420p");
        assert!(graph.is_ok());
    }
}
