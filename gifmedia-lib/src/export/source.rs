//! Opening and positioning the source stream of a composition segment.

use crate::composition::TrackSegment;
use crate::error::{FfmpegError, MediaError, Result};
use crate::types::MediaTime;
use ffmpeg_next as ffmpeg;

/// Demuxer positioned at the start of a segment's source range.
pub struct SegmentSource {
    pub input: ffmpeg::format::context::Input,
    pub stream_index: usize,
    pub time_base: ffmpeg::Rational,
}

impl SegmentSource {
    /// Open the segment's source file and seek to the keyframe at or before
    /// the start of its source range.
    pub fn open(segment: &TrackSegment) -> Result<Self> {
        let mut input = ffmpeg::format::input(&segment.source_path).map_err(|e| {
            FfmpegError::OpenInput(format!("{}: {}", segment.source_path.display(), e))
        })?;

        let time_base = input
            .stream(segment.source_stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| {
                MediaError::StreamNotFound(format!(
                    "stream {} in {}",
                    segment.source_stream_index,
                    segment.source_path.display()
                ))
            })?;

        let start = segment.source_range.start;
        if start > MediaTime::ZERO {
            // Container-level seek timestamps are in AV_TIME_BASE units, which
            // match MediaTime's microseconds.
            let ts = start.as_micros();
            input
                .seek(ts, ..ts)
                .map_err(|e| FfmpegError::ReadFrame(format!("seek to {}: {}", start, e)))?;
        }

        tracing::trace!(
            path = %segment.source_path.display(),
            stream = segment.source_stream_index,
            start = %start,
            "segment source opened"
        );

        Ok(Self {
            input,
            stream_index: segment.source_stream_index,
            time_base,
        })
    }

    /// The source stream, for opening a decoder.
    pub fn stream(&self) -> Result<ffmpeg::format::stream::Stream<'_>> {
        self.input.stream(self.stream_index).ok_or_else(|| {
            MediaError::StreamNotFound(format!("stream {}", self.stream_index))
        })
    }
}
