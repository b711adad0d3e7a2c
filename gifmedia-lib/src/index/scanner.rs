//! File scanner - probes a media file into an [`Asset`]
//!
//! Only the container header is parsed; no media data is read.  Streams
//! other than audio and video are skipped, and so is cover art.

use std::path::Path;

use ffmpeg_next as ffmpeg;

use crate::error::{FfmpegError, Result};
use crate::ffmpeg_utils::utils::{debug_stream_info, stream_start_ts};
use crate::types::{Asset, MediaTime, TimeRange};

use super::audio::is_audio_codec;
use super::{analyze_audio_stream, analyze_video_stream, is_attached_picture};

/// Open a media file and describe its audio and video tracks.
pub fn scan_asset<P: AsRef<Path>>(path: P) -> Result<Asset> {
    let path = path.as_ref();
    let context = ffmpeg::format::input(&path)
        .map_err(|e| FfmpegError::OpenInput(format!("Failed to open {:?}: {}", path, e)))?;

    // AVFormatContext.duration is in AV_TIME_BASE (microsecond) units.
    let container_duration = MediaTime::from_micros(context.duration().max(0));

    let mut tracks = Vec::new();
    for (i, stream) in context.streams().into_iter().enumerate() {
        debug_stream_info(&stream, i);
        let medium = stream.parameters().medium();
        let range = stream_time_range(&stream, container_duration);

        let analyzed = match medium {
            ffmpeg::media::Type::Video if is_attached_picture(stream.disposition()) => {
                tracing::debug!("Skipping stream {} (attached picture)", i);
                continue;
            }
            ffmpeg::media::Type::Video => analyze_video_stream(&stream, i, path, range),
            ffmpeg::media::Type::Audio => {
                let id = stream.parameters().id();
                if !is_audio_codec(id) {
                    tracing::debug!("Audio stream {} uses uncommon codec {}", i, id.name());
                }
                analyze_audio_stream(&stream, i, path, range)
            }
            _ => {
                tracing::debug!("Skipping stream {} (type={:?})", i, medium);
                continue;
            }
        };

        match analyzed {
            Ok(track) => {
                tracing::debug!(
                    "Found {} track {}: range={}, size={}, rate={}Hz",
                    track.kind,
                    track.track_id,
                    track.time_range,
                    track.natural_size,
                    track.sample_rate
                );
                tracks.push(track);
            }
            Err(e) => tracing::warn!("Failed to analyze stream {}: {}", i, e),
        }
    }

    let duration = tracks
        .iter()
        .map(|t| t.time_range.end())
        .max()
        .unwrap_or(MediaTime::ZERO)
        .max(container_duration);

    tracing::debug!(
        path = %path.display(),
        duration = %duration,
        tracks = tracks.len(),
        "asset scanned"
    );

    Ok(Asset::new(path, duration, tracks))
}

/// Time range of a stream in its own timeline.
///
/// Uses the stream duration when the container records one, otherwise the
/// container duration minus the stream's start.
fn stream_time_range(stream: &ffmpeg::Stream, container_duration: MediaTime) -> TimeRange {
    let tb = stream.time_base();
    let start = MediaTime::from_ts(stream_start_ts(stream), tb);
    let duration = match stream.duration() {
        d if d > 0 && d != ffmpeg::ffi::AV_NOPTS_VALUE => MediaTime::from_ts(d, tb),
        _ => container_duration - start,
    };
    track_range(start, duration)
}

/// Clamp a probed range so that it never starts before zero or has a
/// negative duration.
fn track_range(start: MediaTime, duration: MediaTime) -> TimeRange {
    let start = start.max(MediaTime::ZERO);
    TimeRange::new(start, duration.max(MediaTime::ZERO))
}
