//! FFmpeg utility functions

use ffmpeg_next as ffmpeg;

/// Convert a timestamp between timebases, rounding to nearest.
pub fn rescale_ts(ts: i64, from: ffmpeg::Rational, to: ffmpeg::Rational) -> i64 {
    // SAFETY: pure arithmetic on plain values.
    unsafe { ffmpeg::ffi::av_rescale_q(ts, from.into(), to.into()) }
}

/// Short name of a media type for logs
pub fn media_type_name(media_type: ffmpeg::media::Type) -> &'static str {
    match media_type {
        ffmpeg::media::Type::Video => "video",
        ffmpeg::media::Type::Audio => "audio",
        ffmpeg::media::Type::Subtitle => "subtitle",
        ffmpeg::media::Type::Data => "data",
        ffmpeg::media::Type::Attachment => "attachment",
        _ => "unknown",
    }
}

/// `language` tag of a stream, if any
pub fn get_stream_language(stream: &ffmpeg::Stream) -> Option<String> {
    stream.metadata().get("language").map(|s| s.to_string())
}

/// Frame rate for a frame duration of `1/fps` seconds.
pub fn frame_duration(fps: u32) -> ffmpeg::Rational {
    ffmpeg::Rational::new(1, fps.max(1) as i32)
}

/// Timestamp of a stream's first sample, treating `AV_NOPTS_VALUE` as zero.
pub fn stream_start_ts(stream: &ffmpeg::Stream) -> i64 {
    let start = stream.start_time();
    if start == ffmpeg::ffi::AV_NOPTS_VALUE {
        0
    } else {
        start
    }
}

/// Log one probed stream at debug level.
pub fn debug_stream_info(stream: &ffmpeg::Stream, index: usize) {
    let params = stream.parameters();
    tracing::debug!(
        stream = index,
        kind = media_type_name(params.medium()),
        codec = params.id().name(),
        language = get_stream_language(stream).as_deref().unwrap_or("-"),
        "probed stream"
    );
}
