//! Audio stream analysis

use std::path::Path;

use crate::error::Result;
use crate::ffmpeg_utils::helpers::{codec_params_channels, codec_params_sample_rate};
use crate::ffmpeg_utils::utils::get_stream_language;
use crate::types::{AssetTrack, TimeRange};
use ffmpeg_next as ffmpeg;

/// Describe an audio stream as an asset track.
pub fn analyze_audio_stream(
    stream: &ffmpeg::Stream,
    index: usize,
    source_path: &Path,
    time_range: TimeRange,
) -> Result<AssetTrack> {
    let params = stream.parameters();
    let mut track = AssetTrack::audio(
        index,
        source_path,
        time_range,
        codec_params_sample_rate(&params),
        codec_params_channels(&params),
    );
    track.codec_id = params.id();
    track.language = get_stream_language(stream);
    Ok(track)
}

/// Check if a codec is one the export pipeline decodes routinely
pub fn is_audio_codec(codec_id: ffmpeg::codec::Id) -> bool {
    matches!(
        codec_id,
        ffmpeg::codec::Id::AAC
            | ffmpeg::codec::Id::AC3
            | ffmpeg::codec::Id::EAC3
            | ffmpeg::codec::Id::OPUS
            | ffmpeg::codec::Id::VORBIS
            | ffmpeg::codec::Id::MP3
            | ffmpeg::codec::Id::FLAC
            | ffmpeg::codec::Id::ALAC
            | ffmpeg::codec::Id::PCM_S16LE
            | ffmpeg::codec::Id::PCM_S16BE
            | ffmpeg::codec::Id::PCM_S24LE
    )
}
