//! Video stream analysis

use std::path::Path;

use crate::error::Result;
use crate::ffmpeg_utils::helpers::{
    codec_params_display_matrix, codec_params_height, codec_params_width,
};
use crate::ffmpeg_utils::utils::get_stream_language;
use crate::types::{AffineTransform, AssetTrack, Size, TimeRange};
use ffmpeg_next as ffmpeg;

/// Cover art (an MP4 `covr` atom, an ID3 picture) shows up as a one-frame
/// video stream.  It is not a video track of the asset.
pub fn is_attached_picture(disposition: ffmpeg::format::stream::Disposition) -> bool {
    disposition.contains(ffmpeg::format::stream::Disposition::ATTACHED_PIC)
}

/// Describe a video stream as an asset track.
///
/// The preferred transform comes from the container's display matrix and
/// defaults to the identity.
pub fn analyze_video_stream(
    stream: &ffmpeg::Stream,
    index: usize,
    source_path: &Path,
    time_range: TimeRange,
) -> Result<AssetTrack> {
    let params = stream.parameters();
    let natural_size = Size::new(codec_params_width(&params), codec_params_height(&params));
    let preferred_transform = codec_params_display_matrix(&params)
        .map(|m| AffineTransform::from_display_matrix(&m))
        .unwrap_or(AffineTransform::IDENTITY);

    let mut track = AssetTrack::video(
        index,
        source_path,
        time_range,
        natural_size,
        preferred_transform,
    );
    track.codec_id = params.id();
    track.language = get_stream_language(stream);
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg::format::stream::Disposition;

    #[test]
    fn test_attached_picture_detection() {
        assert!(is_attached_picture(Disposition::ATTACHED_PIC));
        assert!(is_attached_picture(Disposition::ATTACHED_PIC | Disposition::DEFAULT));
        assert!(!is_attached_picture(Disposition::DEFAULT));
        assert!(!is_attached_picture(Disposition::empty()));
    }
}
