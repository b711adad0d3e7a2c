use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::composer::SubtitledVideoComposer;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::export::{ExportBackend, FfmpegBackend};
use crate::extractor::extract_audio_with;
use crate::subtitle::load_speech_file;
use crate::types::{Asset, TrackKind};

/// Summary of a media file, as printed by `gifmedia info`
pub struct MediaInfo {
    pub file_size: u64,
    pub duration_secs: f64,
    pub tracks: Vec<TrackInfo>,
}

pub struct TrackInfo {
    pub id: String,
    pub track_type: TrackType,
    pub codec_id: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackType {
    Video {
        width: u32,
        height: u32,
        portrait: bool,
    },
    Audio {
        channels: u16,
        sample_rate: u32,
    },
}

/// Probe a media file and summarise its tracks
pub fn parse_file(path: &Path) -> Result<MediaInfo> {
    let asset = Asset::load(path)?;

    let tracks = asset
        .all_tracks()
        .iter()
        .map(|t| TrackInfo {
            id: match t.kind {
                TrackKind::Video => format!("v/{}", t.stream_index),
                TrackKind::Audio => format!("a/{}", t.stream_index),
            },
            track_type: match t.kind {
                TrackKind::Video => TrackType::Video {
                    width: t.natural_size.width,
                    height: t.natural_size.height,
                    portrait: crate::composition::classify_orientation(
                        &t.preferred_transform,
                        crate::composition::DEFAULT_TOLERANCE,
                    )
                    .is_portrait,
                },
                TrackKind::Audio => TrackType::Audio {
                    channels: t.channels,
                    sample_rate: t.sample_rate,
                },
            },
            codec_id: format!("{:?}", t.codec_id),
            language: t.language.clone(),
        })
        .collect();

    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    Ok(MediaInfo {
        file_size,
        duration_secs: asset.duration().as_secs_f64(),
        tracks,
    })
}

/// Load `input` and write its audio tracks to `output` as M4A
pub async fn extract_audio_file(input: &Path, output: &Path, config: &ExportConfig) -> Result<()> {
    let asset = Asset::load(input)?;
    let backend: Arc<dyn ExportBackend> = Arc::new(FfmpegBackend::new(config.clone()));
    extract_audio_with(backend, &asset, output).await
}

/// Load `input` and a speech JSON file, and render the subtitled movie
pub async fn compose_file(
    composer: &SubtitledVideoComposer,
    input: &Path,
    speech_json: &Path,
) -> Result<PathBuf> {
    let asset = Asset::load(input)?;
    let speech = load_speech_file(speech_json)?;
    tracing::info!(
        source = %input.display(),
        entries = speech.len(),
        duration = %asset.duration(),
        "asset loaded"
    );
    composer.compose(&asset, &speech).await
}
