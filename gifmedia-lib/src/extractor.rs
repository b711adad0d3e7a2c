//! Audio track extraction.

use std::path::Path;
use std::sync::Arc;

use crate::composition::Composition;
use crate::config::ExportConfig;
use crate::error::{MediaError, Result};
use crate::export::{
    ExportBackend, ExportPreset, ExportSession, ExportStatus, FfmpegBackend, OutputFileType,
};
use crate::types::{Asset, TrackKind};

/// Composition holding one track per audio track of `asset`.
///
/// Each source track is inserted over its full range at its own start.  A
/// track whose insertion fails stays empty.
pub fn audio_composition(asset: &Asset) -> Composition {
    let mut composition = Composition::new();
    for track in asset.tracks(TrackKind::Audio) {
        let composition_track = composition.add_mutable_track(TrackKind::Audio);
        if let Err(e) =
            composition_track.insert_time_range(track.time_range, track, track.time_range.start)
        {
            tracing::warn!(
                track_id = track.track_id,
                "audio track left empty: {}",
                e
            );
        }
        composition_track.preferred_transform = track.preferred_transform;
    }
    composition
}

/// Write the audio tracks of `asset` to an M4A file at `output`.
pub async fn extract_audio(asset: &Asset, output: &Path) -> Result<()> {
    let backend: Arc<dyn ExportBackend> = Arc::new(FfmpegBackend::new(ExportConfig::default()));
    extract_audio_with(backend, asset, output).await
}

/// [`extract_audio`] with an explicit export backend.
pub async fn extract_audio_with(
    backend: Arc<dyn ExportBackend>,
    asset: &Asset,
    output: &Path,
) -> Result<()> {
    let composition = audio_composition(asset);
    tracing::debug!(
        source = %asset.source_path().display(),
        tracks = composition.all_tracks().len(),
        "extracting audio"
    );

    let mut session = ExportSession::new(composition, ExportPreset::AppleM4A, backend)?;
    session.set_output_file_type(OutputFileType::AppleM4A);
    session.set_output_path(output);

    match session.export().await {
        ExportStatus::Completed => Ok(()),
        status => Err(MediaError::ExportFailed(format!(
            "audio export ended as {:?}",
            status
        ))),
    }
}
