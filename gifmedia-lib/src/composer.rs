//! Subtitled video composition.
//!
//! Builds a composition of an asset's first video and first audio track,
//! describes how to render it upright at its display size, attaches a
//! subtitle overlay generated from recognised speech and exports the result
//! as a QuickTime movie.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::composition::{
    classify_orientation, render_size, Composition, CompositionInstruction, LayerInstruction,
    VideoComposition, VideoOrientation,
};
use crate::config::{ComposerConfig, ExportConfig};
use crate::error::{MediaError, Result};
use crate::export::{
    ExportBackend, ExportPreset, ExportSession, ExportStatus, FfmpegBackend, OutputFileType,
};
use crate::ffmpeg_utils::utils::frame_duration;
use crate::subtitle::{DynamicSubtitles, SpeechEntry, SubtitleOverlay};
use crate::types::{Asset, MediaTime, TimeRange, TrackKind};

/// A composition ready for export.
#[derive(Debug, Clone)]
pub struct PreparedComposition {
    pub composition: Composition,
    pub video_composition: VideoComposition,
    pub orientation: VideoOrientation,
}

pub struct SubtitledVideoComposer {
    config: ComposerConfig,
    backend: Arc<dyn ExportBackend>,
    overlay: Arc<dyn SubtitleOverlay>,
}

impl fmt::Debug for SubtitledVideoComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtitledVideoComposer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for SubtitledVideoComposer {
    fn default() -> Self {
        Self::new(ComposerConfig::default(), ExportConfig::default())
    }
}

impl SubtitledVideoComposer {
    /// Composer exporting through FFmpeg with [`DynamicSubtitles`].
    pub fn new(config: ComposerConfig, export: ExportConfig) -> Self {
        let overlay = Arc::new(DynamicSubtitles::new(config.subtitle.clone()));
        Self {
            config,
            backend: Arc::new(FfmpegBackend::new(export)),
            overlay,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ExportBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_overlay(mut self, overlay: Arc<dyn SubtitleOverlay>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Build the composition and its render description.
    ///
    /// Fails with `NoAudio` when the asset has no usable audio track (checked
    /// first) and `NoVideo` when it has no usable video track.
    pub fn prepare(
        &self,
        asset: &Asset,
        speech: &[Option<SpeechEntry>],
    ) -> Result<PreparedComposition> {
        let Some(audio) = asset.first_track(TrackKind::Audio) else {
            tracing::error!("No audio during video/audio composition.");
            return Err(MediaError::NoAudio);
        };
        let Some(video) = asset.first_track(TrackKind::Video) else {
            tracing::error!("No video during video/audio composition.");
            return Err(MediaError::NoVideo);
        };

        let full = TimeRange::new(MediaTime::ZERO, asset.duration());

        let mut composition = Composition::new();
        let video_track_id = composition.add_mutable_track(TrackKind::Video).track_id();
        let audio_track_id = composition.add_mutable_track(TrackKind::Audio).track_id();

        if let Some(track) = composition.track_mut(audio_track_id) {
            if let Err(e) = track.insert_time_range(full, audio, MediaTime::ZERO) {
                tracing::error!("No audio during video/audio composition: {}", e);
                return Err(MediaError::NoAudio);
            }
        }
        if let Some(track) = composition.track_mut(video_track_id) {
            if let Err(e) = track.insert_time_range(full, video, MediaTime::ZERO) {
                tracing::error!("No video during video/audio composition: {}", e);
                return Err(MediaError::NoVideo);
            }
        }

        let mut layer = LayerInstruction::new(video_track_id);
        layer.set_transform(video.preferred_transform, MediaTime::ZERO);
        layer.set_opacity(0.0, asset.duration());

        let mut instruction = CompositionInstruction::new(full);
        instruction.layer_instructions.push(layer);

        let orientation =
            classify_orientation(&video.preferred_transform, self.config.orientation_tolerance);
        let size = render_size(video.natural_size, orientation);

        let mut video_composition =
            VideoComposition::new(size, frame_duration(self.config.frame_rate));
        video_composition.orientation_tolerance = self.config.orientation_tolerance;
        video_composition.instructions.push(instruction);
        self.overlay.apply(&mut video_composition, speech, size);

        tracing::debug!(
            source = %asset.source_path().display(),
            orientation = ?orientation.orientation,
            portrait = orientation.is_portrait,
            render_size = %size,
            duration = %asset.duration(),
            "composition prepared"
        );

        Ok(PreparedComposition {
            composition,
            video_composition,
            orientation,
        })
    }

    /// A fresh output location in the configured directory.
    pub fn output_path(&self) -> PathBuf {
        self.config.output_dir().join(format!(
            "{}{}.{}",
            self.config.file_prefix,
            uuid::Uuid::new_v4().simple(),
            OutputFileType::QuickTimeMovie.extension()
        ))
    }

    /// Burn `speech` into a copy of `asset` and return the movie's path.
    pub async fn compose(&self, asset: &Asset, speech: &[Option<SpeechEntry>]) -> Result<PathBuf> {
        let prepared = self.prepare(asset, speech)?;
        let output = self.output_path();

        let mut session = ExportSession::new(
            prepared.composition,
            ExportPreset::HighestQuality,
            self.backend.clone(),
        )?;
        session.set_output_path(&output);
        session.set_output_file_type(OutputFileType::QuickTimeMovie);
        session.set_video_composition(prepared.video_composition);
        session.set_optimize_for_network_use(true);

        match session.export().await {
            ExportStatus::Completed => {
                tracing::debug!(
                    output = %output.display(),
                    "Successfully exported video with dynamic subtitles."
                );
                Ok(output)
            }
            status => {
                let detail = session
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| format!("{:?}", status));
                Err(MediaError::ExportFailed(detail))
            }
        }
    }
}
