//! Export backend built on FFmpeg.

use std::path::{Path, PathBuf};

use crate::composition::{CompositionTrack, VideoComposition};
use crate::config::ExportConfig;
use crate::error::{FfmpegError, MediaError, Result};
use crate::subtitle::ass::render_ass;
use crate::transcode::encoder::{is_aac_encoder_available, is_h264_encoder_available};
use crate::types::TrackKind;

use super::audio_track::AudioTrackWriter;
use super::muxer::FileMuxer;
use super::preset::ExportPreset;
use super::session::{CancelFlag, ExportBackend, ExportJob};
use super::video_track::VideoTrackWriter;

/// Decodes the composition's sources and encodes H.264/AAC into an M4A or
/// MOV file.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    config: ExportConfig,
}

impl FfmpegBackend {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn write(&self, job: &ExportJob, cancel: &CancelFlag) -> Result<()> {
        let audio_tracks: Vec<&CompositionTrack> = if job.preset.exports(TrackKind::Audio) {
            job.composition
                .tracks(TrackKind::Audio)
                .filter(|t| !t.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        let video = match &job.video_composition {
            Some(vc) if job.preset.exports(TrackKind::Video) && job.file_type.allows_video() => job
                .composition
                .tracks(TrackKind::Video)
                .find(|t| !t.is_empty())
                .map(|t| (t, vc)),
            _ => None,
        };

        if audio_tracks.is_empty() && video.is_none() {
            return Err(MediaError::EmptyComposition);
        }

        // The ass filter reads its script from disk.
        let subtitles = match video.and_then(|(_, vc)| vc.subtitle_overlay.as_ref()) {
            Some(overlay) if !overlay.cues.is_empty() => {
                let path = job.output_path.with_extension("ass");
                std::fs::write(&path, render_ass(overlay))?;
                Some(TempFile::new(path))
            }
            _ => None,
        };

        // ── Streams and header ─────────────────────────────────────────────
        // From here on the file is ours; anything short of a trailer removes it.
        let muxer = FileMuxer::create(&job.output_path, job.file_type)?;
        let unfinished = TempFile::new(job.output_path.clone());
        self.write_tracks(
            muxer,
            job,
            &audio_tracks,
            video,
            subtitles.as_ref().map(|f| f.path.as_path()),
            cancel,
        )?;
        unfinished.keep();
        Ok(())
    }

    fn write_tracks(
        &self,
        mut muxer: FileMuxer,
        job: &ExportJob,
        audio_tracks: &[&CompositionTrack],
        video: Option<(&CompositionTrack, &VideoComposition)>,
        subtitle_file: Option<&Path>,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let video_writer = match video {
            Some((_, vc)) => Some(VideoTrackWriter::open(&mut muxer, &self.config, vc)?),
            None => None,
        };
        let audio_writers = audio_tracks
            .iter()
            .map(|_| AudioTrackWriter::open(&mut muxer, &self.config))
            .collect::<Result<Vec<_>>>()?;
        muxer.write_header(job.optimize_for_network_use)?;

        // ── Tracks ─────────────────────────────────────────────────────────
        if let (Some(writer), Some((track, vc))) = (video_writer, video) {
            writer.write(track, vc, subtitle_file, &mut muxer, cancel)?;
        }
        for (writer, track) in audio_writers.into_iter().zip(audio_tracks) {
            writer.write(track, &mut muxer, cancel)?;
        }

        cancel.check()?;
        muxer.finish()
    }
}

impl ExportBackend for FfmpegBackend {
    fn supports(&self, preset: ExportPreset) -> Result<()> {
        let available = match preset {
            ExportPreset::AppleM4A => is_aac_encoder_available(),
            ExportPreset::HighestQuality => is_aac_encoder_available() && is_h264_encoder_available(),
        };
        if available {
            Ok(())
        } else {
            Err(FfmpegError::EncoderNotFound(format!("no encoders for {:?}", preset)).into())
        }
    }

    fn run(&self, job: &ExportJob, cancel: &CancelFlag) -> Result<()> {
        self.write(job, cancel)
    }
}

/// Removes the file when dropped, unless kept.
struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed unfinished file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "could not remove file: {}", e),
        }
    }
}
