//! Export sessions.
//!
//! An [`ExportSession`] takes a composition and an output descriptor and runs
//! an [`ExportBackend`] on a blocking worker thread.  A session moves from
//! `Idle` through `Exporting` to exactly one terminal status and never runs
//! twice.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::composition::{Composition, VideoComposition};
use crate::error::{MediaError, Result};

use super::preset::{ExportPreset, OutputFileType};

/// Lifecycle of an export session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Idle,
    Exporting,
    Completed,
    Failed,
    Cancelled,
    /// The worker ended without reporting an outcome
    Unknown,
}

impl ExportStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExportStatus::Idle | ExportStatus::Exporting)
    }
}

/// Shared cancellation flag, polled by backends between packets.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MediaError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a backend needs to write one output file.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub composition: Composition,
    pub preset: ExportPreset,
    pub output_path: PathBuf,
    pub file_type: OutputFileType,
    pub video_composition: Option<VideoComposition>,
    /// Place the index at the front of the file (`movflags=+faststart`)
    pub optimize_for_network_use: bool,
}

/// Performs the media work of an export.
pub trait ExportBackend: Send + Sync + 'static {
    /// Fail if the backend cannot encode `preset` at all.
    fn supports(&self, preset: ExportPreset) -> Result<()>;

    /// Write the job's output file.  Blocking.  Implementations return
    /// `Err(MediaError::Cancelled)` when `cancel` fires.
    fn run(&self, job: &ExportJob, cancel: &CancelFlag) -> Result<()>;
}

pub struct ExportSession {
    composition: Option<Composition>,
    preset: ExportPreset,
    backend: Arc<dyn ExportBackend>,
    output_path: Option<PathBuf>,
    file_type: Option<OutputFileType>,
    video_composition: Option<VideoComposition>,
    optimize_for_network_use: bool,
    status: ExportStatus,
    error: Option<MediaError>,
    cancel: CancelFlag,
}

impl ExportSession {
    /// Create a session, failing with `ExportConstruction` when the backend
    /// cannot handle `preset`.
    pub fn new(
        composition: Composition,
        preset: ExportPreset,
        backend: Arc<dyn ExportBackend>,
    ) -> Result<Self> {
        backend
            .supports(preset)
            .map_err(|e| MediaError::ExportConstruction(format!("{:?}: {}", preset, e)))?;

        Ok(Self {
            composition: Some(composition),
            preset,
            backend,
            output_path: None,
            file_type: None,
            video_composition: None,
            optimize_for_network_use: false,
            status: ExportStatus::Idle,
            error: None,
            cancel: CancelFlag::new(),
        })
    }

    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = Some(path.into());
    }

    pub fn set_output_file_type(&mut self, file_type: OutputFileType) {
        self.file_type = Some(file_type);
    }

    pub fn set_video_composition(&mut self, video_composition: VideoComposition) {
        self.video_composition = Some(video_composition);
    }

    pub fn set_optimize_for_network_use(&mut self, optimize: bool) {
        self.optimize_for_network_use = optimize;
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn preset(&self) -> ExportPreset {
        self.preset
    }

    pub fn status(&self) -> ExportStatus {
        self.status
    }

    /// Error recorded when the session failed.
    pub fn error(&self) -> Option<&MediaError> {
        self.error.as_ref()
    }

    /// Request cancellation.  Takes effect before the export starts or at the
    /// backend's next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle that cancels this session from another task.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the export and return its terminal status.
    ///
    /// Calling this again after the first run returns the recorded status
    /// without exporting again.
    pub async fn export(&mut self) -> ExportStatus {
        if self.status != ExportStatus::Idle {
            return self.status;
        }
        let Some(composition) = self.composition.take() else {
            return self.finish(ExportStatus::Unknown, None);
        };
        if self.cancel.is_cancelled() {
            return self.finish(ExportStatus::Cancelled, Some(MediaError::Cancelled));
        }
        let (output_path, file_type) = match (self.output_path.clone(), self.file_type) {
            (Some(path), Some(file_type)) => (path, file_type),
            _ => {
                let err = MediaError::ExportFailed("output path and file type must be set".into());
                return self.finish(ExportStatus::Failed, Some(err));
            }
        };

        let job = ExportJob {
            composition,
            preset: self.preset,
            output_path,
            file_type,
            video_composition: self.video_composition.take(),
            optimize_for_network_use: self.optimize_for_network_use,
        };

        tracing::debug!(
            preset = ?job.preset,
            output = %job.output_path.display(),
            container = job.file_type.muxer(),
            "export started"
        );
        self.status = ExportStatus::Exporting;

        let backend = self.backend.clone();
        let cancel = self.cancel.clone();
        let joined = tokio::task::spawn_blocking(move || backend.run(&job, &cancel)).await;

        match joined {
            Ok(Ok(())) => self.finish(ExportStatus::Completed, None),
            Ok(Err(MediaError::Cancelled)) => {
                self.finish(ExportStatus::Cancelled, Some(MediaError::Cancelled))
            }
            Ok(Err(e)) => self.finish(ExportStatus::Failed, Some(e)),
            Err(join_err) => {
                tracing::error!("export worker did not finish: {}", join_err);
                self.finish(ExportStatus::Unknown, None)
            }
        }
    }

    fn finish(&mut self, status: ExportStatus, error: Option<MediaError>) -> ExportStatus {
        match (&status, &error) {
            (ExportStatus::Completed, _) => tracing::info!(
                output = ?self.output_path,
                "export completed"
            ),
            (_, Some(e)) => tracing::warn!(status = ?status, "export ended: {}", e),
            _ => tracing::warn!(status = ?status, "export ended"),
        }
        self.status = status;
        self.error = error;
        status
    }
}
