//! Mutable compositions
//!
//! A [`Composition`] is an edit list: each [`CompositionTrack`] holds ordered
//! [`TrackSegment`]s that map a range of a source stream onto the output
//! timeline.  Nothing is decoded here; the export backend walks the segments.

pub mod instruction;
pub mod orientation;

pub use instruction::{CompositionInstruction, LayerInstruction, VideoComposition};
pub use orientation::{
    classify_orientation, render_size, Orientation, VideoOrientation, DEFAULT_TOLERANCE,
};

use std::path::PathBuf;

use crate::error::{MediaError, Result};
use crate::types::{AffineTransform, AssetTrack, MediaTime, Size, TimeRange, TrackKind};

/// A range of a source stream placed on the composition timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    pub source_path: PathBuf,
    pub source_stream_index: usize,
    /// Range in the source stream's own timeline
    pub source_range: TimeRange,
    /// Where the range starts on the composition timeline
    pub target_start: MediaTime,
}

impl TrackSegment {
    pub fn target_range(&self) -> TimeRange {
        self.source_range.shifted_to(self.target_start)
    }

    /// Map a source timestamp to the composition timeline.
    pub fn to_target(&self, source_time: MediaTime) -> MediaTime {
        source_time - self.source_range.start + self.target_start
    }
}

#[derive(Debug, Clone)]
pub struct CompositionTrack {
    track_id: u32,
    kind: TrackKind,
    segments: Vec<TrackSegment>,
    pub preferred_transform: AffineTransform,
    natural_size: Size,
}

impl CompositionTrack {
    fn new(track_id: u32, kind: TrackKind) -> Self {
        Self {
            track_id,
            kind,
            segments: Vec::new(),
            preferred_transform: AffineTransform::IDENTITY,
            natural_size: Size::ZERO,
        }
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Segments ordered by `target_start`, never overlapping.
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Span from the composition origin to the end of the last segment.
    pub fn time_range(&self) -> TimeRange {
        let end = self
            .segments
            .last()
            .map(|s| s.target_range().end())
            .unwrap_or(MediaTime::ZERO);
        TimeRange::from_bounds(MediaTime::ZERO, end)
    }

    /// Copy `range` of `source` into this track so that it starts at `at`.
    ///
    /// The range is clipped to the source track's own range; the part of
    /// `range` that falls before the source track begins shifts the insertion
    /// point accordingly.  Media already at or after `at` is pushed back by
    /// the inserted duration, splitting a segment that straddles `at`.
    pub fn insert_time_range(
        &mut self,
        range: TimeRange,
        source: &AssetTrack,
        at: MediaTime,
    ) -> Result<()> {
        if source.kind != self.kind {
            return Err(MediaError::InvalidTimeRange(format!(
                "cannot insert {} track {} into {} track {}",
                source.kind, source.track_id, self.kind, self.track_id
            )));
        }
        if !range.is_valid() || range.is_empty() || at.is_negative() {
            return Err(MediaError::InvalidTimeRange(format!(
                "range {} at {} is not insertable",
                range, at
            )));
        }
        let clipped = range.intersection(&source.time_range).ok_or_else(|| {
            MediaError::InvalidTimeRange(format!(
                "range {} lies outside source track {} {}",
                range, source.track_id, source.time_range
            ))
        })?;

        let insert_at = at + (clipped.start - range.start);
        let segment = TrackSegment {
            source_path: source.source_path.clone(),
            source_stream_index: source.stream_index,
            source_range: clipped,
            target_start: insert_at,
        };
        self.splice(segment);

        if self.natural_size.is_empty() {
            self.natural_size = source.natural_size;
        }

        tracing::debug!(
            track_id = self.track_id,
            kind = %self.kind,
            source = %clipped,
            at = %insert_at,
            "inserted time range"
        );
        Ok(())
    }

    fn splice(&mut self, segment: TrackSegment) {
        let at = segment.target_start;
        let shift = segment.source_range.duration;
        let mut result = Vec::with_capacity(self.segments.len() + 2);
        let mut inserted = false;

        for existing in self.segments.drain(..) {
            let range = existing.target_range();
            if range.end() <= at {
                result.push(existing);
                continue;
            }
            if range.start < at {
                // Straddles the insertion point: keep the head in place and
                // move the tail behind the new segment.
                let head_len = at - range.start;
                let head = TrackSegment {
                    source_range: TimeRange::new(existing.source_range.start, head_len),
                    ..existing.clone()
                };
                let tail = TrackSegment {
                    source_range: TimeRange::new(
                        existing.source_range.start + head_len,
                        existing.source_range.duration - head_len,
                    ),
                    target_start: at + shift,
                    ..existing
                };
                result.push(head);
                result.push(segment.clone());
                result.push(tail);
                inserted = true;
                continue;
            }
            if !inserted {
                result.push(segment.clone());
                inserted = true;
            }
            result.push(TrackSegment {
                target_start: existing.target_start + shift,
                ..existing
            });
        }
        if !inserted {
            result.push(segment);
        }
        self.segments = result;
    }
}

/// Mutable collection of composition tracks
#[derive(Debug, Clone, Default)]
pub struct Composition {
    tracks: Vec<CompositionTrack>,
    next_track_id: u32,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty track and return a handle to it.  Track ids start at 1
    /// and are never reused within a composition.
    pub fn add_mutable_track(&mut self, kind: TrackKind) -> &mut CompositionTrack {
        self.next_track_id += 1;
        self.tracks
            .push(CompositionTrack::new(self.next_track_id, kind));
        let last = self.tracks.len() - 1;
        &mut self.tracks[last]
    }

    pub fn all_tracks(&self) -> &[CompositionTrack] {
        &self.tracks
    }

    pub fn tracks(&self, kind: TrackKind) -> impl Iterator<Item = &CompositionTrack> + '_ {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn track(&self, track_id: u32) -> Option<&CompositionTrack> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn track_mut(&mut self, track_id: u32) -> Option<&mut CompositionTrack> {
        self.tracks.iter_mut().find(|t| t.track_id == track_id)
    }

    /// End of the latest segment on any track.
    pub fn duration(&self) -> MediaTime {
        self.tracks
            .iter()
            .map(|t| t.time_range().end())
            .max()
            .unwrap_or(MediaTime::ZERO)
    }

    /// True when no track holds any media.
    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(CompositionTrack::is_empty)
    }
}
