//! Core media model: time values, geometry and decoded assets.

use ffmpeg_next as ffmpeg;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::path::{Path, PathBuf};

use crate::ffmpeg_utils::utils::rescale_ts;

/// Ticks per second of [`MediaTime`] (same as `AV_TIME_BASE`)
pub const TIME_SCALE: i32 = 1_000_000;

/// A point or span on a media timeline, stored in microseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime(0);

    pub const fn from_micros(micros: i64) -> Self {
        MediaTime(micros)
    }

    pub fn from_millis(millis: i64) -> Self {
        MediaTime(millis.saturating_mul(1000))
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        MediaTime((secs * TIME_SCALE as f64).round() as i64)
    }

    /// Convert a timestamp expressed in `timebase` units.
    pub fn from_ts(ts: i64, timebase: ffmpeg::Rational) -> Self {
        MediaTime(rescale_ts(ts, timebase, Self::time_base()))
    }

    /// Express this time in `timebase` units.
    pub fn to_ts(self, timebase: ffmpeg::Rational) -> i64 {
        rescale_ts(self.0, Self::time_base(), timebase)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TIME_SCALE as f64
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// The FFmpeg timebase matching [`TIME_SCALE`].
    pub fn time_base() -> ffmpeg::Rational {
        ffmpeg::Rational::new(1, TIME_SCALE)
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// A half-open span `[start, start + duration)` on a timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub const fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self { start, duration }
    }

    /// Range covering `[start, end)`. An `end` before `start` yields a zero-length range.
    pub fn from_bounds(start: MediaTime, end: MediaTime) -> Self {
        let duration = if end > start { end - start } else { MediaTime::ZERO };
        Self { start, duration }
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }

    /// Start and duration are both non-negative.
    pub fn is_valid(&self) -> bool {
        !self.start.is_negative() && !self.duration.is_negative()
    }

    pub fn is_empty(&self) -> bool {
        self.duration == MediaTime::ZERO
    }

    pub fn contains(&self, time: MediaTime) -> bool {
        time >= self.start && time < self.end()
    }

    /// Overlap of two ranges, or `None` if they do not overlap.
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        if end > start {
            Some(TimeRange::from_bounds(start, end))
        } else {
            None
        }
    }

    /// Same duration, moved to begin at `start`.
    pub fn shifted_to(&self, start: MediaTime) -> TimeRange {
        TimeRange::new(start, self.duration)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start, self.end())
    }
}

/// 2D affine transform applied when presenting a video track.
///
/// Same layout as a QuickTime `tkhd` matrix: a point `(x, y)` maps to
/// `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Build from an FFmpeg display matrix (nine `i32`, 16.16 fixed point for
    /// the rotation/scale and translation entries).
    pub fn from_display_matrix(matrix: &[i32; 9]) -> Self {
        let fixed = |v: i32| v as f64 / 65536.0;
        Self {
            a: fixed(matrix[0]),
            b: fixed(matrix[1]),
            c: fixed(matrix[3]),
            d: fixed(matrix[4]),
            tx: fixed(matrix[6]),
            ty: fixed(matrix[7]),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width and height exchanged.
    pub const fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Rounded down to even dimensions, as 4:2:0 encoders require.
    pub const fn even(self) -> Self {
        Self {
            width: self.width & !1,
            height: self.height & !1,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn media_type(self) -> ffmpeg::media::Type {
        match self {
            TrackKind::Video => ffmpeg::media::Type::Video,
            TrackKind::Audio => ffmpeg::media::Type::Audio,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// A single audio or video stream of an [`Asset`].
#[derive(Debug, Clone)]
pub struct AssetTrack {
    pub track_id: u32,
    pub stream_index: usize,
    pub kind: TrackKind,
    pub source_path: PathBuf,
    pub time_range: TimeRange,
    pub preferred_transform: AffineTransform,
    /// Coded frame size (video only)
    pub natural_size: Size,
    /// Sample rate in Hz (audio only)
    pub sample_rate: u32,
    /// Channel count (audio only)
    pub channels: u16,
    pub codec_id: ffmpeg::codec::Id,
    pub language: Option<String>,
}

impl AssetTrack {
    pub fn video(
        stream_index: usize,
        source_path: impl Into<PathBuf>,
        time_range: TimeRange,
        natural_size: Size,
        preferred_transform: AffineTransform,
    ) -> Self {
        Self {
            track_id: stream_index as u32 + 1,
            stream_index,
            kind: TrackKind::Video,
            source_path: source_path.into(),
            time_range,
            preferred_transform,
            natural_size,
            sample_rate: 0,
            channels: 0,
            codec_id: ffmpeg::codec::Id::None,
            language: None,
        }
    }

    pub fn audio(
        stream_index: usize,
        source_path: impl Into<PathBuf>,
        time_range: TimeRange,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            track_id: stream_index as u32 + 1,
            stream_index,
            kind: TrackKind::Audio,
            source_path: source_path.into(),
            time_range,
            preferred_transform: AffineTransform::IDENTITY,
            natural_size: Size::ZERO,
            sample_rate,
            channels,
            codec_id: ffmpeg::codec::Id::None,
            language: None,
        }
    }
}

/// A probed media file: its duration and its audio and video tracks.
#[derive(Debug, Clone)]
pub struct Asset {
    source_path: PathBuf,
    duration: MediaTime,
    tracks: Vec<AssetTrack>,
}

impl Asset {
    pub fn new(source_path: impl Into<PathBuf>, duration: MediaTime, tracks: Vec<AssetTrack>) -> Self {
        Self {
            source_path: source_path.into(),
            duration,
            tracks,
        }
    }

    /// Open and probe a media file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        crate::index::scanner::scan_asset(path)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn duration(&self) -> MediaTime {
        self.duration
    }

    pub fn all_tracks(&self) -> &[AssetTrack] {
        &self.tracks
    }

    pub fn tracks(&self, kind: TrackKind) -> impl Iterator<Item = &AssetTrack> + '_ {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn first_track(&self, kind: TrackKind) -> Option<&AssetTrack> {
        self.tracks(kind).next()
    }

    pub fn track_count(&self, kind: TrackKind) -> usize {
        self.tracks(kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_time_seconds() {
        let t = MediaTime::from_secs_f64(1.5);
        assert_eq!(t.as_micros(), 1_500_000);
        assert!((t.as_secs_f64() - 1.5).abs() < 1e-9);
        assert_eq!(MediaTime::from_millis(250).as_micros(), 250_000);
    }

    #[test]
    fn test_media_time_timebase_conversion() {
        let tb = ffmpeg::Rational::new(1, 90000);
        let t = MediaTime::from_ts(90000, tb);
        assert_eq!(t, MediaTime::from_micros(1_000_000));
        assert_eq!(t.to_ts(ffmpeg::Rational::new(1, 48000)), 48000);
    }

    #[test]
    fn test_time_range_bounds() {
        let r = TimeRange::new(MediaTime::from_millis(500), MediaTime::from_millis(1000));
        assert_eq!(r.end(), MediaTime::from_millis(1500));
        assert!(r.contains(MediaTime::from_millis(500)));
        assert!(!r.contains(MediaTime::from_millis(1500)));
        assert!(r.is_valid());
        assert!(!r.is_empty());
    }

    #[test]
    fn test_time_range_invalid() {
        let r = TimeRange::new(MediaTime::from_millis(-1), MediaTime::from_millis(10));
        assert!(!r.is_valid());
        let r = TimeRange::new(MediaTime::ZERO, MediaTime::from_millis(-10));
        assert!(!r.is_valid());
    }

    #[test]
    fn test_time_range_intersection() {
        let a = TimeRange::from_bounds(MediaTime::ZERO, MediaTime::from_millis(1000));
        let b = TimeRange::from_bounds(MediaTime::from_millis(600), MediaTime::from_millis(2000));
        let i = a.intersection(&b).unwrap();
        assert_eq!(i.start, MediaTime::from_millis(600));
        assert_eq!(i.end(), MediaTime::from_millis(1000));

        let c = TimeRange::from_bounds(MediaTime::from_millis(1000), MediaTime::from_millis(1200));
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_display_matrix_portrait() {
        // 90 degree rotation as written by phone cameras in portrait mode
        let matrix = [0, 65536, 0, -65536, 0, 0, 0, 0, 1 << 30];
        let t = AffineTransform::from_display_matrix(&matrix);
        assert_eq!((t.a, t.b, t.c, t.d), (0.0, 1.0, -1.0, 0.0));
    }

    #[test]
    fn test_size_swapped_and_even() {
        let s = Size::new(1920, 1081);
        assert_eq!(s.swapped(), Size::new(1081, 1920));
        assert_eq!(s.even(), Size::new(1920, 1080));
        assert!(Size::ZERO.is_empty());
    }

    #[test]
    fn test_asset_track_partition() {
        let range = TimeRange::new(MediaTime::ZERO, MediaTime::from_millis(2000));
        let asset = Asset::new(
            "/test/clip.mov",
            MediaTime::from_millis(2000),
            vec![
                AssetTrack::video(0, "/test/clip.mov", range, Size::new(640, 480), AffineTransform::IDENTITY),
                AssetTrack::audio(1, "/test/clip.mov", range, 44100, 2),
                AssetTrack::audio(2, "/test/clip.mov", range, 48000, 1),
            ],
        );
        assert_eq!(asset.track_count(TrackKind::Video), 1);
        assert_eq!(asset.track_count(TrackKind::Audio), 2);
        assert_eq!(asset.first_track(TrackKind::Audio).unwrap().sample_rate, 44100);
        assert_eq!(asset.first_track(TrackKind::Video).unwrap().track_id, 1);
    }
}
