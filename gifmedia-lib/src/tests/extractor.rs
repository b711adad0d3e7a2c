//! Audio extraction against scripted backends

use std::path::Path;
use std::sync::Arc;

use crate::error::MediaError;
use crate::export::{ExportBackend, ExportPreset, OutputFileType};
use crate::extractor::{audio_composition, extract_audio_with};
use crate::tests::fixtures::{MockBackend, MockOutcome, TestAsset};
use crate::types::{AffineTransform, Asset, AssetTrack, MediaTime, TimeRange, TrackKind};

#[test]
fn test_one_composition_track_per_audio_track() {
    for fixture in [
        TestAsset::landscape(),
        TestAsset::multi_audio(),
        TestAsset::audio_only(),
        TestAsset::silent(),
    ] {
        let asset = fixture.create();
        let composition = audio_composition(&asset);
        assert_eq!(
            composition.tracks(TrackKind::Audio).count(),
            asset.track_count(TrackKind::Audio),
            "{}",
            fixture.name
        );
        assert_eq!(composition.tracks(TrackKind::Video).count(), 0);
    }
}

#[test]
fn test_tracks_keep_offset_and_transform() {
    let path = Path::new("/synthetic/offset.m4a");
    let late = TimeRange::new(MediaTime::from_millis(500), MediaTime::from_millis(1000));
    let mut track = AssetTrack::audio(0, path, late, 48000, 2);
    track.preferred_transform = AffineTransform::new(-1.0, 0.0, 0.0, -1.0, 0.0, 0.0);
    let asset = Asset::new(path, MediaTime::from_millis(1500), vec![track]);

    let composition = audio_composition(&asset);
    let ct = composition.tracks(TrackKind::Audio).next().unwrap();
    assert_eq!(ct.segments().len(), 1);
    assert_eq!(ct.segments()[0].target_start, MediaTime::from_millis(500));
    assert_eq!(ct.time_range().end(), MediaTime::from_millis(1500));
    assert_eq!(ct.preferred_transform.a, -1.0);
}

#[test]
fn test_failed_insertion_leaves_track_empty() {
    let path = Path::new("/synthetic/empty.m4a");
    let empty = TimeRange::new(MediaTime::ZERO, MediaTime::ZERO);
    let asset = Asset::new(
        path,
        MediaTime::ZERO,
        vec![AssetTrack::audio(0, path, empty, 48000, 2)],
    );

    let composition = audio_composition(&asset);
    assert_eq!(composition.tracks(TrackKind::Audio).count(), 1);
    assert!(composition.is_empty());
}

#[tokio::test]
async fn test_completed_export_succeeds() {
    let mock = Arc::new(MockBackend::new(MockOutcome::Complete));
    let backend: Arc<dyn ExportBackend> = mock.clone();
    let asset = TestAsset::multi_audio().create();

    extract_audio_with(backend, &asset, Path::new("/tmp/out.m4a"))
        .await
        .unwrap();

    let job = mock.last_job().unwrap();
    assert_eq!(job.preset, ExportPreset::AppleM4A);
    assert_eq!(job.file_type, OutputFileType::AppleM4A);
    assert_eq!(job.output_path, Path::new("/tmp/out.m4a"));
    assert!(job.video_composition.is_none());
    assert_eq!(job.composition.tracks(TrackKind::Audio).count(), 2);
}

#[tokio::test]
async fn test_non_completed_exports_fail() {
    for outcome in [MockOutcome::Fail, MockOutcome::Cancel, MockOutcome::Panic] {
        let backend: Arc<dyn ExportBackend> = Arc::new(MockBackend::new(outcome));
        let asset = TestAsset::audio_only().create();
        let result = extract_audio_with(backend, &asset, Path::new("/tmp/out.m4a")).await;
        assert!(
            matches!(result, Err(MediaError::ExportFailed(_))),
            "{:?} gave {:?}",
            outcome,
            result
        );
    }
}

#[tokio::test]
async fn test_unsupported_preset_fails_construction() {
    let mock = Arc::new(MockBackend::unsupported());
    let backend: Arc<dyn ExportBackend> = mock.clone();
    let asset = TestAsset::audio_only().create();
    let result = extract_audio_with(backend, &asset, Path::new("/tmp/out.m4a")).await;
    assert!(matches!(result, Err(MediaError::ExportConstruction(_))));
    assert_eq!(mock.runs(), 0);
}
