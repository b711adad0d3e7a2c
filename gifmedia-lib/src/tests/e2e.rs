//! End-to-end tests through the FFmpeg backend

use std::sync::Arc;

use crate::composer::SubtitledVideoComposer;
use crate::config::{ComposerConfig, ExportConfig};
use crate::error::MediaError;
use crate::export::{
    CancelFlag, ExportBackend, ExportJob, ExportPreset, FfmpegBackend, OutputFileType,
};
use crate::extractor::{audio_composition, extract_audio, extract_audio_with};
use crate::subtitle::SpeechEntry;
use crate::tests::fixtures::{
    portrait_display_matrix, sample_video, write_test_movie, write_test_wav, TestAsset,
};
use crate::types::{Asset, MediaTime, Size, TrackKind};

fn init() {
    crate::ffmpeg_utils::init().unwrap();
}

#[test]
fn test_scan_wav() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    write_test_wav(&wav, 1.0, 44100, 2).unwrap();

    let asset = Asset::load(&wav).unwrap();
    assert_eq!(asset.track_count(TrackKind::Audio), 1);
    assert_eq!(asset.track_count(TrackKind::Video), 0);

    let track = asset.first_track(TrackKind::Audio).unwrap();
    assert_eq!(track.sample_rate, 44100);
    assert_eq!(track.channels, 2);
    let secs = asset.duration().as_secs_f64();
    assert!((secs - 1.0).abs() < 0.05, "duration {}", secs);
}

#[test]
fn test_parse_file_summary() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    write_test_wav(&wav, 0.5, 22050, 1).unwrap();

    let info = crate::api::parse_file(&wav).unwrap();
    assert_eq!(info.file_size, 44 + 22050);
    assert_eq!(info.tracks.len(), 1);
    assert_eq!(info.tracks[0].id, "a/0");
    assert_eq!(
        info.tracks[0].track_type,
        crate::api::TrackType::Audio {
            channels: 1,
            sample_rate: 22050
        }
    );
}

#[tokio::test]
async fn test_extract_audio_from_wav() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    write_test_wav(&wav, 1.5, 44100, 1).unwrap();
    let output = dir.path().join("tone.m4a");

    let asset = Asset::load(&wav).unwrap();
    extract_audio(&asset, &output).await.unwrap();
    assert!(output.exists());

    let extracted = Asset::load(&output).unwrap();
    assert_eq!(extracted.track_count(TrackKind::Audio), 1);
    let track = extracted.first_track(TrackKind::Audio).unwrap();
    assert_eq!(track.codec_id, ffmpeg_next::codec::Id::AAC);
    assert_eq!(track.sample_rate, 48000);
    let secs = extracted.duration().as_secs_f64();
    assert!((secs - 1.5).abs() < 0.1, "duration {}", secs);
}

#[tokio::test]
async fn test_extract_audio_without_audio_tracks_fails() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("none.m4a");
    let asset = TestAsset::silent().create();

    let backend: Arc<dyn ExportBackend> = Arc::new(FfmpegBackend::new(ExportConfig::default()));
    let err = extract_audio_with(backend.clone(), &asset, &output).await;
    assert!(matches!(err, Err(MediaError::ExportFailed(_))));
    assert!(!output.exists());

    // A file the export never opened is left alone
    std::fs::write(&output, b"keep me").unwrap();
    let err = extract_audio_with(backend, &asset, &output).await;
    assert!(matches!(err, Err(MediaError::ExportFailed(_))));
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");
}

#[test]
fn test_cancelled_export_removes_unfinished_file() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    write_test_wav(&wav, 1.0, 44100, 2).unwrap();
    let output = dir.path().join("tone.m4a");

    let job = ExportJob {
        composition: audio_composition(&Asset::load(&wav).unwrap()),
        preset: ExportPreset::AppleM4A,
        output_path: output.clone(),
        file_type: OutputFileType::AppleM4A,
        video_composition: None,
        optimize_for_network_use: false,
    };
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = FfmpegBackend::default().run(&job, &cancel);
    assert!(matches!(err, Err(MediaError::Cancelled)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_compose_sample_video() {
    let Some(sample) = sample_video() else {
        return; // Skip if sample missing
    };
    init();
    let dir = tempfile::tempdir().unwrap();
    let config = ComposerConfig {
        temp_dir: Some(dir.path().to_path_buf()),
        ..ComposerConfig::default()
    };
    let composer = SubtitledVideoComposer::new(config, ExportConfig::default());

    let asset = Asset::load(&sample).unwrap();
    if asset.first_track(TrackKind::Audio).is_none() {
        return;
    }
    let speech = vec![
        Some(SpeechEntry::new("hello", 0.0, 0.8)),
        None,
        Some(SpeechEntry::new("world", 0.8, 0.8)),
    ];

    let output = composer.compose(&asset, &speech).await.unwrap();
    assert!(output.starts_with(dir.path()));
    assert_eq!(output.extension().and_then(|e| e.to_str()), Some("mov"));

    let movie = Asset::load(&output).unwrap();
    assert_eq!(movie.track_count(TrackKind::Video), 1);
    assert_eq!(movie.track_count(TrackKind::Audio), 1);

    let prepared = composer.prepare(&asset, &speech).unwrap();
    let video = movie.first_track(TrackKind::Video).unwrap();
    assert_eq!(video.natural_size, prepared.video_composition.render_size.even());

    let diff = movie.duration() - asset.duration();
    assert!(diff.as_secs_f64().abs() < 0.2, "duration off by {}", diff);
    assert!(!output.with_extension("ass").exists());
    assert!(movie.duration() > MediaTime::ZERO);
}

#[tokio::test]
async fn test_compose_generated_movies() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let config = ComposerConfig {
        temp_dir: Some(dir.path().to_path_buf()),
        ..ComposerConfig::default()
    };
    let composer = SubtitledVideoComposer::new(config, ExportConfig::default());

    // Burning cues needs the libass filter
    let speech = if ffmpeg_next::filter::find("ass").is_some() {
        vec![
            Some(SpeechEntry::new("hello", 0.0, 0.5)),
            None,
            Some(SpeechEntry::new("world", 0.5, 0.5)),
        ]
    } else {
        Vec::new()
    };

    let frames = Size::new(64, 36);
    let cases = [
        ("landscape.mov", None, Size::new(64, 36)),
        ("portrait.mov", Some(portrait_display_matrix(36)), Size::new(36, 64)),
    ];
    for (name, matrix, expected) in cases {
        let source = dir.path().join(name);
        write_test_movie(&source, 1.0, frames, matrix).unwrap();

        let asset = Asset::load(&source).unwrap();
        let track = asset.first_track(TrackKind::Video).unwrap();
        assert_eq!(track.natural_size, frames, "{}", name);
        assert_eq!(track.preferred_transform.is_identity(), matrix.is_none(), "{}", name);

        let output = composer.compose(&asset, &speech).await.unwrap();
        assert_eq!(output.extension().and_then(|e| e.to_str()), Some("mov"));

        let movie = Asset::load(&output).unwrap();
        assert_eq!(movie.track_count(TrackKind::Video), 1, "{}", name);
        assert_eq!(movie.track_count(TrackKind::Audio), 1, "{}", name);
        let video = movie.first_track(TrackKind::Video).unwrap();
        assert_eq!(video.natural_size, expected, "{}", name);
        assert!(video.preferred_transform.is_identity(), "{}", name);

        let diff = movie.duration() - asset.duration();
        assert!(diff.as_secs_f64().abs() < 0.2, "{}: duration off by {}", name, diff);
        assert!(!output.with_extension("ass").exists(), "{}", name);

        // faststart puts the index ahead of the media data
        let bytes = std::fs::read(&output).unwrap();
        let find = |tag: &[u8]| bytes.windows(4).position(|w| w == tag);
        assert!(find(b"moov").unwrap() < find(b"mdat").unwrap(), "{}", name);
    }
}
