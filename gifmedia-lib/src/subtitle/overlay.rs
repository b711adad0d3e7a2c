//! Timed subtitle overlays attached to a video composition.

use crate::composition::VideoComposition;
use crate::types::{MediaTime, Size, TimeRange};

use super::speech::SpeechEntry;
use super::style::SubtitleStyle;

/// A piece of text shown over a span of the output timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCue {
    pub text: String,
    pub range: TimeRange,
}

/// Everything needed to draw subtitles on a rendered frame.
#[derive(Debug, Clone)]
pub struct SubtitleOverlayTrack {
    pub cues: Vec<TextCue>,
    pub style: SubtitleStyle,
    /// Frame size the cue layout refers to
    pub size: Size,
}

/// Attaches a subtitle overlay to a video composition.
pub trait SubtitleOverlay: Send + Sync {
    fn apply(&self, composition: &mut VideoComposition, speech: &[Option<SpeechEntry>], size: Size);
}

/// Shows each recognised utterance for its own span, replacing the text in
/// place when the next utterance begins.
#[derive(Debug, Clone, Default)]
pub struct DynamicSubtitles {
    style: SubtitleStyle,
}

impl DynamicSubtitles {
    pub fn new(style: SubtitleStyle) -> Self {
        Self { style }
    }

    /// Build cues from sparse speech entries.
    ///
    /// Missing, blank or badly timed entries are skipped.  Cues are ordered by
    /// start time and each one ends no later than the next begins.  When
    /// `limit` is given, cues are cut to it.
    pub fn cues(speech: &[Option<SpeechEntry>], limit: Option<TimeRange>) -> Vec<TextCue> {
        let mut cues: Vec<TextCue> = speech
            .iter()
            .flatten()
            .filter_map(|entry| {
                let text = entry.text.trim();
                if text.is_empty() {
                    return None;
                }
                let range = entry.time_range()?;
                Some(TextCue {
                    text: text.to_string(),
                    range,
                })
            })
            .collect();
        cues.sort_by_key(|c| c.range.start);

        let starts: Vec<MediaTime> = cues.iter().map(|c| c.range.start).collect();
        for (cue, next_start) in cues.iter_mut().zip(starts.iter().skip(1)) {
            if *next_start < cue.range.end() {
                cue.range = TimeRange::from_bounds(cue.range.start, *next_start);
            }
        }

        cues.into_iter()
            .filter_map(|mut cue| {
                if let Some(limit) = limit {
                    cue.range = cue.range.intersection(&limit)?;
                }
                (!cue.range.is_empty()).then_some(cue)
            })
            .collect()
    }
}

impl SubtitleOverlay for DynamicSubtitles {
    fn apply(&self, composition: &mut VideoComposition, speech: &[Option<SpeechEntry>], size: Size) {
        let limit = composition
            .instructions
            .iter()
            .map(|i| i.time_range)
            .reduce(|a, b| {
                TimeRange::from_bounds(a.start.min(b.start), a.end().max(b.end()))
            });
        let cues = Self::cues(speech, limit);

        tracing::debug!(
            entries = speech.len(),
            cues = cues.len(),
            size = %size,
            "attached dynamic subtitles"
        );

        composition.subtitle_overlay = Some(SubtitleOverlayTrack {
            cues,
            style: self.style.clone(),
            size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::CompositionInstruction;
    use ffmpeg_next as ffmpeg;

    fn ms(v: i64) -> MediaTime {
        MediaTime::from_millis(v)
    }

    fn entry(text: &str, ts: f64, dur: f64) -> Option<SpeechEntry> {
        Some(SpeechEntry::new(text, ts, dur))
    }

    #[test]
    fn test_skips_missing_and_blank_entries() {
        let speech = vec![
            None,
            entry("one", 0.0, 1.0),
            entry("   ", 1.0, 1.0),
            None,
            entry("two", 2.0, 0.5),
            entry("bad", -3.0, 1.0),
        ];
        let cues = DynamicSubtitles::cues(&speech, None);
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_overlapping_entries_are_clamped() {
        let speech = vec![entry("first", 0.0, 2.0), entry("second", 1.5, 1.0)];
        let cues = DynamicSubtitles::cues(&speech, None);
        assert_eq!(cues[0].range, TimeRange::from_bounds(ms(0), ms(1500)));
        assert_eq!(cues[1].range, TimeRange::from_bounds(ms(1500), ms(2500)));
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let speech = vec![entry("late", 3.0, 1.0), entry("early", 0.0, 1.0)];
        let cues = DynamicSubtitles::cues(&speech, None);
        assert_eq!(cues[0].text, "early");
        assert_eq!(cues[1].text, "late");
    }

    #[test]
    fn test_same_start_keeps_last() {
        let speech = vec![entry("a", 1.0, 1.0), entry("b", 1.0, 1.0)];
        let cues = DynamicSubtitles::cues(&speech, None);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "b");
    }

    #[test]
    fn test_cues_limited_to_composition() {
        let speech = vec![entry("in", 0.5, 1.0), entry("tail", 1.8, 1.0), entry("out", 5.0, 1.0)];
        let cues = DynamicSubtitles::cues(&speech, Some(TimeRange::new(ms(0), ms(2000))));
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].range.end(), ms(2000));
    }

    #[test]
    fn test_apply_attaches_overlay() {
        let size = Size::new(1080, 1920);
        let mut vc = VideoComposition::new(size, ffmpeg::Rational::new(1, 30));
        vc.instructions
            .push(CompositionInstruction::new(TimeRange::new(ms(0), ms(3000))));

        DynamicSubtitles::default().apply(&mut vc, &[entry("hey", 0.0, 1.0)], size);

        let overlay = vc.subtitle_overlay.as_ref().unwrap();
        assert_eq!(overlay.size, size);
        assert_eq!(overlay.cues.len(), 1);
        assert_eq!(overlay.cues[0].text, "hey");
        assert_eq!(overlay.cues[0].range, TimeRange::new(ms(0), ms(1000)));
    }

    #[test]
    fn test_apply_with_no_speech_attaches_empty_overlay() {
        let size = Size::new(640, 480);
        let mut vc = VideoComposition::new(size, ffmpeg::Rational::new(1, 30));
        DynamicSubtitles::default().apply(&mut vc, &[None, None], size);
        assert!(vc.subtitle_overlay.unwrap().cues.is_empty());
    }
}
