//! Recognised speech segments used as subtitle input.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MediaError, Result};
use crate::types::{MediaTime, TimeRange};

/// One recognised utterance.  Times are in seconds from the start of the
/// asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechEntry {
    pub text: String,
    pub timestamp: f64,
    pub duration: f64,
}

impl SpeechEntry {
    pub fn new(text: impl Into<String>, timestamp: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            timestamp,
            duration,
        }
    }

    /// Display span of the entry, or `None` if its timing is unusable
    /// (negative, non-finite or zero-length).
    pub fn time_range(&self) -> Option<TimeRange> {
        if !self.timestamp.is_finite() || !self.duration.is_finite() {
            return None;
        }
        if self.timestamp < 0.0 || self.duration <= 0.0 {
            return None;
        }
        let range = TimeRange::new(
            MediaTime::from_secs_f64(self.timestamp),
            MediaTime::from_secs_f64(self.duration),
        );
        (!range.is_empty()).then_some(range)
    }
}

/// Parse a JSON array of speech entries.  `null` elements mark gaps and are
/// kept as `None`.
pub fn parse_speech_json(json: &str) -> Result<Vec<Option<SpeechEntry>>> {
    serde_json::from_str(json).map_err(|e| MediaError::Subtitle(format!("invalid speech JSON: {}", e)))
}

/// Read a speech JSON file from disk.
pub fn load_speech_file<P: AsRef<Path>>(path: P) -> Result<Vec<Option<SpeechEntry>>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let entries = parse_speech_json(&json)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "loaded speech entries");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sparse_array() {
        let json = r#"[
            {"text": "hello", "timestamp": 0.5, "duration": 1.0},
            null,
            {"text": "world", "timestamp": 2.0, "duration": 0.75}
        ]"#;
        let entries = parse_speech_json(json).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[1].is_none());
        assert_eq!(entries[2].as_ref().unwrap().text, "world");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let err = parse_speech_json(r#"[{"text": 1}]"#);
        assert!(matches!(err, Err(MediaError::Subtitle(_))));
    }

    #[test]
    fn test_time_range() {
        let e = SpeechEntry::new("hi", 1.25, 0.5);
        let r = e.time_range().unwrap();
        assert_eq!(r.start, MediaTime::from_millis(1250));
        assert_eq!(r.end(), MediaTime::from_millis(1750));

        assert!(SpeechEntry::new("x", -1.0, 1.0).time_range().is_none());
        assert!(SpeechEntry::new("x", 1.0, 0.0).time_range().is_none());
        assert!(SpeechEntry::new("x", f64::NAN, 1.0).time_range().is_none());
    }

    #[test]
    fn test_load_speech_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.json");
        std::fs::write(&path, r#"[null, {"text": "a", "timestamp": 0, "duration": 1}]"#).unwrap();
        let entries = load_speech_file(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(load_speech_file(dir.path().join("missing.json")).is_err());
    }
}
