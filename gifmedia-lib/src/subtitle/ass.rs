//! ASS (Advanced SubStation Alpha) rendering of a subtitle overlay.
//!
//! The FFmpeg backend burns subtitles in with the `ass` filter, which reads
//! a script file.  `PlayResX/Y` match the render size so style metrics are
//! in output pixels.

use std::fmt::Write;

use super::overlay::SubtitleOverlayTrack;
use super::style::SubtitleStyle;
use crate::types::MediaTime;

const STYLE_NAME: &str = "Default";

/// Render an overlay as a complete ASS script.
pub fn render_ass(overlay: &SubtitleOverlayTrack) -> String {
    let size = overlay.size;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "[Script Info]");
    let _ = writeln!(out, "ScriptType: v4.00+");
    let _ = writeln!(out, "PlayResX: {}", size.width);
    let _ = writeln!(out, "PlayResY: {}", size.height);
    let _ = writeln!(out, "WrapStyle: 0");
    let _ = writeln!(out, "ScaledBorderAndShadow: yes");
    let _ = writeln!(out);

    let _ = writeln!(out, "[V4+ Styles]");
    let _ = writeln!(
        out,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    );
    let _ = writeln!(out, "{}", style_line(&overlay.style, size.width, size.height));
    let _ = writeln!(out);

    let _ = writeln!(out, "[Events]");
    let _ = writeln!(
        out,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    );
    for cue in &overlay.cues {
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},{},,0,0,0,,{}",
            format_ass_timestamp(cue.range.start),
            format_ass_timestamp(cue.range.end()),
            STYLE_NAME,
            escape_ass_text(&cue.text)
        );
    }

    out
}

fn style_line(style: &SubtitleStyle, width: u32, height: u32) -> String {
    let side = style.side_margin_for(width);
    format!(
        "Style: {name},{font},{size},{primary},{primary},{outline},{back},{bold},0,0,0,100,100,0,0,1,{outline_w},{shadow},2,{side},{side},{margin},1",
        name = STYLE_NAME,
        font = style.font_name,
        size = style.font_size_for(height),
        primary = style.primary_color,
        outline = style.outline_color,
        back = style.back_color,
        bold = if style.bold { -1 } else { 0 },
        outline_w = style.outline,
        shadow = style.shadow,
        side = side,
        margin = style.margin_for(height),
    )
}

/// `H:MM:SS.cc`, rounded to the nearest centisecond.
pub fn format_ass_timestamp(t: MediaTime) -> String {
    let cs = (t.as_micros().max(0) + 5_000) / 10_000;
    let hours = cs / 360_000;
    let minutes = (cs % 360_000) / 6_000;
    let seconds = (cs % 6_000) / 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs % 100)
}

/// Escape characters that ASS treats as markup.
pub fn escape_ass_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace("\r\n", "\\N")
        .replace('\n', "\\N")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::overlay::TextCue;
    use crate::types::{Size, TimeRange};

    #[test]
    fn test_format_ass_timestamp() {
        assert_eq!(format_ass_timestamp(MediaTime::ZERO), "0:00:00.00");
        assert_eq!(format_ass_timestamp(MediaTime::from_millis(1500)), "0:00:01.50");
        assert_eq!(format_ass_timestamp(MediaTime::from_millis(61_000)), "0:01:01.00");
        assert_eq!(format_ass_timestamp(MediaTime::from_millis(3_661_000)), "1:01:01.00");
        assert_eq!(format_ass_timestamp(MediaTime::from_millis(999)), "0:00:01.00");
        assert_eq!(format_ass_timestamp(MediaTime::from_millis(-5)), "0:00:00.00");
    }

    #[test]
    fn test_escape_ass_text() {
        assert_eq!(escape_ass_text("a{b}c"), "a\\{b\\}c");
        assert_eq!(escape_ass_text("line1\nline2"), "line1\\Nline2");
        assert_eq!(escape_ass_text("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_render_ass() {
        let overlay = SubtitleOverlayTrack {
            cues: vec![
                TextCue {
                    text: "Hello {world}".into(),
                    range: TimeRange::new(MediaTime::ZERO, MediaTime::from_millis(1200)),
                },
                TextCue {
                    text: "bye".into(),
                    range: TimeRange::new(MediaTime::from_millis(1200), MediaTime::from_millis(800)),
                },
            ],
            style: SubtitleStyle::default(),
            size: Size::new(1080, 1920),
        };
        let ass = render_ass(&overlay);
        assert!(ass.contains("PlayResX: 1080\n"));
        assert!(ass.contains("PlayResY: 1920\n"));
        assert!(ass.contains("Style: Default,Helvetica,115,"));
        assert!(ass.contains("Dialogue: 0,0:00:00.00,0:00:01.20,Default,,0,0,0,,Hello \\{world\\}\n"));
        assert!(ass.contains("Dialogue: 0,0:00:01.20,0:00:02.00,Default,,0,0,0,,bye\n"));
        assert_eq!(ass.matches("Dialogue:").count(), 2);
    }
}
