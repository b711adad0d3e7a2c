//! libavfilter chain descriptions for video export.
//!
//! The chain applied to each decoded frame is
//! `rotate -> scale -> setsar -> fps -> format -> drawbox* -> ass`.
//! Frames enter the graph with pts on the output timeline, so time
//! expressions (`enable=`) and subtitle events use output time.

use std::path::Path;

use crate::composition::Orientation;
use crate::types::{Size, TimeRange};

/// Inputs of [`video_filter_spec`].
#[derive(Debug, Clone)]
pub struct VideoFilterParams<'a> {
    pub orientation: Orientation,
    pub render_size: Size,
    pub frame_rate: u32,
    /// Output-timeline spans with reduced opacity
    pub opacity_spans: &'a [(TimeRange, f32)],
    /// ASS script drawn over the frame
    pub subtitle_file: Option<&'a Path>,
}

/// Filter that rotates stored frames upright.
pub fn rotation_filter(orientation: Orientation) -> Option<&'static str> {
    match orientation {
        Orientation::Up => None,
        Orientation::Right => Some("transpose=clock"),
        Orientation::Left => Some("transpose=cclock"),
        Orientation::Down => Some("hflip,vflip"),
    }
}

/// Build the filtergraph description for one video segment.
pub fn video_filter_spec(params: &VideoFilterParams<'_>) -> String {
    let size = params.render_size.even();
    let mut chain: Vec<String> = Vec::new();

    if let Some(rotate) = rotation_filter(params.orientation) {
        chain.push(rotate.to_string());
    }
    chain.push(format!("scale={}:{}", size.width, size.height));
    chain.push("setsar=1".to_string());
    chain.push(format!("fps={}", params.frame_rate.max(1)));
    chain.push("format=yuv420p".to_string());

    for (span, opacity) in params.opacity_spans {
        chain.push(opacity_filter(span, *opacity));
    }

    if let Some(path) = params.subtitle_file {
        let value = escape_filter_value(&path.to_string_lossy());
        chain.push(format!("ass=filename={}", escape_graph_value(&value)));
    }

    chain.join(",")
}

/// Darken frames inside `span` as if the layer were drawn with `opacity`
/// over a black background.
fn opacity_filter(span: &TimeRange, opacity: f32) -> String {
    let alpha = (1.0 - opacity.clamp(0.0, 1.0)) as f64;
    format!(
        "drawbox=x=0:y=0:w=iw:h=ih:color=black@{:.3}:t=fill:enable='gte(t,{:.6})*lt(t,{:.6})'",
        alpha,
        span.start.as_secs_f64(),
        span.end().as_secs_f64()
    )
}

/// Escape a filter option value (first level: `\`, `'` and `:`).
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape an already option-escaped value for the graph parser.
fn escape_graph_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaTime;

    fn params<'a>(orientation: Orientation) -> VideoFilterParams<'a> {
        VideoFilterParams {
            orientation,
            render_size: Size::new(1080, 1920),
            frame_rate: 30,
            opacity_spans: &[],
            subtitle_file: None,
        }
    }

    #[test]
    fn test_plain_chain() {
        assert_eq!(
            video_filter_spec(&params(Orientation::Up)),
            "scale=1080:1920,setsar=1,fps=30,format=yuv420p"
        );
    }

    #[test]
    fn test_rotations() {
        assert!(video_filter_spec(&params(Orientation::Right)).starts_with("transpose=clock,"));
        assert!(video_filter_spec(&params(Orientation::Left)).starts_with("transpose=cclock,"));
        assert!(video_filter_spec(&params(Orientation::Down)).starts_with("hflip,vflip,"));
    }

    #[test]
    fn test_odd_render_size_is_evened() {
        let mut p = params(Orientation::Up);
        p.render_size = Size::new(721, 405);
        assert!(video_filter_spec(&p).starts_with("scale=720:404,"));
    }

    #[test]
    fn test_opacity_span() {
        let spans = [(
            TimeRange::new(MediaTime::from_millis(500), MediaTime::from_millis(1500)),
            0.25,
        )];
        let mut p = params(Orientation::Up);
        p.opacity_spans = &spans;
        let spec = video_filter_spec(&p);
        assert!(spec.contains("color=black@0.750"));
        assert!(spec.contains("enable='gte(t,0.500000)*lt(t,2.000000)'"));
    }

    #[test]
    fn test_subtitle_path_is_escaped() {
        let path = Path::new("/tmp/a:b,c.ass");
        let mut p = params(Orientation::Up);
        p.subtitle_file = Some(path);
        let spec = video_filter_spec(&p);
        assert!(spec.ends_with(r"ass=filename=/tmp/a\\:b\,c.ass"));
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("it's"), r"it\'s");
        assert_eq!(escape_filter_value(r"C:\x"), r"C\:\\x");
    }
}
