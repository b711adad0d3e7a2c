//! Render description attached to a video export.

use ffmpeg_next as ffmpeg;

use super::orientation::{classify_orientation, VideoOrientation, DEFAULT_TOLERANCE};
use crate::subtitle::overlay::SubtitleOverlayTrack;
use crate::types::{AffineTransform, MediaTime, Size, TimeRange};

/// How the video tracks of a composition are rendered.
#[derive(Debug, Clone)]
pub struct VideoComposition {
    pub render_size: Size,
    /// Duration of one output frame, in seconds
    pub frame_duration: ffmpeg::Rational,
    pub instructions: Vec<CompositionInstruction>,
    /// Timed text drawn over the video, if any
    pub subtitle_overlay: Option<SubtitleOverlayTrack>,
    /// Tolerance the render size was classified with.  Renderers must
    /// classify layer transforms with the same value.
    pub orientation_tolerance: f64,
}

impl VideoComposition {
    pub fn new(render_size: Size, frame_duration: ffmpeg::Rational) -> Self {
        Self {
            render_size,
            frame_duration,
            instructions: Vec::new(),
            subtitle_overlay: None,
            orientation_tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Orientation of a layer transform under this composition's tolerance.
    pub fn orientation_of(&self, transform: &AffineTransform) -> VideoOrientation {
        classify_orientation(transform, self.orientation_tolerance)
    }

    /// Output frame rate (inverse of the frame duration).
    pub fn frame_rate(&self) -> ffmpeg::Rational {
        self.frame_duration.invert()
    }

    /// Layer instruction for `track_id` in effect at `at`.
    pub fn layer_instruction(&self, track_id: u32, at: MediaTime) -> Option<&LayerInstruction> {
        self.instructions
            .iter()
            .filter(|i| i.time_range.contains(at) || i.time_range.start == at)
            .flat_map(|i| i.layer_instructions.iter())
            .find(|l| l.track_id == track_id)
    }
}

/// One instruction covers a span of the output timeline.
#[derive(Debug, Clone)]
pub struct CompositionInstruction {
    pub time_range: TimeRange,
    pub layer_instructions: Vec<LayerInstruction>,
}

impl CompositionInstruction {
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            layer_instructions: Vec::new(),
        }
    }
}

/// Transform and opacity settings for one composition track.
///
/// Values are step functions of time: a setting applies from its time until
/// the next setting.  Before the first setting the transform is the identity
/// and the opacity is 1.
#[derive(Debug, Clone)]
pub struct LayerInstruction {
    pub track_id: u32,
    transforms: Vec<(MediaTime, AffineTransform)>,
    opacities: Vec<(MediaTime, f32)>,
}

impl LayerInstruction {
    pub fn new(track_id: u32) -> Self {
        Self {
            track_id,
            transforms: Vec::new(),
            opacities: Vec::new(),
        }
    }

    pub fn set_transform(&mut self, transform: AffineTransform, at: MediaTime) {
        set_ramp(&mut self.transforms, at, transform);
    }

    /// Set the opacity from `at` onwards.  Clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, opacity: f32, at: MediaTime) {
        set_ramp(&mut self.opacities, at, opacity.clamp(0.0, 1.0));
    }

    pub fn transform_at(&self, t: MediaTime) -> AffineTransform {
        value_at(&self.transforms, t).unwrap_or(AffineTransform::IDENTITY)
    }

    pub fn opacity_at(&self, t: MediaTime) -> f32 {
        value_at(&self.opacities, t).unwrap_or(1.0)
    }

    /// Spans inside `within` where the layer is not fully opaque, with the
    /// opacity that applies.
    pub fn opacity_spans(&self, within: TimeRange) -> Vec<(TimeRange, f32)> {
        let mut spans = Vec::new();
        for (i, &(at, opacity)) in self.opacities.iter().enumerate() {
            if opacity >= 1.0 {
                continue;
            }
            let end = self
                .opacities
                .get(i + 1)
                .map(|&(next, _)| next)
                .unwrap_or_else(|| within.end());
            if let Some(span) = TimeRange::from_bounds(at, end).intersection(&within) {
                spans.push((span, opacity));
            }
        }
        spans
    }
}

fn set_ramp<T>(ramp: &mut Vec<(MediaTime, T)>, at: MediaTime, value: T) {
    match ramp.binary_search_by_key(&at, |(t, _)| *t) {
        Ok(i) => ramp[i].1 = value,
        Err(i) => ramp.insert(i, (at, value)),
    }
}

fn value_at<T: Copy>(ramp: &[(MediaTime, T)], t: MediaTime) -> Option<T> {
    ramp.iter()
        .take_while(|(at, _)| *at <= t)
        .last()
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: i64) -> MediaTime {
        MediaTime::from_millis(v)
    }

    #[test]
    fn test_opacity_defaults_and_steps() {
        let mut layer = LayerInstruction::new(1);
        assert_eq!(layer.opacity_at(ms(0)), 1.0);

        layer.set_opacity(0.0, ms(3000));
        assert_eq!(layer.opacity_at(ms(2999)), 1.0);
        assert_eq!(layer.opacity_at(ms(3000)), 0.0);
        assert_eq!(layer.opacity_at(ms(9000)), 0.0);

        layer.set_opacity(1.5, ms(1000));
        assert_eq!(layer.opacity_at(ms(1500)), 1.0);
    }

    #[test]
    fn test_opacity_set_twice_replaces() {
        let mut layer = LayerInstruction::new(1);
        layer.set_opacity(0.2, ms(500));
        layer.set_opacity(0.7, ms(500));
        assert_eq!(layer.opacity_at(ms(600)), 0.7);
    }

    #[test]
    fn test_fade_at_end_has_no_visible_span() {
        let mut layer = LayerInstruction::new(1);
        layer.set_opacity(0.0, ms(2000));
        let within = TimeRange::new(ms(0), ms(2000));
        assert!(layer.opacity_spans(within).is_empty());
    }

    #[test]
    fn test_opacity_spans() {
        let mut layer = LayerInstruction::new(1);
        layer.set_opacity(0.5, ms(1000));
        layer.set_opacity(1.0, ms(1500));
        layer.set_opacity(0.0, ms(1800));
        let spans = layer.opacity_spans(TimeRange::new(ms(0), ms(2000)));
        assert_eq!(
            spans,
            vec![
                (TimeRange::new(ms(1000), ms(500)), 0.5),
                (TimeRange::new(ms(1800), ms(200)), 0.0),
            ]
        );
    }

    #[test]
    fn test_transform_at() {
        let mut layer = LayerInstruction::new(1);
        assert!(layer.transform_at(ms(10)).is_identity());
        let rot = AffineTransform::new(0.0, 1.0, -1.0, 0.0, 1080.0, 0.0);
        layer.set_transform(rot, MediaTime::ZERO);
        assert_eq!(layer.transform_at(ms(10)), rot);
    }

    #[test]
    fn test_layer_instruction_lookup() {
        let mut vc = VideoComposition::new(Size::new(640, 480), ffmpeg::Rational::new(1, 30));
        let mut instr = CompositionInstruction::new(TimeRange::new(ms(0), ms(1000)));
        instr.layer_instructions.push(LayerInstruction::new(7));
        vc.instructions.push(instr);

        assert_eq!(vc.frame_rate(), ffmpeg::Rational::new(30, 1));
        assert!(vc.layer_instruction(7, ms(0)).is_some());
        assert!(vc.layer_instruction(7, ms(1000)).is_none());
        assert!(vc.layer_instruction(3, ms(10)).is_none());
    }
}
