//! Classification of a video track's preferred transform.

use serde::{Deserialize, Serialize};

use crate::types::{AffineTransform, Size};

/// Coefficient tolerance used when no other is configured
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Orientation of the stored frames relative to upright display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOrientation {
    pub orientation: Orientation,
    pub is_portrait: bool,
}

impl VideoOrientation {
    const UP: VideoOrientation = VideoOrientation {
        orientation: Orientation::Up,
        is_portrait: false,
    };
}

/// Canonical rotations, compared on `(a, b, c, d)`.
const CANONICAL: [((f64, f64, f64, f64), VideoOrientation); 4] = [
    (
        (0.0, 1.0, -1.0, 0.0),
        VideoOrientation {
            orientation: Orientation::Right,
            is_portrait: true,
        },
    ),
    (
        (0.0, -1.0, 1.0, 0.0),
        VideoOrientation {
            orientation: Orientation::Left,
            is_portrait: true,
        },
    ),
    ((1.0, 0.0, 0.0, 1.0), VideoOrientation::UP),
    (
        (-1.0, 0.0, 0.0, -1.0),
        VideoOrientation {
            orientation: Orientation::Down,
            is_portrait: false,
        },
    ),
];

/// Classify a transform as one of the four canonical rotations.
///
/// Coefficients match when they differ by at most `tolerance`; a tolerance of
/// `0.0` requires exact equality.  Translation is ignored.  Anything that is
/// not a canonical rotation (scales, shears, mirrors) is reported as `Up`,
/// not portrait.
pub fn classify_orientation(transform: &AffineTransform, tolerance: f64) -> VideoOrientation {
    let close = |x: f64, y: f64| (x - y).abs() <= tolerance;
    CANONICAL
        .iter()
        .find(|((a, b, c, d), _)| {
            close(transform.a, *a)
                && close(transform.b, *b)
                && close(transform.c, *c)
                && close(transform.d, *d)
        })
        .map(|(_, o)| *o)
        .unwrap_or(VideoOrientation::UP)
}

/// Size of the rendered frame: the natural size, swapped for portrait video.
pub fn render_size(natural_size: Size, orientation: VideoOrientation) -> Size {
    if orientation.is_portrait {
        natural_size.swapped()
    } else {
        natural_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(a: f64, b: f64, c: f64, d: f64) -> AffineTransform {
        AffineTransform::new(a, b, c, d, 0.0, 0.0)
    }

    #[test]
    fn test_canonical_rotations() {
        let right = classify_orientation(&t(0.0, 1.0, -1.0, 0.0), 0.0);
        assert_eq!(right.orientation, Orientation::Right);
        assert!(right.is_portrait);

        let left = classify_orientation(&t(0.0, -1.0, 1.0, 0.0), 0.0);
        assert_eq!(left.orientation, Orientation::Left);
        assert!(left.is_portrait);

        let up = classify_orientation(&AffineTransform::IDENTITY, 0.0);
        assert_eq!(up.orientation, Orientation::Up);
        assert!(!up.is_portrait);

        let down = classify_orientation(&t(-1.0, 0.0, 0.0, -1.0), 0.0);
        assert_eq!(down.orientation, Orientation::Down);
        assert!(!down.is_portrait);
    }

    #[test]
    fn test_translation_is_ignored() {
        let tr = AffineTransform::new(0.0, 1.0, -1.0, 0.0, 1080.0, 0.0);
        assert_eq!(classify_orientation(&tr, 0.0).orientation, Orientation::Right);
    }

    #[test]
    fn test_non_canonical_is_up() {
        for tr in [
            t(0.5, 0.0, 0.0, 0.5),
            t(-1.0, 0.0, 0.0, 1.0),
            t(0.707, 0.707, -0.707, 0.707),
            t(0.0, 0.0, 0.0, 0.0),
        ] {
            let o = classify_orientation(&tr, 1e-6);
            assert_eq!(o.orientation, Orientation::Up);
            assert!(!o.is_portrait);
        }
    }

    #[test]
    fn test_tolerance() {
        let near = t(1e-9, 1.0 - 1e-9, -1.0, 0.0);
        assert!(classify_orientation(&near, 1e-6).is_portrait);
        assert!(!classify_orientation(&near, 0.0).is_portrait);
    }

    #[test]
    fn test_render_size_swaps_only_for_portrait() {
        let natural = Size::new(1920, 1080);
        let portrait = classify_orientation(&t(0.0, -1.0, 1.0, 0.0), 0.0);
        assert_eq!(render_size(natural, portrait), Size::new(1080, 1920));

        let down = classify_orientation(&t(-1.0, 0.0, 0.0, -1.0), 0.0);
        assert_eq!(render_size(natural, down), natural);
    }
}
