//! Centroids, turn angles and the operator hints derived from them.

use opencv::core::{Point, Vector};
use opencv::imgproc::moments;
use std::fmt::{Display, Formatter};

/// Convex boundary of a candidate target.
#[derive(Debug, Clone, Default)]
pub struct Polygon {
    points: Vector<Point>,
}

impl Polygon {
    pub fn new(points: Vector<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &Vector<Point> {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::new(Vector::from_iter(points))
    }
}

/// A target found in the current frame. Never carried over to the next one.
#[derive(Debug, Clone)]
pub struct Target {
    pub centroid: Point,
    pub area: f64,
    pub boundary: Polygon,
}

impl Target {
    /// Builds the target from its area moments, `None` when the polygon encloses no area.
    pub fn from_polygon(boundary: Polygon) -> crate::Result<Option<Target>> {
        if boundary.len() < 3 {
            return Ok(None);
        }

        let m = moments(boundary.points(), false)?;
        if m.m00 <= 0.0 {
            return Ok(None);
        }

        Ok(Some(Target {
            centroid: Point::new((m.m10 / m.m00) as i32, (m.m01 / m.m00) as i32),
            area: m.m00,
            boundary,
        }))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {} :: {}", self.centroid.x, self.centroid.y, self.area)
    }
}

/// Centroid of `polygon` truncated to pixel coordinates.
pub fn centroid(polygon: &Polygon) -> crate::Result<Option<Point>> {
    Ok(Target::from_polygon(polygon.clone())?.map(|t| t.centroid))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentResult {
    /// Target x minus frame center x, in pixels.
    pub horizontal_error: i32,
    /// Radians, positive turns right.
    pub angle_to_turn: f64,
    pub aligned: bool,
}

/// Horizontal error to turn angle through a pinhole model.
pub fn compute_alignment(
    target_x: i32,
    frame_center_x: i32,
    focal_length: f64,
    tolerance: f64,
) -> AlignmentResult {
    let horizontal_error = target_x - frame_center_x;
    let angle_to_turn = (horizontal_error as f64 / focal_length).atan();

    AlignmentResult {
        horizontal_error,
        angle_to_turn,
        aligned: angle_to_turn.abs() < tolerance,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentCalculator {
    focal_length: f64,
    /// Radians.
    tolerance: f64,
}

impl AlignmentCalculator {
    pub fn new(focal_length: f64, tolerance: f64) -> Self {
        Self {
            focal_length,
            tolerance,
        }
    }

    pub fn from_config(config: &crate::config::VisionConfig) -> Self {
        Self::new(
            config.tracking.focal_length_px(config.camera.width),
            config.tracking.alignment_tolerance_rad(),
        )
    }

    pub fn compute(&self, target_x: i32, frame_center_x: i32) -> AlignmentResult {
        compute_alignment(target_x, frame_center_x, self.focal_length, self.tolerance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalHint {
    Aligned,
    TurnLeft,
    TurnRight,
}

impl HorizontalHint {
    pub fn from_error(horizontal_error: i32, dead_band: i32) -> Self {
        if horizontal_error.abs() < dead_band {
            HorizontalHint::Aligned
        } else if horizontal_error > 0 {
            HorizontalHint::TurnRight
        } else {
            HorizontalHint::TurnLeft
        }
    }
}

impl Display for HorizontalHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HorizontalHint::Aligned => "X Aligned",
            HorizontalHint::TurnLeft => "Turn Left",
            HorizontalHint::TurnRight => "Turn Right",
        })
    }
}

/// Advisory only, the y offset never reaches the telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalHint {
    Aligned,
    AimHigher,
    AimLower,
}

impl VerticalHint {
    pub fn from_position(target_y: i32, frame_center_y: i32, tolerance: i32) -> Self {
        let error = target_y - frame_center_y;
        if error.abs() < tolerance {
            VerticalHint::Aligned
        } else if error > 0 {
            // image rows grow downwards
            VerticalHint::AimLower
        } else {
            VerticalHint::AimHigher
        }
    }
}

impl Display for VerticalHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VerticalHint::Aligned => "Y Aligned",
            VerticalHint::AimHigher => "Aim Higher",
            VerticalHint::AimLower => "Aim Lower",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Polygon {
        Polygon::from(vec![
            Point::new(x0, y0),
            Point::new(x0, y1),
            Point::new(x1, y1),
            Point::new(x1, y0),
        ])
    }

    #[test]
    fn rectangle_centroid_and_area() {
        let target = Target::from_polygon(rect(10, 20, 30, 60)).unwrap().unwrap();
        assert_eq!(target.centroid, Point::new(20, 40));
        assert_relative_eq!(target.area, 800.0);
    }

    #[test]
    fn centroid_is_truncated() {
        let c = centroid(&rect(0, 0, 3, 3)).unwrap().unwrap();
        assert_eq!(c, Point::new(1, 1));
    }

    #[test]
    fn zero_area_polygons_are_not_targets() {
        let line = Polygon::from(vec![Point::new(0, 0), Point::new(5, 5), Point::new(10, 10)]);
        assert!(centroid(&line).unwrap().is_none());

        let pair = Polygon::from(vec![Point::new(0, 0), Point::new(5, 0)]);
        assert!(centroid(&pair).unwrap().is_none());

        assert!(centroid(&Polygon::default()).unwrap().is_none());
    }

    #[test]
    fn centered_target_is_aligned() {
        let result = compute_alignment(320, 320, 565.0, 0.0175);
        assert_eq!(result.horizontal_error, 0);
        assert_eq!(result.angle_to_turn, 0.0);
        assert!(result.aligned);
    }

    #[test]
    fn tolerance_boundary_is_exclusive() {
        let focal = 565.0;
        let angle = (7.0f64 / focal).atan();

        let at_boundary = compute_alignment(327, 320, focal, angle);
        assert_eq!(at_boundary.angle_to_turn, angle);
        assert!(!at_boundary.aligned);

        let mirrored = compute_alignment(313, 320, focal, angle);
        assert!(!mirrored.aligned);

        assert!(compute_alignment(326, 320, focal, angle).aligned);
    }

    #[test]
    fn alignment_is_pure() {
        let calc = AlignmentCalculator::new(565.2, 1f64.to_radians());
        let a = calc.compute(451, 320);
        let b = calc.compute(451, 320);
        assert_eq!(a.angle_to_turn.to_bits(), b.angle_to_turn.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn angle_sign_follows_error() {
        let calc = AlignmentCalculator::new(500.0, 1f64.to_radians());
        let left = calc.compute(120, 320);
        assert_eq!(left.horizontal_error, -200);
        assert_relative_eq!(left.angle_to_turn, (-200.0f64 / 500.0).atan());
        assert!(!left.aligned);
        assert!(calc.compute(520, 320).angle_to_turn > 0.0);
    }

    #[test]
    fn hints() {
        assert_eq!(HorizontalHint::from_error(3, 10), HorizontalHint::Aligned);
        assert_eq!(HorizontalHint::from_error(10, 10), HorizontalHint::TurnRight);
        assert_eq!(HorizontalHint::from_error(-40, 10), HorizontalHint::TurnLeft);

        assert_eq!(VerticalHint::from_position(245, 240, 10), VerticalHint::Aligned);
        assert_eq!(VerticalHint::from_position(300, 240, 10), VerticalHint::AimLower);
        assert_eq!(VerticalHint::from_position(100, 240, 10), VerticalHint::AimHigher);
        assert_eq!(VerticalHint::AimHigher.to_string(), "Aim Higher");
    }
}
