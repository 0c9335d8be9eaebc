use crate::config::TrackingConfig;
use crate::geometry::Polygon;
use opencv::core::{Mat, Point, Vector};
use opencv::imgproc::{
    approx_poly_dp, arc_length, contour_area, convex_hull, find_contours, CHAIN_APPROX_SIMPLE,
    RETR_EXTERNAL,
};

pub type Contour = Vector<Point>;

/// Outer boundaries of the blobs in a binary mask, holes are skipped.
pub fn extract_contours(mask: &Mat) -> crate::Result<Vector<Contour>> {
    let mut contours = Vector::<Contour>::new();
    find_contours(
        mask,
        &mut contours,
        RETR_EXTERNAL,
        CHAIN_APPROX_SIMPLE,
        Point::default(),
    )?;

    Ok(contours)
}

/// Convex hull of `contour`, optionally simplified by `epsilon` times its perimeter.
pub fn convex_polygon(contour: &Contour, epsilon: f64) -> crate::Result<Polygon> {
    let mut hull = Contour::new();
    convex_hull(contour, &mut hull, false, true)?;

    if epsilon <= 0.0 {
        return Ok(Polygon::new(hull));
    }

    let mut approx = Contour::new();
    approx_poly_dp(&hull, &mut approx, epsilon * arc_length(&hull, true)?, true)?;

    Ok(Polygon::new(approx))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSelector {
    min_goal_area: f64,
    gear_min_area: f64,
    gear_max_area: f64,
    hull_epsilon: f64,
}

impl TargetSelector {
    pub fn new(min_goal_area: f64, gear_min_area: f64, gear_max_area: f64, hull_epsilon: f64) -> Self {
        Self {
            min_goal_area,
            gear_min_area,
            gear_max_area,
            hull_epsilon,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(
            config.min_goal_area,
            config.gear_min_area,
            config.gear_max_area,
            config.hull_epsilon,
        )
    }

    /// Hull of the largest contour, the first one found wins a tie.
    pub fn select_shooting_target(&self, contours: &Vector<Contour>) -> crate::Result<Option<Polygon>> {
        let mut largest: Option<(f64, Contour)> = None;
        for c in contours {
            let area = contour_area(&c, false)?;
            if largest.as_ref().map_or(true, |(best, _)| area > *best) {
                largest = Some((area, c));
            }
        }

        match largest {
            Some((area, c)) if area >= self.min_goal_area => {
                Ok(Some(convex_polygon(&c, self.hull_epsilon)?))
            }
            _ => Ok(None),
        }
    }

    /// The two blocks flanking the peg. Anything other than exactly two
    /// contours inside the area window means no target this frame.
    pub fn select_gear_targets(
        &self,
        contours: &Vector<Contour>,
    ) -> crate::Result<Option<(Polygon, Polygon)>> {
        let mut blocks = Vec::with_capacity(2);
        for c in contours {
            let area = contour_area(&c, false)?;
            if self.gear_min_area < area && area < self.gear_max_area {
                blocks.push(c);
            }
        }

        match blocks.as_slice() {
            [first, second] => Ok(Some((
                convex_polygon(first, self.hull_epsilon)?,
                convex_polygon(second, self.hull_epsilon)?,
            ))),
            _ => {
                log::trace!("{} gear blocks in window, need 2", blocks.len());
                Ok(None)
            }
        }
    }
}
