//! Debug overlays for the preview window. Nothing here feeds back into tracking.

use crate::geometry::{Polygon, Target};
use opencv::core::{Mat, Point, Rect, Scalar, Vector};
use opencv::imgproc::{circle, line, polylines, put_text, rectangle, FONT_HERSHEY_PLAIN, LINE_8};
use opencv::prelude::MatTraitConst;

fn red() -> Scalar {
    Scalar::new(0., 0., 255., 0.)
}

fn green() -> Scalar {
    Scalar::new(0., 255., 0., 0.)
}

fn blue() -> Scalar {
    Scalar::new(255., 0., 0., 0.)
}

/// Frame center dot and the vertical reference line through it.
pub fn draw_static(img: &mut Mat) -> crate::Result<()> {
    let rows = img.rows();
    let center = Point::new(img.cols() / 2, rows / 2);
    circle(img, center, 5, red(), -1, LINE_8, 0)?;
    line(
        img,
        Point::new(center.x, 0),
        Point::new(center.x, rows),
        red(),
        2,
        LINE_8,
        0,
    )?;

    Ok(())
}

pub fn draw_polygon(img: &mut Mat, polygon: &Polygon) -> crate::Result<()> {
    let mut pts = Vector::<Vector<Point>>::new();
    pts.push(polygon.points().clone());
    polylines(img, &pts, true, blue(), 5, LINE_8, 0)?;

    Ok(())
}

pub fn draw_target(img: &mut Mat, target: &Target) -> crate::Result<()> {
    draw_polygon(img, &target.boundary)?;
    circle(img, target.centroid, 5, blue(), -1, LINE_8, 0)?;
    put_text(
        img,
        &target.to_string(),
        Point::new(target.centroid.x, target.centroid.y - 10),
        FONT_HERSHEY_PLAIN,
        1.,
        blue(),
        2,
        LINE_8,
        false,
    )?;

    Ok(())
}

/// Midpoint between the gear blocks.
pub fn draw_aim_point(img: &mut Mat, aim: Point) -> crate::Result<()> {
    circle(img, aim, 5, green(), -1, LINE_8, 0)?;

    Ok(())
}

pub fn draw_calibration_box(img: &mut Mat, region: Rect) -> crate::Result<()> {
    rectangle(img, region, green(), 1, LINE_8, 0)?;

    Ok(())
}
