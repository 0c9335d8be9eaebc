use approx::assert_relative_eq;
use opencv::core::{count_non_zero, Mat, Point, Rect, Scalar, Vec3b, CV_8UC1, CV_8UC3};
use opencv::imgproc::{cvt_color, rectangle, COLOR_BGR2HSV, FILLED, LINE_8};
use opencv::prelude::*;
use turret_vision::cv::contours::{extract_contours, TargetSelector};
use turret_vision::cv::segment::ColorSegmenter;
use turret_vision::geometry::compute_alignment;
use turret_vision::{AlignmentCalculator, Mode, Outcome, Target, Vision, VisionConfig};

const TAPE: (f64, f64, f64) = (40., 200., 40.);

fn blank(rows: i32, cols: i32) -> Mat {
    Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.)).unwrap()
}

fn paint(frame: &mut Mat, rect: Rect, bgr: (f64, f64, f64)) {
    let color = Scalar::new(bgr.0, bgr.1, bgr.2, 0.);
    rectangle(frame, rect, color, FILLED, LINE_8, 0).unwrap();
}

fn tracking(outcome: Outcome) -> turret_vision::TrackingResult {
    match outcome {
        Outcome::Tracking(result) => result,
        Outcome::Calibration(_) => panic!("expected a tracking outcome"),
    }
}

#[test]
fn solid_rectangle_centroid_is_recovered() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::TrackingShooting, &config);

    for (cx, cy) in [(400, 300), (120, 90), (320, 240)] {
        let mut frame = blank(480, 640);
        paint(&mut frame, Rect::new(cx - 50, cy - 30, 101, 61), TAPE);

        let result = tracking(vision.process(&frame).unwrap().outcome);
        let aim = result.aim_point.expect("target found");
        assert!((aim.x - cx).abs() <= 1, "x {} vs {cx}", aim.x);
        assert!((aim.y - cy).abs() <= 1, "y {} vs {cy}", aim.y);
        assert_eq!(result.targets.len(), 1);
    }
}

#[test]
fn centered_goal_is_aligned_and_published_as_is() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::TrackingShooting, &config);

    let mut frame = blank(480, 640);
    paint(&mut frame, Rect::new(270, 200, 101, 81), TAPE);

    let result = tracking(vision.process(&frame).unwrap().outcome);
    let alignment = result.alignment.unwrap();
    assert!(alignment.horizontal_error.abs() <= 1);
    assert!(alignment.aligned);
    assert_eq!(result.telemetry(), (alignment.angle_to_turn, true));
}

#[test]
fn empty_frame_publishes_defaults() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::TrackingShooting, &config);

    let result = tracking(vision.process(&blank(480, 640)).unwrap().outcome);
    assert!(result.targets.is_empty());
    assert!(result.alignment.is_none());
    assert_eq!(result.telemetry(), (0.0, false));
}

#[test]
fn largest_goal_wins_in_shooting_mode() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::TrackingShooting, &config);

    let mut frame = blank(480, 640);
    paint(&mut frame, Rect::new(40, 40, 31, 31), TAPE);
    paint(&mut frame, Rect::new(450, 300, 121, 61), TAPE);

    let result = tracking(vision.process(&frame).unwrap().outcome);
    let aim = result.aim_point.unwrap();
    assert!((aim.x - 510).abs() <= 1);
    assert!(result.alignment.unwrap().angle_to_turn > 0.0);
}

/// Two blocks of area 20000 and 21000 whose centroids sit at x = 100 and x = 140.
fn gear_mask() -> Mat {
    let mut mask = Mat::new_rows_cols_with_default(720, 640, CV_8UC1, Scalar::all(0.)).unwrap();
    // contours run through pixel centers, so a w x h rect traces (w-1) x (h-1)
    rectangle(&mut mask, Rect::new(84, 10, 33, 626), Scalar::all(255.), FILLED, LINE_8, 0).unwrap();
    rectangle(&mut mask, Rect::new(125, 10, 31, 701), Scalar::all(255.), FILLED, LINE_8, 0).unwrap();
    mask
}

#[test]
fn gear_pair_midpoint_drives_the_angle() {
    let selector = TargetSelector::new(0.0, 15000.0, 50000.0, 0.0);
    let contours = extract_contours(&gear_mask()).unwrap();
    let (a, b) = selector.select_gear_targets(&contours).unwrap().expect("two blocks");

    let a = Target::from_polygon(a).unwrap().unwrap();
    let b = Target::from_polygon(b).unwrap().unwrap();
    let mut areas = [a.area, b.area];
    areas.sort_by(f64::total_cmp);
    assert_relative_eq!(areas[0], 20000.0);
    assert_relative_eq!(areas[1], 21000.0);

    let mut xs = [a.centroid.x, b.centroid.x];
    xs.sort();
    assert_eq!(xs, [100, 140]);

    let midpoint = (a.centroid.x + b.centroid.x) / 2;
    assert_eq!(midpoint, 120);

    let focal = 565.0;
    let result = compute_alignment(midpoint, 320, focal, 1f64.to_radians());
    assert_eq!(result.horizontal_error, -200);
    assert_eq!(result.angle_to_turn, (-200.0f64 / focal).atan());
    assert!(!result.aligned);
}

#[test]
fn gear_mode_end_to_end() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::TrackingGear, &config);

    let mut frame = blank(720, 640);
    paint(&mut frame, Rect::new(84, 10, 33, 626), TAPE);
    paint(&mut frame, Rect::new(125, 10, 31, 701), TAPE);

    let result = tracking(vision.process(&frame).unwrap().outcome);
    assert_eq!(result.targets.len(), 2);

    let aim = result.aim_point.unwrap();
    assert!((aim.x - 120).abs() <= 1, "midpoint {}", aim.x);

    let alignment = result.alignment.unwrap();
    assert!((alignment.horizontal_error + 200).abs() <= 1);
    let expected = AlignmentCalculator::from_config(&config).compute(aim.x, 320);
    assert_eq!(alignment, expected);
}

#[test]
fn gear_mode_ignores_a_single_block() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::TrackingGear, &config);

    let mut frame = blank(720, 640);
    paint(&mut frame, Rect::new(84, 10, 33, 626), TAPE);

    let result = tracking(vision.process(&frame).unwrap().outcome);
    assert!(result.aim_point.is_none());
    assert_eq!(result.telemetry(), (0.0, false));
}

#[test]
fn report_carries_the_mask_targets_came_from() {
    let config = VisionConfig::default();
    let mut frame = blank(480, 640);
    paint(&mut frame, Rect::new(200, 150, 81, 61), TAPE);

    let report = Vision::new(Mode::TrackingShooting, &config).process(&frame).unwrap();
    let mask = report.mask.expect("tracking reports a mask");
    let expected = ColorSegmenter::from_config(&config.tracking)
        .segment(&frame, config.color.active())
        .unwrap()
        .mask;
    assert!(count_non_zero(&mask).unwrap() > 0);
    assert_eq!(count_non_zero(&mask).unwrap(), count_non_zero(&expected).unwrap());
    assert_eq!(extract_contours(&mask).unwrap().len(), 1);

    let calibration = Vision::new(Mode::Calibration, &config).process(&frame).unwrap();
    assert!(calibration.mask.is_none());
}

fn hsv_of(bgr: (f64, f64, f64)) -> [u8; 3] {
    let uniform = Mat::new_rows_cols_with_default(480, 640, CV_8UC3, Scalar::new(bgr.0, bgr.1, bgr.2, 0.)).unwrap();
    let mut hsv = Mat::default();
    cvt_color(&uniform, &mut hsv, COLOR_BGR2HSV, 0).unwrap();
    hsv.at_2d::<Vec3b>(240, 320).unwrap().0
}

#[test]
fn calibration_reports_the_box_color_only() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::Calibration, &config);
    let color = (37., 180., 90.);

    let mut frame = blank(480, 640);
    paint(&mut frame, Rect::new(0, 0, 640, 240), (255., 0., 255.));
    paint(&mut frame, Rect::new(0, 240, 640, 240), (10., 20., 250.));
    // 40x40 box centered at (320, 240)
    paint(&mut frame, Rect::new(300, 220, 40, 40), color);

    let report = vision.process(&frame).unwrap();
    let sample = match report.outcome {
        Outcome::Calibration(sample) => sample,
        Outcome::Tracking(_) => panic!("expected calibration"),
    };

    assert_eq!(sample.region, Rect::new(300, 220, 40, 40));
    assert_eq!(sample.bgr, [37, 180, 90]);
    assert_eq!(sample.hsv, hsv_of(color));
}

#[test]
fn calibration_preview_keeps_the_raw_frame() {
    let config = VisionConfig::default();
    let vision = Vision::new(Mode::Calibration, &config);
    let frame = blank(480, 640);

    let report = vision.process(&frame).unwrap();
    assert_eq!(report.preview.size().unwrap(), frame.size().unwrap());
    // box outline is drawn on the copy only
    let corner = report.preview.at_2d::<Vec3b>(220, 300).unwrap();
    assert_eq!(corner.0, [0, 255, 0]);
    assert_eq!(frame.at_2d::<Vec3b>(220, 300).unwrap().0, [0, 0, 0]);
}

#[test]
fn square_centroid_is_its_center() {
    let polygon = turret_vision::geometry::Polygon::from(vec![
        Point::new(0, 0),
        Point::new(0, 10),
        Point::new(10, 10),
        Point::new(10, 0),
    ]);
    assert_eq!(
        turret_vision::geometry::centroid(&polygon).unwrap(),
        Some(Point::new(5, 5))
    );
}
