use crate::config::{ColorRange, VisionConfig};
use crate::cv::annotate::{draw_aim_point, draw_calibration_box, draw_static, draw_target};
use crate::cv::contours::{extract_contours, Contour, TargetSelector};
use crate::cv::segment::ColorSegmenter;
use crate::geometry::{AlignmentCalculator, AlignmentResult, HorizontalHint, Target, VerticalHint};
use crate::mode::Mode;
use opencv::core::{Mat, Point, Rect, Scalar, Vec3b, Vector, CV_8UC3};
use opencv::imgproc::{cvt_color, COLOR_BGR2HSV};
use opencv::prelude::MatTraitConst;
use std::fmt::{Display, Formatter};

/// Mean color of the calibration box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub region: Rect,
    pub bgr: [u8; 3],
    pub hsv: [u8; 3],
}

impl Display for CalibrationSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HSV [{} {} {}] (BGR [{} {} {}])",
            self.hsv[0], self.hsv[1], self.hsv[2], self.bgr[0], self.bgr[1], self.bgr[2]
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackingResult {
    /// One goal in shooting mode, the two peg blocks in gear mode.
    pub targets: Vec<Target>,
    /// Point the turret should face, absent when nothing qualified.
    pub aim_point: Option<Point>,
    pub alignment: Option<AlignmentResult>,
    pub horizontal: Option<HorizontalHint>,
    pub vertical: Option<VerticalHint>,
}

impl TrackingResult {
    /// `(angle_to_turn, aligned)` to publish, `(0.0, false)` without a target.
    pub fn telemetry(&self) -> (f64, bool) {
        self.alignment
            .map_or((0.0, false), |a| (a.angle_to_turn, a.aligned))
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Calibration(CalibrationSample),
    Tracking(TrackingResult),
}

pub struct FrameReport {
    pub outcome: Outcome,
    /// Annotated image for the debug window.
    pub preview: Mat,
    /// Binary mask the targets were taken from, tracking modes only.
    pub mask: Option<Mat>,
}

/// Per-frame processing for one fixed [`Mode`].
pub struct Vision {
    mode: Mode,
    range: ColorRange,
    segmenter: ColorSegmenter,
    selector: TargetSelector,
    alignment: AlignmentCalculator,
    box_side: i32,
    vertical_tolerance: i32,
    dead_band: i32,
}

impl Vision {
    pub fn new(mode: Mode, config: &VisionConfig) -> Self {
        Self {
            mode,
            range: config.color.active(),
            segmenter: ColorSegmenter::from_config(&config.tracking),
            selector: TargetSelector::from_config(&config.tracking),
            alignment: AlignmentCalculator::from_config(config),
            box_side: config.calibration.box_side(),
            vertical_tolerance: config.tracking.vertical_tolerance_px,
            dead_band: config.tracking.turn_dead_band_px,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn process(&self, frame: &Mat) -> crate::Result<FrameReport> {
        match self.mode {
            Mode::Calibration => {
                let sample = self.calibrate(frame)?;
                log::info!("calibration box: {sample}");

                let mut preview = frame.try_clone()?;
                draw_calibration_box(&mut preview, sample.region)?;

                Ok(FrameReport {
                    outcome: Outcome::Calibration(sample),
                    preview,
                    mask: None,
                })
            }
            Mode::TrackingShooting | Mode::TrackingGear => {
                let seg = self.segmenter.segment(frame, self.range)?;
                let contours = extract_contours(&seg.mask)?;

                let targets = if self.mode == Mode::TrackingShooting {
                    self.shooting_targets(&contours)?
                } else {
                    self.gear_targets(&contours)?
                };
                let result = self.align(frame, targets);

                let mut preview = seg.masked;
                draw_static(&mut preview)?;
                for target in &result.targets {
                    draw_target(&mut preview, target)?;
                }
                if let (Mode::TrackingGear, Some(aim)) = (self.mode, result.aim_point) {
                    draw_aim_point(&mut preview, aim)?;
                }

                Ok(FrameReport {
                    outcome: Outcome::Tracking(result),
                    preview,
                    mask: Some(seg.mask),
                })
            }
        }
    }

    fn shooting_targets(&self, contours: &Vector<Contour>) -> crate::Result<Vec<Target>> {
        let Some(goal) = self.selector.select_shooting_target(contours)? else {
            return Ok(Vec::new());
        };

        Ok(Target::from_polygon(goal)?.into_iter().collect())
    }

    fn gear_targets(&self, contours: &Vector<Contour>) -> crate::Result<Vec<Target>> {
        let Some((left, right)) = self.selector.select_gear_targets(contours)? else {
            return Ok(Vec::new());
        };

        // both blocks must be real polygons for the midpoint to mean anything
        match (Target::from_polygon(left)?, Target::from_polygon(right)?) {
            (Some(a), Some(b)) => Ok(vec![a, b]),
            _ => Ok(Vec::new()),
        }
    }

    fn align(&self, frame: &Mat, targets: Vec<Target>) -> TrackingResult {
        let aim_point = match targets.as_slice() {
            [goal] => Some(goal.centroid),
            [a, b] => Some(Point::new(
                (a.centroid.x + b.centroid.x) / 2,
                (a.centroid.y + b.centroid.y) / 2,
            )),
            _ => None,
        };

        let Some(aim) = aim_point else {
            log::debug!("no target");
            return TrackingResult {
                targets,
                ..Default::default()
            };
        };

        let center = Point::new(frame.cols() / 2, frame.rows() / 2);
        let alignment = self.alignment.compute(aim.x, center.x);
        let horizontal = HorizontalHint::from_error(alignment.horizontal_error, self.dead_band);
        let vertical = VerticalHint::from_position(aim.y, center.y, self.vertical_tolerance);

        log::debug!(
            "aim {},{} angle {:.4} rad aligned {} | {horizontal} | {vertical}",
            aim.x,
            aim.y,
            alignment.angle_to_turn,
            alignment.aligned
        );

        TrackingResult {
            targets,
            aim_point,
            alignment: Some(alignment),
            horizontal: Some(horizontal),
            vertical: Some(vertical),
        }
    }

    /// Averages the raw (unblurred) pixels inside the centered box and converts
    /// the mean to HSV. Nothing outside the box influences the result.
    pub fn calibrate(&self, frame: &Mat) -> crate::Result<CalibrationSample> {
        let side = self.box_side.min(frame.cols()).min(frame.rows());
        let region = Rect::new(
            frame.cols() / 2 - side / 2,
            frame.rows() / 2 - side / 2,
            side,
            side,
        );

        let mut sum = [0u64; 3];
        for row in region.y..region.y + region.height {
            for col in region.x..region.x + region.width {
                let px = frame.at_2d::<Vec3b>(row, col)?;
                for (acc, channel) in sum.iter_mut().zip(px.0) {
                    *acc += channel as u64;
                }
            }
        }

        let n = (region.width * region.height).max(1) as u64;
        let bgr = sum.map(|s| ((s + n / 2) / n) as u8);

        let mean = Mat::new_rows_cols_with_default(
            1,
            1,
            CV_8UC3,
            Scalar::new(bgr[0] as f64, bgr[1] as f64, bgr[2] as f64, 0.),
        )?;
        let mut hsv = Mat::default();
        cvt_color(&mean, &mut hsv, COLOR_BGR2HSV, 0)?;
        let px = hsv.at_2d::<Vec3b>(0, 0)?;

        Ok(CalibrationSample {
            region,
            bgr,
            hsv: px.0,
        })
    }
}
