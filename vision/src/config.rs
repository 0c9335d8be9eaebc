//! Session configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup for a 640x480 Lifecam tracking the green goal tape.

use crate::error::Error;
use crate::mode::Mode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Inclusive bounds in OpenCV's 8-bit HSV space (H in 0..180, S and V in 0..256).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    /// (H, S, V)
    pub lower: (u8, u8, u8),
    /// (H, S, V)
    pub upper: (u8, u8, u8),
}

impl ColorRange {
    pub const GREEN: ColorRange = ColorRange::new((50, 50, 50), (70, 250, 255));
    pub const SAMPLE: ColorRange = ColorRange::new((80, 70, 80), (100, 255, 255));

    pub const fn new(lower: (u8, u8, u8), upper: (u8, u8, u8)) -> Self {
        Self { lower, upper }
    }

    fn is_ordered(&self) -> bool {
        self.lower.0 <= self.upper.0 && self.lower.1 <= self.upper.1 && self.lower.2 <= self.upper.2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreset {
    #[default]
    Green,
    Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: i32,
    pub width: i32,
    pub height: i32,
    pub exposure: f64,
    /// Mirror frames horizontally before processing.
    pub flip: bool,
    /// Consecutive failed reads tolerated before the session ends.
    pub max_read_failures: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: 640,
            height: 480,
            exposure: -8.0,
            flip: false,
            max_read_failures: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub target: ColorPreset,
    pub green: ColorRange,
    pub sample: ColorRange,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            target: ColorPreset::Green,
            green: ColorRange::GREEN,
            sample: ColorRange::SAMPLE,
        }
    }
}

impl ColorConfig {
    pub fn active(&self) -> ColorRange {
        match self.target {
            ColorPreset::Green => self.green,
            ColorPreset::Sample => self.sample,
        }
    }

    pub fn active_mut(&mut self) -> &mut ColorRange {
        match self.target {
            ColorPreset::Green => &mut self.green,
            ColorPreset::Sample => &mut self.sample,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Gaussian kernel side, odd.
    pub blur_kernel: i32,
    /// Open/close the mask after thresholding.
    pub morphology: bool,
    /// Largest contour must reach this area to count as the goal.
    pub min_goal_area: f64,
    /// Exclusive area window for the two blocks flanking the gear peg.
    pub gear_min_area: f64,
    pub gear_max_area: f64,
    /// Horizontal field of view in degrees.
    pub fov_deg: f64,
    /// Overrides the focal length derived from `fov_deg` and the frame width.
    pub focal_length: Option<f64>,
    pub alignment_tolerance_deg: f64,
    pub vertical_tolerance_px: i32,
    pub turn_dead_band_px: i32,
    /// Hull simplification as a fraction of its perimeter, 0 keeps the hull as is.
    pub hull_epsilon: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 11,
            morphology: false,
            min_goal_area: 0.0,
            gear_min_area: 15000.0,
            gear_max_area: 50000.0,
            fov_deg: 59.02039664,
            focal_length: None,
            alignment_tolerance_deg: 1.0,
            vertical_tolerance_px: 10,
            turn_dead_band_px: 10,
            hull_epsilon: 0.0,
        }
    }
}

impl TrackingConfig {
    /// Pinhole focal length in pixels for a frame `width` pixels wide.
    pub fn focal_length_px(&self, width: i32) -> f64 {
        self.focal_length.unwrap_or_else(|| {
            let half_fov = self.fov_deg.to_radians() / 2.0;
            (width as f64 / 2.0) / half_fov.tan()
        })
    }

    pub fn alignment_tolerance_rad(&self) -> f64 {
        self.alignment_tolerance_deg.to_radians()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Area of the square sampled at the frame center.
    pub box_area: u32,
    /// Each calibration frame is written here when set.
    pub snapshot: Option<PathBuf>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            box_area: 1600,
            snapshot: None,
        }
    }
}

impl CalibrationConfig {
    pub fn box_side(&self) -> i32 {
        (self.box_area as f64).sqrt() as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Serial port of the turret controller, values are only logged when unset.
    pub port: Option<PathBuf>,
    pub baud_rate: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub preview: bool,
    /// How long each iteration waits for the cancel key.
    pub poll_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview: true,
            poll_ms: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Asked interactively at startup when unset.
    pub mode: Option<Mode>,
    pub camera: CameraConfig,
    pub color: ColorConfig,
    pub tracking: TrackingConfig,
    pub calibration: CalibrationConfig,
    pub telemetry: TelemetryConfig,
    pub display: DisplayConfig,
}

impl VisionConfig {
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: VisionConfig = toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;

        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        let cam = &self.camera;
        if cam.width <= 0 || cam.height <= 0 {
            return Err(Error::Config(format!(
                "frame size {}x{} must be positive",
                cam.width, cam.height
            )));
        }

        let t = &self.tracking;
        if t.blur_kernel <= 0 || t.blur_kernel % 2 == 0 {
            return Err(Error::Config(format!(
                "blur kernel {} must be odd and positive",
                t.blur_kernel
            )));
        }
        if t.gear_min_area >= t.gear_max_area {
            return Err(Error::Config(format!(
                "gear area window ({}, {}) is empty",
                t.gear_min_area, t.gear_max_area
            )));
        }
        if t.fov_deg <= 0.0 || t.fov_deg >= 180.0 {
            return Err(Error::Config(format!("field of view {} out of range", t.fov_deg)));
        }
        if matches!(t.focal_length, Some(f) if f <= 0.0) {
            return Err(Error::Config("focal length must be positive".into()));
        }

        for (name, range) in [("green", &self.color.green), ("sample", &self.color.sample)] {
            if !range.is_ordered() {
                return Err(Error::Config(format!("{name} range has lower > upper")));
            }
        }

        let side = self.calibration.box_side();
        if side <= 0 || side > cam.width || side > cam.height {
            return Err(Error::Config(format!(
                "calibration box side {side} does not fit the frame"
            )));
        }

        Ok(())
    }
}
