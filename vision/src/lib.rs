//! Color-target tracking for a turret.
//!
//! Each frame is blurred, thresholded in HSV, reduced to contours and then to
//! one aim point. The horizontal offset of that point becomes a turn angle
//! that is pushed to the turret controller together with an aligned flag.

pub mod config;
pub mod cv;
pub mod error;
pub mod fps;
pub mod geometry;
pub mod mode;
pub mod session;
pub mod surface;
pub mod telemetry;

pub use config::{ColorRange, VisionConfig};
pub use cv::vision::{CalibrationSample, FrameReport, Outcome, TrackingResult, Vision};
pub use cv::{Camera, FrameSource};
pub use geometry::{AlignmentCalculator, AlignmentResult, Target};
pub use mode::Mode;
pub use session::{Session, SessionSummary};
pub use telemetry::list_devices;

pub(crate) type Result<T> = std::result::Result<T, crate::error::Error>;
