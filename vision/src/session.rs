use crate::config::VisionConfig;
use crate::cv::vision::{FrameReport, Outcome, Vision};
use crate::cv::FrameSource;
use crate::fps::FrameRateMonitor;
use crate::mode::Mode;
use crate::surface::Surface;
use crate::telemetry::{TelemetryChannel, TelemetryPublisher};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs::imwrite;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: u64,
    pub published: u64,
    pub fps: f64,
}

/// The frame loop. One frame in flight, the mode never changes.
pub struct Session {
    vision: Vision,
    max_read_failures: u32,
    snapshot: Option<PathBuf>,
}

impl Session {
    pub fn new(mode: Mode, config: &VisionConfig) -> Self {
        Self {
            vision: Vision::new(mode, config),
            max_read_failures: config.camera.max_read_failures,
            snapshot: config.calibration.snapshot.clone(),
        }
    }

    /// Runs until the surface reports a cancel or the source fails more than
    /// `max_read_failures` times in a row.
    pub fn run<S, C, D>(
        &self,
        source: &mut S,
        publisher: &mut TelemetryPublisher<C>,
        surface: &mut D,
    ) -> crate::Result<SessionSummary>
    where
        S: FrameSource + ?Sized,
        C: TelemetryChannel,
        D: Surface + ?Sized,
    {
        let mode = self.vision.mode();
        let mut monitor = FrameRateMonitor::new(Instant::now());
        let mut summary = SessionSummary::default();
        let mut failures = 0u32;

        log::info!("session started in {mode} mode");

        loop {
            match source.read_frame() {
                Ok(frame) => {
                    failures = 0;
                    summary.fps = monitor.tick(Instant::now());
                    log::debug!("FPS: {:.1}", summary.fps);

                    if self.step(&frame, publisher, surface) {
                        summary.published += 1;
                    }
                    summary.frames += 1;
                }
                Err(err) => {
                    failures += 1;
                    if failures > self.max_read_failures {
                        log::error!("giving up after {failures} failed reads: {err}");
                        return Err(err);
                    }
                    log::warn!(
                        "frame read failed ({failures}/{}): {err}",
                        self.max_read_failures
                    );
                }
            }

            match surface.poll_cancel() {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => log::warn!("cancel poll failed: {err}"),
            }
        }

        log::info!(
            "session stopped after {} frames, {} published",
            summary.frames,
            summary.published
        );

        Ok(summary)
    }

    /// Processes one frame. Returns whether telemetry went out.
    fn step<C, D>(&self, frame: &Mat, publisher: &mut TelemetryPublisher<C>, surface: &mut D) -> bool
    where
        C: TelemetryChannel,
        D: Surface + ?Sized,
    {
        let report = match self.vision.process(frame) {
            Ok(report) => report,
            Err(err) => {
                log::warn!("frame dropped: {err}");
                return self.vision.mode().is_tracking() && publisher.publish(0.0, false);
            }
        };

        let published = match &report.outcome {
            Outcome::Tracking(result) => {
                let (angle_to_turn, aligned) = result.telemetry();
                publisher.publish(angle_to_turn, aligned)
            }
            Outcome::Calibration(_) => {
                self.save_snapshot(frame);
                false
            }
        };

        self.show(&report, surface);

        published
    }

    fn show<D: Surface + ?Sized>(&self, report: &FrameReport, surface: &mut D) {
        if let Err(err) = surface.show(&report.preview) {
            log::warn!("preview failed: {err}");
        }
    }

    fn save_snapshot(&self, frame: &Mat) {
        let Some(path) = &self.snapshot else {
            return;
        };

        match imwrite(&path.to_string_lossy(), frame, &Vector::new()) {
            Ok(true) => {}
            Ok(false) => log::warn!("snapshot to {} was not written", path.display()),
            Err(err) => log::warn!("snapshot to {} failed: {err}", path.display()),
        }
    }
}
