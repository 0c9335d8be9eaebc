use crate::config::CameraConfig;
use crate::error::Error;
use opencv::core::{flip, Mat};
use opencv::imgproc::cvt_color;
use opencv::prelude::{MatTraitConst, MatTraitConstManual, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{self, VideoCapture};

pub mod annotate;
pub mod contours;
pub mod segment;
pub mod vision;

/// Anything that hands out one BGR frame per call.
pub trait FrameSource {
    fn read_frame(&mut self) -> crate::Result<Mat>;
}

/// Owns the capture device for as long as it lives, released on drop.
pub struct Camera {
    device: i32,
    source: VideoCapture,
    flip_frame: bool,
}

impl Camera {
    pub fn open(config: &CameraConfig) -> crate::Result<Self> {
        let source = VideoCapture::new(config.device, videoio::CAP_ANY)?;
        if !source.is_opened()? {
            return Err(Error::Camera {
                device: config.device,
                reason: "could not be opened".into(),
            });
        }

        let mut camera = Self {
            device: config.device,
            source,
            flip_frame: config.flip,
        };
        camera.apply(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
        camera.apply(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
        camera.apply(videoio::CAP_PROP_EXPOSURE, config.exposure)?;

        log::info!(
            "camera {} opened at {}x{}",
            config.device,
            config.width,
            config.height
        );

        Ok(camera)
    }

    pub fn set_flip(&mut self, flip_frame: bool) {
        self.flip_frame = flip_frame;
    }

    fn apply(&mut self, prop: i32, value: f64) -> crate::Result<()> {
        if !self.source.set(prop, value)? {
            log::warn!("camera {} ignored property {prop} = {value}", self.device);
        }

        Ok(())
    }
}

impl FrameSource for Camera {
    fn read_frame(&mut self) -> crate::Result<Mat> {
        let mut frame = Mat::default();
        let grabbed = self.source.read(&mut frame)?;
        if !grabbed || frame.rows() == 0 || frame.cols() == 0 {
            return Err(Error::Camera {
                device: self.device,
                reason: "no frame".into(),
            });
        }

        if !self.flip_frame {
            return Ok(frame);
        }

        let mut flipped = Mat::default();
        flip(&frame, &mut flipped, 1)?;

        Ok(flipped)
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        match self.source.release() {
            Ok(()) => log::info!("camera {} released", self.device),
            Err(err) => log::warn!("camera {} release failed: {err}", self.device),
        }
    }
}

pub fn to_rgba(frame: &Mat, code: i32) -> crate::Result<Mat> {
    let mut rgba_frame = Mat::default();
    cvt_color(&frame, &mut rgba_frame, code, 0)?;

    Ok(rgba_frame)
}

/// `[width, height]` and the raw bytes of a continuous `mat`.
pub fn mat_size_and_vec(mat: &Mat) -> crate::Result<([usize; 2], Vec<u8>)> {
    if !mat.is_continuous() {
        return Err(Error::OpenCV(opencv::Error::new(
            opencv::core::StsBadArg,
            "mat is not continuous",
        )));
    }

    Ok((
        [mat.cols() as usize, mat.rows() as usize],
        mat.data_bytes()?.into(),
    ))
}
