use crate::config::{ColorRange, TrackingConfig};
use opencv::core::{bitwise_and, in_range, Mat, Point, Scalar, Size, BORDER_CONSTANT, BORDER_DEFAULT};
use opencv::imgproc::{
    cvt_color, gaussian_blur, get_structuring_element, morphology_default_border_value,
    morphology_ex, COLOR_BGR2HSV, MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN,
};
use opencv::prelude::MatTraitConst;

const NEG_POINT: Point = Point::new(-1, -1);

pub struct Segmentation {
    /// Blurred frame with every pixel outside the mask zeroed.
    pub masked: Mat,
    /// 255 where the blurred pixel falls inside the range, 0 elsewhere.
    pub mask: Mat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSegmenter {
    blur_kernel: i32,
    morphology: bool,
}

fn hsv_scalar(hsv: (u8, u8, u8)) -> Scalar {
    Scalar::new(hsv.0 as f64, hsv.1 as f64, hsv.2 as f64, 0.)
}

impl ColorSegmenter {
    pub fn new(blur_kernel: i32, morphology: bool) -> Self {
        Self {
            blur_kernel,
            morphology,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.blur_kernel, config.morphology)
    }

    pub fn segment(&self, frame: &Mat, range: ColorRange) -> crate::Result<Segmentation> {
        let mut blurred = Mat::default();
        let ksize = Size::new(self.blur_kernel, self.blur_kernel);
        gaussian_blur(frame, &mut blurred, ksize, 0., 0., BORDER_DEFAULT)?;

        let mut hsv_frame = Mat::default();
        cvt_color(&blurred, &mut hsv_frame, COLOR_BGR2HSV, 0)?;

        let mut mask = Mat::default();
        in_range(
            &hsv_frame,
            &hsv_scalar(range.lower),
            &hsv_scalar(range.upper),
            &mut mask,
        )?;

        if self.morphology {
            mask = denoise(&mask)?;
        }

        let mut masked = Mat::new_size_with_default(blurred.size()?, blurred.typ(), Scalar::all(0.))?;
        bitwise_and(&blurred, &blurred, &mut masked, &mask)?;

        Ok(Segmentation { masked, mask })
    }
}

/// Opening drops speckles, closing fills pinholes left inside the tape.
fn denoise(mask: &Mat) -> crate::Result<Mat> {
    let kernel_close = get_structuring_element(MORPH_ELLIPSE, Size::new(3, 3), NEG_POINT)?;
    let kernel_open = get_structuring_element(MORPH_ELLIPSE, Size::new(7, 7), NEG_POINT)?;

    let mut morph_open = Mat::default();
    morphology_ex(
        mask,
        &mut morph_open,
        MORPH_OPEN,
        &kernel_open,
        NEG_POINT,
        2,
        BORDER_CONSTANT,
        morphology_default_border_value()?,
    )?;

    let mut morph_close = Mat::default();
    morphology_ex(
        &morph_open,
        &mut morph_close,
        MORPH_CLOSE,
        &kernel_close,
        NEG_POINT,
        4,
        BORDER_CONSTANT,
        morphology_default_border_value()?,
    )?;

    Ok(morph_close)
}
