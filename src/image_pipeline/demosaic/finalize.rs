use tracing::{info, instrument};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::demosaic::fuji::fuji_unskew;
use crate::image_pipeline::demosaic::interpolate::interpolate;
use crate::image_pipeline::demosaic::shrink::shrink;
use crate::image_pipeline::demosaic::types::Interpolation;
use crate::image_pipeline::raw::RawFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalizeParams {
    pub interpolation: Interpolation,
    /// 1 interpolates at full resolution; anything larger shrinks.
    pub scale: usize,
    /// Fixed-point white balance gains, `WB_UNITY` meaning 1.0.
    pub gains: [u32; 4],
}

/// Integer downscale for the first phase.
///
/// A shrink factor without output size wins (reduced for non-square pixels so the
/// later stretch never upsamples), then half-size interpolation, then a requested size
/// at most half of the crop's long edge on a mosaic sensor.
pub fn choose_scale(
    shrink: usize,
    size: usize,
    interpolation: Interpolation,
    has_filters: bool,
    pixel_aspect: f64,
    crop_size: usize,
) -> usize {
    if size == 0 && shrink > 1 {
        let aspect = if pixel_aspect > 0.0 && pixel_aspect.is_finite() {
            pixel_aspect.min(1.0 / pixel_aspect)
        } else {
            1.0
        };
        ((shrink as f64 * aspect) as usize).max(1)
    } else if interpolation == Interpolation::Half {
        2
    } else if size > 0 && has_filters && crop_size / size >= 2 {
        2
    } else {
        1
    }
}

/// Produces the first full-color image from the raw cells.
#[instrument(skip(raw, frame), fields(width = frame.width, height = frame.height))]
pub fn finalize(raw: &Image16, frame: &RawFrame, params: &FinalizeParams) -> Result<Image16> {
    let scale = params.scale.max(1);
    let has_filters = frame.filters.is_some();
    let (mut image, fuji_width) = if has_filters && scale == 1 {
        (interpolate(raw, frame, params.interpolation, params.gains)?, frame.fuji_width)
    } else {
        let fuji_width = if has_filters && scale % 2 == 0 {
            ((frame.fuji_width + 1) >> 1) / (scale / 2)
        } else {
            frame.fuji_width / scale
        };
        (shrink(raw, frame, scale, params.gains), fuji_width)
    };
    fuji_unskew(&mut image, fuji_width, frame.fuji_step);
    info!(
        scale,
        width = image.width,
        height = image.height,
        "Finalized raw data"
    );
    Ok(image)
}
