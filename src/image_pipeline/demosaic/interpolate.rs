use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::demosaic::types::Interpolation;
use crate::image_pipeline::demosaic::{ahd, bilinear, vng};
use crate::image_pipeline::raw::RawFrame;

/// Full-resolution demosaic of the raw cells.
///
/// Each sensor sample becomes `(sample - black) * gain / 0x10000`, clamped to 16 bits,
/// at its own pixel; the strategy fills in the rest. Four-color sensors and the
/// four-color strategy run VNG over the split pattern, AHD needs a three-color Bayer
/// layout and falls back to VNG otherwise. Three-color output from four channels has
/// its two greens averaged.
pub fn interpolate(
    raw: &Image16,
    frame: &RawFrame,
    interpolation: Interpolation,
    gains: [u32; 4],
) -> Result<Image16> {
    let filters = frame.filters.as_ref().ok_or(PipelineError::NoColorFilterArray)?;
    let f4 = filters.four_color();
    let (pattern, colors, mut algorithm) =
        if interpolation == Interpolation::FourColor || frame.colors == 4 {
            (f4.clone(), 4, Interpolation::Vng)
        } else {
            (filters.three_color(), 3, interpolation)
        };
    if algorithm == Interpolation::Ahd && pattern.bayer_cells().is_none() {
        debug!("AHD needs a three-color Bayer layout, using VNG");
        algorithm = Interpolation::Vng;
    }
    let mut gains = gains;
    if frame.colors == 3 {
        gains[3] = gains[1];
    }

    let (width, height) = (frame.width, frame.height);
    let mut image = Image16::new(width, height, frame.colors);
    for row in 0..height {
        let cells = raw.row(row / 2);
        let line = image.row_mut(row);
        for (col, px) in line.iter_mut().enumerate() {
            let c4 = f4.color_at(row, col);
            let v = (cells[col / 2][c4] as i64 - frame.black[c4] as i64).max(0);
            px[pattern.color_at(row, col)] = (v * gains[c4] as i64 / 0x10000).min(0xFFFF) as u16;
        }
    }

    debug!("Interpolating {}x{} with {}", width, height, algorithm.name());
    match algorithm {
        Interpolation::Ahd => ahd::interpolate(&mut image, &pattern),
        Interpolation::Vng | Interpolation::FourColor => vng::interpolate(&mut image, &pattern, colors),
        Interpolation::Bilinear | Interpolation::Half => {
            bilinear::interpolate(&mut image, &pattern, colors)
        }
    }

    if colors == 4 && frame.colors == 3 {
        for px in image.pixels.iter_mut() {
            px[1] = ((px[1] as u32 + px[3] as u32) / 2) as u16;
            px[3] = 0;
        }
    }
    Ok(image)
}
