use tracing::debug;

use crate::image_pipeline::common::image::Image16;

/// Resamples a panoramic sensor image, stored rotated by 45°, onto a square grid.
///
/// `fuji_width` is the width of the diagonal band in the current image's pixels and
/// `step` the distance of one output pixel along the sensor diagonal. Zero width or a
/// unit step leave the image as it is.
pub fn fuji_unskew(image: &mut Image16, fuji_width: usize, step: f64) {
    if fuji_width == 0 || step == 1.0 || !(step > 0.0) || image.is_empty() {
        return;
    }
    let (width, height) = (image.width, image.height);
    if fuji_width >= height {
        return;
    }
    let wide = (fuji_width as f64 / step) as usize;
    let high = ((height - fuji_width) as f64 / step) as usize;
    debug!("Fuji unskew {}x{} -> {}x{}", width, height, wide, high);

    let mut out = Image16::new(wide, high, image.colors);
    for row in 0..high {
        for col in 0..wide {
            let r = fuji_width as f64 + (row as f64 - col as f64) * step;
            let c = (row + col) as f64 * step;
            if r < 0.0 || c < 0.0 {
                continue;
            }
            let (ur, uc) = (r as usize, c as usize);
            if ur + 2 > height || uc + 2 > width {
                continue;
            }
            let (fr, fc) = (r - ur as f64, c - uc as f64);
            let p00 = image.pixel(uc, ur);
            let p01 = image.pixel(uc + 1, ur);
            let p10 = image.pixel(uc, ur + 1);
            let p11 = image.pixel(uc + 1, ur + 1);
            let dst = out.pixel_mut(col, row);
            for ch in 0..image.colors.min(4) {
                let top = p00[ch] as f64 * (1.0 - fc) + p01[ch] as f64 * fc;
                let bottom = p10[ch] as f64 * (1.0 - fc) + p11[ch] as f64 * fc;
                dst[ch] = (top * (1.0 - fr) + bottom * fr) as u16;
            }
        }
    }
    *image = out;
}
