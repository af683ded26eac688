use crate::image_pipeline::common::image::{Image, Pixel};
use crate::image_pipeline::common::parallel::for_each_row;

/// Output size of a clockwise rotation by `angle` degrees in `[0, 90)`.
pub fn rotated_dimensions(width: usize, height: usize, angle: f64) -> (usize, usize) {
    if angle == 0.0 {
        return (width, height);
    }
    let (sine, cosine) = angle.to_radians().sin_cos();
    let (w, h) = (width as f64, height as f64);
    (
        (h * sine + w * cosine).ceil() as usize,
        (w * sine + h * cosine).ceil() as usize,
    )
}

/// Rotates by `angle` degrees in `[0, 90)` into a larger canvas.
///
/// Each output pixel is mapped back into the source and blended bilinearly from its
/// four neighbours; pixels whose neighbourhood leaves the source are zero.
pub fn rotate_arbitrary<P: Pixel>(image: &Image<P>, angle: f64) -> Image<P> {
    if angle == 0.0 || image.is_empty() {
        return image.clone();
    }
    let (sine, cosine) = angle.to_radians().sin_cos();
    let (ow, oh) = (image.width, image.height);
    let (width, height) = rotated_dimensions(ow, oh, angle);
    let mut out = Image::<P>::new(width, height, image.colors);
    let oh_f = oh as f64;

    for_each_row(&mut out.pixels, width, |row, line| {
        let r0 = row as f64;
        for (col, px) in line.iter_mut().enumerate() {
            let c0 = col as f64;
            let c = c0 * cosine + r0 * sine - oh_f * sine * cosine;
            let r = r0 * cosine - c0 * sine + oh_f * sine * sine;
            let (uc, ur) = (c.floor(), r.floor());
            if uc < 0.0 || ur < 0.0 || uc as usize + 1 >= ow || ur as usize + 1 >= oh {
                continue;
            }
            let (fc, fr) = (c - uc, r - ur);
            let (uc, ur) = (uc as usize, ur as usize);
            let p00 = image.pixel(uc, ur);
            let p01 = image.pixel(uc + 1, ur);
            let p10 = image.pixel(uc, ur + 1);
            let p11 = image.pixel(uc + 1, ur + 1);
            for ch in 0..P::CHANNELS {
                let top = p00.channel(ch) as f64 * (1.0 - fc) + p01.channel(ch) as f64 * fc;
                let bottom = p10.channel(ch) as f64 * (1.0 - fc) + p11.channel(ch) as f64 * fc;
                px.set_channel(ch, (top * (1.0 - fr) + bottom * fr + 0.5) as u16);
            }
        }
    });
    out
}
