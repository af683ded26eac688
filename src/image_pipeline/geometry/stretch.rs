use crate::image_pipeline::common::image::{Image, Pixel};

/// Size after correcting a `pixel_aspect` (width over height of one sensor pixel).
pub fn stretched_dimensions(width: usize, height: usize, pixel_aspect: f64) -> (usize, usize) {
    if pixel_aspect == 1.0 || pixel_aspect <= 0.0 || !pixel_aspect.is_finite() {
        (width, height)
    } else if pixel_aspect < 1.0 {
        (width, (height as f64 / pixel_aspect + 0.5) as usize)
    } else {
        ((width as f64 * pixel_aspect + 0.5) as usize, height)
    }
}

/// Makes pixels square: aspects below one stretch rows apart, above one stretch
/// columns apart, using linear interpolation between the two nearest source lines.
pub fn stretch<P: Pixel>(image: &Image<P>, pixel_aspect: f64) -> Image<P> {
    let (width, height) = stretched_dimensions(image.width, image.height, pixel_aspect);
    if (width, height) == (image.width, image.height) || image.is_empty() {
        return image.clone();
    }
    let mut out = Image::<P>::new(width, height, image.colors);
    let blend = |a: &P, b: &P, frac: f64| {
        let mut p = P::default();
        for ch in 0..P::CHANNELS {
            let v = a.channel(ch) as f64 * (1.0 - frac) + b.channel(ch) as f64 * frac + 0.5;
            p.set_channel(ch, v as u16);
        }
        p
    };

    if pixel_aspect < 1.0 {
        for row in 0..height {
            let rc = row as f64 * pixel_aspect;
            let r = (rc as usize).min(image.height - 1);
            let frac = rc - r as f64;
            let r1 = (r + 1).min(image.height - 1);
            for col in 0..width {
                *out.pixel_mut(col, row) = blend(image.pixel(col, r), image.pixel(col, r1), frac);
            }
        }
    } else {
        for col in 0..width {
            let rc = col as f64 / pixel_aspect;
            let c = (rc as usize).min(image.width - 1);
            let frac = rc - c as f64;
            let c1 = (c + 1).min(image.width - 1);
            for row in 0..height {
                *out.pixel_mut(col, row) = blend(image.pixel(c, row), image.pixel(c1, row), frac);
            }
        }
    }
    out
}
