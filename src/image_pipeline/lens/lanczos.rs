//! Radial Lanczos resampling used by the lens remap.

use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::image_pipeline::common::image::{Image, Pixel};

/// Kernel radius in pixels.
pub const LANCZOS_SUPPORT: usize = 2;
/// Table entries per unit of squared distance.
const TABLE_RES: usize = 256;

/// Kernel indexed by squared distance, so no square root is needed per tap.
fn kernel_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let support = LANCZOS_SUPPORT as f32;
        (0..LANCZOS_SUPPORT * LANCZOS_SUPPORT * TABLE_RES)
            .map(|i| {
                if i == 0 {
                    return 1.0;
                }
                let d = (i as f32 / TABLE_RES as f32).sqrt();
                support * (PI * d).sin() * (PI / support * d).sin() / (PI * PI * d * d)
            })
            .collect()
    })
}

/// Channel `c` of `image` at the fractional position `(x, y)`. Taps outside the image
/// repeat the border; positions outside the image yield zero.
pub fn sample<P: Pixel>(image: &Image<P>, x: f32, y: f32, c: usize) -> u16 {
    if !(x > -0.5 && y > -0.5 && x < image.width as f32 - 0.5 && y < image.height as f32 - 0.5) {
        return 0;
    }
    let table = kernel_table();
    let limit = (LANCZOS_SUPPORT * LANCZOS_SUPPORT) as f32;
    let (xf, yf) = (x.floor() as isize, y.floor() as isize);
    let s = LANCZOS_SUPPORT as isize;
    let (max_x, max_y) = (image.width as isize - 1, image.height as isize - 1);

    let mut sum = 0.0f32;
    let mut norm = 0.0f32;
    for yy in yf + 1 - s..=yf + s {
        let dy = y - yy as f32;
        let row = image.row(yy.clamp(0, max_y) as usize);
        for xx in xf + 1 - s..=xf + s {
            let dx = x - xx as f32;
            let d = dx * dx + dy * dy;
            if d >= limit {
                continue;
            }
            let w = table[(d * TABLE_RES as f32) as usize];
            norm += w;
            sum += w * row[xx.clamp(0, max_x) as usize].channel(c) as f32;
        }
    }
    if norm == 0.0 {
        return 0;
    }
    let max = if std::mem::size_of::<P>() / P::CHANNELS == 1 { 255.0 } else { 65535.0 };
    (sum / norm).round().clamp(0.0, max) as u16
}
