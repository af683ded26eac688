//! Wavelet denoising
//!
//! Each channel is taken to a square-root (variance stabilized) domain, split into five
//! à trous levels with the hat filter, and every detail level is soft-thresholded by a
//! level-specific fraction of the user threshold.

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::common::image::Image16;

/// Expected noise of each wavelet level relative to the finest one.
const LEVEL_NOISE: [f32; 5] = [0.8002, 0.2735, 0.1202, 0.0585, 0.0291];

/// Denoises every channel of the raw cells in place. A non-positive threshold is a no-op.
pub fn wavelet_denoise(image: &mut Image16, threshold: f32) {
    if !(threshold > 0.0) || image.is_empty() {
        return;
    }
    let (width, height) = (image.width, image.height);
    let colors = image.colors.min(4);
    debug!("Wavelet denoise {}x{} x{} threshold {}", width, height, colors, threshold);

    let planes: Vec<Vec<f32>> = (0..colors)
        .into_par_iter()
        .map(|c| {
            let mut plane: Vec<f32> = image
                .pixels
                .iter()
                .map(|p| 256.0 * (p[c] as f32).sqrt())
                .collect();
            denoise_plane(&mut plane, width, height, threshold);
            plane
        })
        .collect();

    for (c, plane) in planes.iter().enumerate() {
        for (px, &v) in image.pixels.iter_mut().zip(plane) {
            px[c] = (v * v / 65536.0).clamp(0.0, 65535.0) as u16;
        }
    }
}

fn denoise_plane(plane: &mut [f32], width: usize, height: usize, threshold: f32) {
    let size = width * height;
    let mut low = plane.to_vec();
    let mut high = plane.to_vec();
    let mut accumulated = vec![0.0f32; size];
    let mut temp = vec![0.0f32; width.max(height)];

    for (lev, noise) in LEVEL_NOISE.iter().enumerate() {
        let sc = 1usize << lev;
        // `high` holds the previous approximation, `low` the next one.
        low.copy_from_slice(&high);
        for row in 0..height {
            let line = &low[row * width..(row + 1) * width];
            hat_transform(&mut temp[..width], |i| line[i], width, sc);
            for (col, &t) in temp[..width].iter().enumerate() {
                low[row * width + col] = t * 0.25;
            }
        }
        for col in 0..width {
            {
                let low_ref = &low;
                hat_transform(&mut temp[..height], |i| low_ref[i * width + col], height, sc);
            }
            for (row, &t) in temp[..height].iter().enumerate() {
                low[row * width + col] = t * 0.25;
            }
        }

        let thold = threshold * noise;
        for i in 0..size {
            let detail = high[i] - low[i];
            let shrunk = if detail < -thold {
                detail + thold
            } else if detail > thold {
                detail - thold
            } else {
                0.0
            };
            accumulated[i] += shrunk;
        }
        high.copy_from_slice(&low);
    }

    for i in 0..size {
        plane[i] = accumulated[i] + low[i];
    }
}

/// One pass of the `[1 2 1]` hat filter with holes of `sc` samples, mirrored at the ends.
fn hat_transform(temp: &mut [f32], base: impl Fn(usize) -> f32, size: usize, sc: usize) {
    for (i, t) in temp.iter_mut().enumerate().take(size) {
        let before = mirror(i as isize - sc as isize, size);
        let after = mirror((i + sc) as isize, size);
        *t = 2.0 * base(i) + base(before) + base(after);
    }
}

#[inline]
fn mirror(i: isize, size: usize) -> usize {
    let n = size as isize;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut m = i.rem_euclid(period);
    if m >= n {
        m = period - m;
    }
    m as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_indexing() {
        assert_eq!(mirror(-1, 5), 1);
        assert_eq!(mirror(5, 5), 3);
        assert_eq!(mirror(-9, 3), 1);
        assert_eq!(mirror(17, 1), 0);
        assert_eq!(mirror(2, 5), 2);
    }

    #[test]
    fn test_zero_threshold_is_noop() {
        let mut image = Image16::from_pixels(3, 1, 3, vec![[1, 2, 3, 4]; 3]);
        let before = image.clone();
        wavelet_denoise(&mut image, 0.0);
        assert_eq!(image, before);
    }

    #[test]
    fn test_flat_image_is_preserved() {
        let mut image = Image16::from_pixels(16, 12, 4, vec![[1000, 4000, 9000, 16]; 192]);
        wavelet_denoise(&mut image, 500.0);
        for p in &image.pixels {
            assert!((p[0] as i32 - 1000).abs() <= 2, "{:?}", p);
            assert!((p[2] as i32 - 9000).abs() <= 2, "{:?}", p);
        }
    }

    #[test]
    fn test_noise_is_reduced() {
        let pixels: Vec<[u16; 4]> = (0..32 * 32)
            .map(|i| {
                let v = if (i * 7919) % 5 < 2 { 2200 } else { 1800 };
                [v, v, v, v]
            })
            .collect();
        let mut image = Image16::from_pixels(32, 32, 3, pixels);
        let spread = |img: &Image16| {
            let max = img.pixels.iter().map(|p| p[0]).max().unwrap_or(0) as i32;
            let min = img.pixels.iter().map(|p| p[0]).min().unwrap_or(0) as i32;
            max - min
        };
        let before = spread(&image);
        wavelet_denoise(&mut image, 2000.0);
        assert!(spread(&image) < before);
        // Channel 3 is outside the image's colors and untouched.
        assert!(image.pixels.iter().all(|p| p[3] == 1800 || p[3] == 2200));
    }

    #[test]
    fn test_tiny_image_does_not_panic() {
        let mut image = Image16::from_pixels(1, 2, 3, vec![[100, 200, 300, 0], [50, 60, 70, 0]]);
        wavelet_denoise(&mut image, 100.0);
        assert_eq!(image.width, 1);
    }
}
