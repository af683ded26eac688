//! Hot pixel repair
//!
//! A sample that exceeds all four direct neighbours of its channel by more than
//! `white / (sensitivity + 1)` is a stuck sensor site and takes the brightest
//! neighbour's value.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::image_pipeline::common::parallel::rows_per_chunk;

/// Repairs hot pixels in place and returns how many samples were replaced.
///
/// Border pixels are never touched. Every row is judged against the unmodified input,
/// so a repaired pixel never influences its neighbours' verdict.
pub fn repair(
    pixels: &mut [[u16; 4]],
    width: usize,
    height: usize,
    colors: usize,
    white_level: u32,
    sensitivity: f64,
) -> usize {
    if !(sensitivity > 0.0) || width < 3 || height < 3 {
        return 0;
    }
    debug_assert_eq!(pixels.len(), width * height);
    let delta = (white_level as f64 / (sensitivity + 1.0)) as u32;
    let source = pixels.to_vec();
    let colors = colors.min(4);
    let rows = rows_per_chunk(height);

    let count: usize = pixels
        .par_chunks_mut(rows * width)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let first_row = chunk_idx * rows;
            chunk
                .chunks_mut(width)
                .enumerate()
                .filter(|(i, _)| {
                    let y = first_row + i;
                    y > 0 && y < height - 1
                })
                .map(|(i, row)| repair_row(&source, row, first_row + i, width, colors, delta))
                .sum::<usize>()
        })
        .sum();

    if count > 0 {
        info!("Repaired {} hot pixels", count);
    } else {
        debug!("No hot pixels above threshold {}", delta);
    }
    count
}

fn repair_row(
    source: &[[u16; 4]],
    row: &mut [[u16; 4]],
    y: usize,
    width: usize,
    colors: usize,
    delta: u32,
) -> usize {
    let mut count = 0;
    for x in 1..width - 1 {
        let idx = y * width + x;
        for c in 0..colors {
            let t = source[idx][c] as u32;
            if t <= delta {
                continue;
            }
            let t = t - delta;
            let neighbours = [
                source[idx - 1][c],
                source[idx + 1][c],
                source[idx - width][c],
                source[idx + width][c],
            ];
            if neighbours.iter().any(|&v| v as u32 > t) {
                continue;
            }
            row[x][c] = neighbours.iter().copied().max().unwrap_or(0);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, height: usize, value: u16) -> Vec<[u16; 4]> {
        vec![[value, value, value, value]; width * height]
    }

    #[test]
    fn test_interior_hot_pixel_is_clamped() {
        let mut pixels = grid(5, 5, 0);
        pixels[2 * 5 + 2][0] = 60000;
        pixels[2 * 5 + 1][0] = 100;
        pixels[2 * 5 + 3][0] = 200;
        pixels[5 + 2][0] = 300;
        pixels[3 * 5 + 2][0] = 400;

        let count = repair(&mut pixels, 5, 5, 3, 65535, 1.0);
        assert_eq!(count, 1);
        assert_eq!(pixels[2 * 5 + 2][0], 400);
    }

    #[test]
    fn test_border_is_never_modified() {
        let mut pixels = grid(4, 4, 10);
        pixels[0][1] = 65000;
        pixels[3][2] = 65000;
        pixels[4 * 3 + 1][0] = 65000;
        pixels[4][0] = 65000;
        let before = pixels.clone();

        assert_eq!(repair(&mut pixels, 4, 4, 4, 65535, 10.0), 0);
        assert_eq!(pixels, before);
    }

    #[test]
    fn test_disabled_and_tiny_sensitivity() {
        let mut pixels = grid(3, 3, 0);
        pixels[4][2] = 40000;
        assert_eq!(repair(&mut pixels, 3, 3, 3, 65535, 0.0), 0);
        assert_eq!(repair(&mut pixels, 3, 3, 3, 65535, -2.0), 0);
        assert_eq!(repair(&mut pixels, 3, 3, 3, 65535, 1e-9), 0);
        assert_eq!(pixels[4][2], 40000);
    }

    #[test]
    fn test_unbounded_sensitivity_does_not_panic() {
        let mut pixels = grid(3, 3, 5);
        pixels[4][0] = 9;
        assert_eq!(repair(&mut pixels, 3, 3, 1, 65535, f64::INFINITY), 1);
        assert_eq!(pixels[4][0], 5);
    }

    #[test]
    fn test_adjacent_hot_pixels_use_original_values() {
        let mut pixels = grid(5, 3, 100);
        pixels[5 + 1][0] = 50000;
        pixels[5 + 2][0] = 50000;
        // Each shields the other: neither is brighter than all of its neighbours.
        assert_eq!(repair(&mut pixels, 5, 3, 3, 65535, 1.0), 0);
    }
}
