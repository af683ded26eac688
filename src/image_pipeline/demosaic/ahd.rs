//! Adaptive homogeneity-directed interpolation for three-color Bayer sensors.
//!
//! Greens are estimated once along rows and once along columns, red and blue are
//! filled from color differences against each green estimate, and each pixel takes the
//! candidate whose 3×3 neighbourhood is more homogeneous in luminance and chroma.

use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::common::parallel::for_each_row;
use crate::image_pipeline::demosaic::bilinear::interpolate_generic;
use crate::image_pipeline::raw::FilterPattern;

#[inline]
fn reflect(i: isize, size: usize) -> usize {
    let n = size as isize;
    let i = if i < 0 { -i } else { i };
    let i = if i >= n { 2 * (n - 1) - i } else { i };
    i.clamp(0, n - 1) as usize
}

pub(crate) fn interpolate(image: &mut Image16, pattern: &FilterPattern) {
    let (width, height) = (image.width, image.height);
    if width < 4 || height < 4 {
        interpolate_generic(image, pattern, 3);
        return;
    }
    let mosaic: Vec<i32> = image
        .pixels
        .iter()
        .enumerate()
        .map(|(i, px)| px[pattern.color_at(i / width, i % width)] as i32)
        .collect();
    let sample = |row: isize, col: isize| mosaic[reflect(row, height) * width + reflect(col, width)];

    // Directional greens: 0 along rows, 1 along columns.
    let mut greens = [vec![0i32; width * height], vec![0i32; width * height]];
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let (r, c) = (row as isize, col as isize);
            if pattern.color_at(row, col) == 1 {
                greens[0][idx] = mosaic[idx];
                greens[1][idx] = mosaic[idx];
                continue;
            }
            let x = mosaic[idx];
            for (dir, (dr, dc)) in [(0isize, 1isize), (1, 0)].into_iter().enumerate() {
                let g1 = sample(r - dr, c - dc);
                let g2 = sample(r + dr, c + dc);
                let x1 = sample(r - 2 * dr, c - 2 * dc);
                let x2 = sample(r + 2 * dr, c + 2 * dc);
                let estimate = (g1 + g2) / 2 + (2 * x - x1 - x2) / 4;
                greens[dir][idx] = estimate.clamp(g1.min(g2), g1.max(g2));
            }
        }
    }

    // Full-color candidate per direction.
    let candidates: Vec<Vec<[i32; 3]>> = greens
        .iter()
        .map(|green| {
            (0..width * height)
                .map(|idx| {
                    let (row, col) = (idx / width, idx % width);
                    let own = pattern.color_at(row, col);
                    let mut rgb = [0i32; 3];
                    rgb[1] = green[idx];
                    for color in [0usize, 2] {
                        if color == own {
                            rgb[color] = mosaic[idx];
                            continue;
                        }
                        let mut diff = 0i32;
                        let mut count = 0i32;
                        for dy in -1isize..=1 {
                            for dx in -1isize..=1 {
                                let y = reflect(row as isize + dy, height);
                                let x = reflect(col as isize + dx, width);
                                if pattern.color_at(y, x) == color {
                                    let n = y * width + x;
                                    diff += mosaic[n] - green[n];
                                    count += 1;
                                }
                            }
                        }
                        let diff = if count > 0 { diff / count } else { 0 };
                        rgb[color] = (green[idx] + diff).clamp(0, 0xFFFF);
                    }
                    rgb
                })
                .collect()
        })
        .collect();

    let luma = |p: &[i32; 3]| (p[0] + 2 * p[1] + p[2]) / 4;
    let chroma = |a: &[i32; 3], b: &[i32; 3]| {
        let da = ((a[0] - a[1]) - (b[0] - b[1])) as i64;
        let db = ((a[2] - a[1]) - (b[2] - b[1])) as i64;
        da * da + db * db
    };

    // Homogeneity count per direction and pixel.
    let mut homogeneity = [vec![0u8; width * height], vec![0u8; width * height]];
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            let neighbours = [
                reflect(col as isize - 1, width) + row * width,
                reflect(col as isize + 1, width) + row * width,
                reflect(row as isize - 1, height) * width + col,
                reflect(row as isize + 1, height) * width + col,
            ];
            let mut ldiff = [[0i32; 4]; 2];
            let mut abdiff = [[0i64; 4]; 2];
            for d in 0..2 {
                let center = &candidates[d][idx];
                for (i, &n) in neighbours.iter().enumerate() {
                    ldiff[d][i] = (luma(center) - luma(&candidates[d][n])).abs();
                    abdiff[d][i] = chroma(center, &candidates[d][n]);
                }
            }
            let leps = ldiff[0][0].max(ldiff[0][1]).min(ldiff[1][2].max(ldiff[1][3]));
            let abeps = abdiff[0][0].max(abdiff[0][1]).min(abdiff[1][2].max(abdiff[1][3]));
            for d in 0..2 {
                homogeneity[d][idx] = (0..4)
                    .filter(|&i| ldiff[d][i] <= leps && abdiff[d][i] <= abeps)
                    .count() as u8;
            }
        }
    }

    for_each_row(&mut image.pixels, width, |row, line| {
        for (col, px) in line.iter_mut().enumerate() {
            let mut score = [0u32; 2];
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let n = reflect(row as isize + dy, height) * width
                        + reflect(col as isize + dx, width);
                    score[0] += homogeneity[0][n] as u32;
                    score[1] += homogeneity[1][n] as u32;
                }
            }
            let idx = row * width + col;
            let (h, v) = (&candidates[0][idx], &candidates[1][idx]);
            for c in 0..3 {
                let value = match score[0].cmp(&score[1]) {
                    std::cmp::Ordering::Greater => h[c],
                    std::cmp::Ordering::Less => v[c],
                    std::cmp::Ordering::Equal => (h[c] + v[c]) / 2,
                };
                px[c] = value.clamp(0, 0xFFFF) as u16;
            }
        }
    });
}
