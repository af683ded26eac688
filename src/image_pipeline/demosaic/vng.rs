use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::common::parallel::for_each_row;
use crate::image_pipeline::demosaic::bilinear::interpolate_generic;
use crate::image_pipeline::raw::FilterPattern;

const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Variable number of gradients.
///
/// Starts from the neighbour average, then for every pixel two pixels away from the
/// border measures eight directional gradients, keeps the directions below
/// `min + max/2` and rebuilds each missing color from the own sample plus the mean
/// color difference along the kept directions.
pub(crate) fn interpolate(image: &mut Image16, pattern: &FilterPattern, colors: usize) {
    interpolate_generic(image, pattern, colors);
    let (width, height) = (image.width, image.height);
    if width < 5 || height < 5 {
        return;
    }
    let source = image.pixels.clone();
    let at = |idx: usize, dy: isize, dx: isize| {
        (idx as isize + dy * width as isize + dx) as usize
    };

    for_each_row(&mut image.pixels, width, |row, line| {
        if row < 2 || row >= height - 2 {
            return;
        }
        for col in 2..width - 2 {
            let idx = row * width + col;
            let own = pattern.color_at(row, col);
            let center = &source[idx];

            let mut gradients = [0u32; 8];
            for (g, &(dy, dx)) in gradients.iter_mut().zip(DIRECTIONS.iter()) {
                let near = &source[at(idx, dy, dx)];
                let far = &source[at(idx, 2 * dy, 2 * dx)];
                *g = (0..colors)
                    .map(|c| (near[c] as i32 - center[c] as i32).unsigned_abs())
                    .sum::<u32>()
                    + (far[own] as i32 - center[own] as i32).unsigned_abs();
            }
            let gmin = gradients.iter().copied().min().unwrap_or(0);
            let gmax = gradients.iter().copied().max().unwrap_or(0);
            let threshold = gmin + gmax / 2;

            let mut sum = [0i64; 4];
            let mut num = 0i64;
            for (&g, &(dy, dx)) in gradients.iter().zip(DIRECTIONS.iter()) {
                if g > threshold {
                    continue;
                }
                let near = &source[at(idx, dy, dx)];
                for c in 0..colors {
                    sum[c] += near[c] as i64;
                }
                num += 1;
            }
            if num == 0 {
                continue;
            }
            let px = &mut line[col];
            for c in 0..colors {
                if c != own {
                    let v = center[own] as i64 + (sum[c] - sum[own]) / num;
                    px[c] = v.clamp(0, 0xFFFF) as u16;
                }
            }
        }
    });
}
