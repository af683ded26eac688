use tracing::debug;

use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::common::parallel::for_each_row;
use crate::image_pipeline::raw::RawFrame;

/// Downsamples the raw cells by an integer `scale` without interpolation.
///
/// Even scales average `scale/2` square blocks of cells; odd scales go back to the
/// mosaic and average each color over `scale`×`scale` sensor pixels. Black is
/// subtracted per color, the fixed-point `gains` applied, and for three-color sensors
/// the two greens are merged into channel 1. Incomplete trailing blocks are dropped.
pub fn shrink(raw: &Image16, frame: &RawFrame, scale: usize, gains: [u32; 4]) -> Image16 {
    let scale = scale.max(1);
    let raw_colors = raw.colors;
    let recombine = frame.colors == 3 && raw_colors == 4;
    let finish = |sums: [i64; 4], px: &mut [u16; 4]| {
        for c in 0..raw_colors {
            let v = (sums[c] - frame.black[c] as i64).max(0);
            px[c] = (v * gains[c] as i64 / 0x10000).min(0xFFFF) as u16;
        }
        if recombine {
            px[1] = ((px[1] as u32 + px[3] as u32) >> 1) as u16;
            px[3] = 0;
        }
    };

    match frame.four_color_filters() {
        Some(f4) if scale % 2 == 1 => {
            let (w, h) = (frame.width / scale, frame.height / scale);
            debug!("Shrinking mosaic by {} to {}x{}", scale, w, h);
            let mut out = Image16::new(w, h, frame.colors);
            for_each_row(&mut out.pixels, w, |r, line| {
                for (c, px) in line.iter_mut().enumerate() {
                    let mut sum = [0i64; 4];
                    let mut count = [0i64; 4];
                    for ri in r * scale..(r + 1) * scale {
                        for ci in c * scale..(c + 1) * scale {
                            let color = f4.color_at(ri, ci);
                            sum[color] += raw.pixel(ci / 2, ri / 2)[color] as i64;
                            count[color] += 1;
                        }
                    }
                    for cl in 0..4 {
                        sum[cl] = if count[cl] > 0 { sum[cl] / count[cl] } else { 0 };
                    }
                    finish(sum, px);
                }
            });
            out
        }
        filters => {
            let s = if filters.is_some() { scale / 2 } else { scale };
            let (w, h) = (raw.width / s, raw.height / s);
            debug!("Shrinking cells by {} to {}x{}", s, w, h);
            let norm = (s * s) as i64;
            let mut out = Image16::new(w, h, frame.colors);
            for_each_row(&mut out.pixels, w, |r, line| {
                for (c, px) in line.iter_mut().enumerate() {
                    let mut sum = [0i64; 4];
                    for ri in r * s..(r + 1) * s {
                        for cell in &raw.row(ri)[c * s..(c + 1) * s] {
                            for cl in 0..raw_colors {
                                sum[cl] += cell[cl] as i64;
                            }
                        }
                    }
                    for v in sum.iter_mut() {
                        *v /= norm;
                    }
                    finish(sum, px);
                }
            });
            out
        }
    }
}
