//! Bilinear interpolation
//!
//! Standard 2×2 Bayer layouts go through the `bayer` crate's linear demosaic; anything
//! else (four-color splits, 2×N patterns) uses a weighted average of same-color
//! neighbours in the 3×3 window, orthogonal neighbours counting twice.

use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};
use tracing::debug;

use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::common::parallel::for_each_row;
use crate::image_pipeline::raw::FilterPattern;

pub(crate) fn interpolate(image: &mut Image16, pattern: &FilterPattern, colors: usize) {
    if colors == 3 {
        if let Some(cells) = pattern.bayer_cells() {
            match demosaic_bayer(image, cells) {
                Ok(()) => return,
                Err(e) => debug!("bayer demosaic unavailable ({}), using neighbour average", e),
            }
        }
    }
    interpolate_generic(image, pattern, colors);
}

/// Same-color neighbour averaging; the sample a pixel already has is kept.
pub(crate) fn interpolate_generic(image: &mut Image16, pattern: &FilterPattern, colors: usize) {
    let (width, height) = (image.width, image.height);
    let source = image.pixels.clone();
    for_each_row(&mut image.pixels, width, |row, line| {
        for (col, px) in line.iter_mut().enumerate() {
            let own = pattern.color_at(row, col);
            let mut sum = [0u32; 4];
            let mut weight = [0u32; 4];
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let (y, x) = (row as isize + dy, col as isize + dx);
                    if (dy == 0 && dx == 0) || y < 0 || x < 0 {
                        continue;
                    }
                    let (y, x) = (y as usize, x as usize);
                    if y >= height || x >= width {
                        continue;
                    }
                    let color = pattern.color_at(y, x);
                    if color == own || color >= colors {
                        continue;
                    }
                    let w = if dy == 0 || dx == 0 { 2 } else { 1 };
                    sum[color] += w * source[y * width + x][color] as u32;
                    weight[color] += w;
                }
            }
            for c in 0..colors {
                if c != own && weight[c] > 0 {
                    px[c] = (sum[c] / weight[c]) as u16;
                }
            }
        }
    });
}

fn demosaic_bayer(image: &mut Image16, cells: [u8; 4]) -> Result<(), String> {
    let cfa = match cells {
        [0, 1, 1, 2] => CFA::RGGB,
        [2, 1, 1, 0] => CFA::BGGR,
        [1, 0, 2, 1] => CFA::GRBG,
        [1, 2, 0, 1] => CFA::GBRG,
        other => return Err(format!("no CFA for {:?}", other)),
    };
    let (width, height) = (image.width, image.height);
    if width < 2 || height < 2 {
        return Err(format!("{}x{} is too small", width, height));
    }

    let mosaic: Vec<u8> = image
        .pixels
        .iter()
        .enumerate()
        .flat_map(|(i, px)| {
            let (row, col) = (i / width, i % width);
            px[cells[(row % 2) * 2 + col % 2] as usize].to_le_bytes()
        })
        .collect();

    let mut rgb = vec![0u8; width * height * 3 * 2];
    {
        let mut raster = RasterMut::new(width, height, RasterDepth::Depth16, &mut rgb);
        bayer::run_demosaic(
            &mut Cursor::new(&mosaic[..]),
            BayerDepth::Depth16LE,
            cfa,
            Demosaic::Linear,
            &mut raster,
        )
        .map_err(|e| format!("{:?}", e))?;
    }

    for (px, bytes) in image.pixels.iter_mut().zip(rgb.chunks_exact(6)) {
        px[0] = u16::from_ne_bytes([bytes[0], bytes[1]]);
        px[1] = u16::from_ne_bytes([bytes[2], bytes[3]]);
        px[2] = u16::from_ne_bytes([bytes[4], bytes[5]]);
    }
    Ok(())
}
