use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::image::{Image, Pixel};

/// Area-weighted downsample so the long edge becomes `size`.
///
/// Each source pixel is split between at most two output rows and two output columns
/// in proportion to overlap; incomplete trailing rows and columns are dropped. Asking
/// for a larger long edge fails and leaves the image as it was. Both edges stay at
/// least one pixel long.
pub fn resize<P: Pixel>(image: &mut Image<P>, size: usize) -> Result<()> {
    let div = image.width.max(image.height);
    let mul = size.max(1);
    if mul > div {
        return Err(PipelineError::UpscaleNotSupported { from: div, to: mul });
    }
    if mul == div {
        return Ok(());
    }
    // A short edge that would vanish keeps one line, averaging everything it covers.
    let (h_exact, w_exact) = (image.height * mul / div, image.width * mul / div);
    let (h, w) = (h_exact.max(1), w_exact.max(1));
    debug!("Resizing {}x{} to {}x{}", image.width, image.height, w, h);

    let mul = mul as u64;
    let div = div as u64;
    let coverage = |exact: usize, lines: usize| if exact == 0 { lines as u64 * mul } else { div };
    let norm = coverage(h_exact, image.height) * coverage(w_exact, image.width);
    let mut acc = vec![[0u64; 4]; w * h];
    // Output lines overlapped by source line `i`, with the overlap of each.
    let split = |i: usize, limit: usize| {
        let start = i as u64 * mul;
        let end = start + mul;
        let mut lo = (start / div) as usize;
        let mut hi = (end / div) as usize;
        let (mut lo_w, mut hi_w) = if lo == hi {
            (mul, 0)
        } else {
            (hi as u64 * div - start, end - hi as u64 * div)
        };
        if hi >= limit {
            hi = limit - 1;
            hi_w = 0;
        }
        if lo >= limit {
            lo = limit - 1;
            lo_w = 0;
        }
        (lo, hi, lo_w, hi_w)
    };

    for r in 0..image.height {
        let (ri, rii, riw, riiw) = split(r, h);
        for c in 0..image.width {
            let (ci, cii, ciw, ciiw) = split(c, w);
            let px = image.pixel(c, r);
            for ch in 0..P::CHANNELS.min(4) {
                let v = px.channel(ch) as u64;
                acc[ri * w + ci][ch] += v * riw * ciw;
                acc[ri * w + cii][ch] += v * riw * ciiw;
                acc[rii * w + ci][ch] += v * riiw * ciw;
                acc[rii * w + cii][ch] += v * riiw * ciiw;
            }
        }
    }

    let pixels = acc
        .iter()
        .map(|sum| {
            let mut p = P::default();
            for ch in 0..P::CHANNELS.min(4) {
                p.set_channel(ch, (sum[ch] / norm).min(0xFFFF) as u16);
            }
            p
        })
        .collect();
    *image = Image::from_pixels(w, h, image.colors, pixels);
    Ok(())
}
