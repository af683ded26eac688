use tracing::{debug, info};

use crate::image_pipeline::raw::types::RawFrame;

/// Shifts samples, black and white levels left by the largest `k` that keeps the white
/// level within 16 bits, and returns `2^k`.
///
/// A frame that is already at full range is left untouched and yields 1.
pub fn scale_to_full_range(frame: &mut RawFrame) -> u32 {
    let mut max = frame.rgb_max() as u32;
    if max == 0 {
        debug!("White level is zero, skipping range normalization");
        return 1;
    }
    let mut shift = 0u32;
    while (max << 1) <= 0xFFFF {
        max <<= 1;
        shift += 1;
    }
    if shift == 0 {
        return 1;
    }

    let scale = |v: u16| ((v as u32) << shift).min(0xFFFF) as u16;
    for v in frame.data.iter_mut() {
        *v = scale(*v);
    }
    for v in frame.black.iter_mut().chain(frame.white.iter_mut()) {
        *v = scale(*v);
    }
    info!("Raw data normalized to full range, multiplier {}", 1u32 << shift);
    1 << shift
}
