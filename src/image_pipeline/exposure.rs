//! Automatic exposure, black point and tone curve from the white-balanced raw histogram.
//!
//! All searches develop single gray levels through a `Developer` in auto mode, so the
//! results are expressed in the tone curve's input domain.

use tracing::{debug, info, warn};

use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::develop::{CurvePoint, Developer, DeveloperMode, ToneCurve};

/// Fraction of full scale the auto-exposed gray level should reach.
const EXPOSURE_TARGET: u32 = 0x10000 * 99 / 100;
const CURVE_STEPS: usize = 8;
const CURVE_DECAY: f64 = 0.9;

/// Histogram of black-subtracted raw samples scaled by the white balance multipliers
/// relative to the strongest one. Rebuilt only when the multipliers change.
#[derive(Debug, Clone)]
pub struct RawHistogram {
    rgb_max: u32,
    chan_mul: [u32; 4],
    bins: Vec<u32>,
    count: u64,
}

impl RawHistogram {
    pub fn new(rgb_max: u32) -> Self {
        Self { rgb_max, chan_mul: [0; 4], bins: Vec::new(), count: 0 }
    }

    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Number of samples counted, over all channels.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rebuilds the histogram if `chan_mul` differs from the multipliers it was built
    /// with. Returns whether it was rebuilt.
    pub fn update(&mut self, raw: &Image16, black: &[u16; 4], colors: usize, chan_mul: &[f64; 4]) -> bool {
        let max_chan = chan_mul.iter().take(colors).copied().fold(0.0, f64::max);
        let mut fixed = [0u32; 4];
        for c in 0..colors {
            fixed[c] = if max_chan > 0.0 { (chan_mul[c] / max_chan * 65536.0).floor() as u32 } else { 0x10000 };
        }
        if colors == 3 {
            fixed[3] = fixed[1];
        }
        if !self.bins.is_empty() && fixed == self.chan_mul {
            return false;
        }
        self.chan_mul = fixed;
        self.bins = vec![0; self.rgb_max as usize + 1];
        for px in &raw.pixels {
            for c in 0..raw.colors {
                let v = px[c].saturating_sub(black[c]) as u64 * fixed[c] as u64 / 0x10000;
                self.bins[v.min(self.rgb_max as u64) as usize] += 1;
            }
        }
        self.count = (raw.pixels.len() * raw.colors) as u64;
        debug!(samples = self.count, "Rebuilt raw histogram");
        true
    }
}

/// Auto searches over a histogram and an auto-mode developer prepared with the current
/// configuration.
pub struct AutoAdjust<'a> {
    pub histogram: &'a RawHistogram,
    pub developer: &'a Developer,
    pub chan_mul: [f64; 4],
    pub colors: usize,
    pub rgb_max: u32,
}

impl AutoAdjust<'_> {
    /// Brightest developed channel of a gray raw level.
    fn develop_level(&self, level: u32) -> u32 {
        debug_assert_eq!(self.developer.mode(), DeveloperMode::Auto);
        let max_chan = self.chan_mul.iter().take(self.colors).copied().fold(0.0, f64::max);
        let mut px = [0u16; 4];
        for c in 0..self.colors {
            let v = level as f64 * max_chan / self.chan_mul[c];
            px[c] = v.min(self.rgb_max as f64) as u16;
        }
        let rgb = self.developer.develop_pixel(&px, 1.0);
        rgb.into_iter().map(u32::from).max().unwrap_or(0)
    }

    /// Exposure in EV putting the 99th percentile of the histogram at 99% of full scale.
    /// The developer must have been prepared with zero exposure.
    pub fn exposure(&self) -> f64 {
        let (mut lo, mut hi) = (0u32, self.rgb_max);
        while lo + 1 < hi {
            let p = (lo + hi) / 2;
            if self.develop_level(p) < EXPOSURE_TARGET {
                lo = p;
            } else {
                hi = p;
            }
        }
        let p = lo.max(1);

        let stop = self.histogram.count() / 100;
        let bins = self.histogram.bins();
        let mut sum = 0u64;
        let mut wp = self.rgb_max as usize;
        while wp > 1 && sum < stop {
            sum += bins.get(wp).copied().unwrap_or(0) as u64;
            wp -= 1;
        }
        let exposure = (p as f64 / wp as f64).log2();
        info!("Auto exposure {:+.2} EV (white point {}/{})", exposure, wp, p);
        exposure
    }

    /// Advances from `start` until the running `sum` reaches `stop`.
    fn percentile_level(&self, stop: u64, start: usize, sum: &mut u64) -> usize {
        let bins = self.histogram.bins();
        let mut level = start;
        while level < self.rgb_max as usize && *sum < stop {
            *sum += bins.get(level).copied().unwrap_or(0) as u64;
            level += 1;
        }
        level
    }

    /// Black point as a tone curve x coordinate: the developed level below which 1/1024
    /// of the samples lie.
    pub fn black_point(&self) -> f64 {
        let mut sum = 0;
        let bp = self.percentile_level(self.histogram.count() / 1024, 0, &mut sum);
        let x = self.develop_level(bp as u32) as f64 / 65536.0;
        info!("Auto black point {:.4} (raw level {})", x, bp);
        x
    }

    /// Tone curve spreading the histogram over `CURVE_STEPS` output levels with
    /// geometrically decaying weights, starting at the black point.
    pub fn curve(&self) -> ToneCurve {
        let count = self.histogram.count() as f64;
        let norm = (1.0 - CURVE_DECAY.powi(CURVE_STEPS as i32)) / (1.0 - CURVE_DECAY);
        let mut stop = self.histogram.count() / 1024;
        let mut sum = 0u64;
        let mut bp = 0usize;
        let mut p = 0u32;
        let mut anchors: Vec<CurvePoint> = Vec::with_capacity(CURVE_STEPS + 1);
        let mut i = 0;
        while i < CURVE_STEPS && bp < self.rgb_max as usize && p < 0xFFFF {
            bp = self.percentile_level(stop, bp, &mut sum);
            p = self.develop_level(bp as u32);
            stop += (count * CURVE_DECAY.powi(i as i32) / norm) as u64;
            let j = anchors.len();
            // Slope above 4 relative to the previous anchor.
            let too_steep = anchors.last().is_some_and(|prev| {
                (p as f64 - prev.x * 65536.0) < ((i + 1 - j) * 0x4000 / CURVE_STEPS) as f64
            });
            if !too_steep {
                anchors.push(CurvePoint::new(p as f64 / 65536.0, i as f64 / CURVE_STEPS as f64));
            }
            i += 1;
        }

        let reaches_top = anchors.last().is_some_and(|a| a.x >= 1.0);
        if !reaches_top {
            let y = match anchors.as_slice() {
                [.., a, b] => (b.y + 2.0 * (1.0 - b.x) * (b.y - a.y) / (b.x - a.x)).min(1.0),
                _ => 1.0,
            };
            anchors.push(CurvePoint::new(1.0, y));
        }
        match ToneCurve::new(anchors) {
            Ok(curve) => {
                info!("Auto curve with {} anchors", curve.anchors().len());
                curve
            }
            Err(e) => {
                warn!("Auto curve failed: {}", e);
                ToneCurve::default()
            }
        }
    }
}
