use serde::{Deserialize, Serialize};
use tracing::debug;

use super::curve::{BaseCurve, LUT_SIZE, ToneCurve};
use crate::image_pipeline::common::image::{Image, Image16, Pixel};
use crate::image_pipeline::common::parallel::for_each_row;

/// What happens to colors pushed past full scale by white balance or exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightMode {
    /// Each channel is clipped on its own.
    #[default]
    Clip,
    /// Film-like shoulder on the brightest channel, preserving the channel ratios.
    Restore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeveloperMode {
    Full,
    /// Stops after the highlight stage. Used by the auto exposure/black/curve searches,
    /// whose results are tone curve inputs.
    Auto,
}

/// Inputs of `Developer::new`, already resolved from the configuration.
#[derive(Debug, Clone)]
pub struct DevelopParams {
    pub colors: usize,
    /// White balance multipliers, smallest is 1.
    pub chan_mul: [f64; 4],
    /// Sensor to output RGB.
    pub rgb_cam: [[f32; 4]; 3],
    /// Largest black-subtracted raw value.
    pub rgb_max: u32,
    pub exposure: f64,
    pub highlights: HighlightMode,
    pub curve: ToneCurve,
    pub saturation: f64,
    pub base_curve: BaseCurve,
}

/// Start of the highlight shoulder, as a fraction of full scale.
const SHOULDER_KNEE: f32 = 0.8;

/// Precomputed per-pixel transform from linear sensor values to output RGB.
pub struct Developer {
    mode: DeveloperMode,
    colors: usize,
    wb: [f32; 4],
    clip: f32,
    matrix: [[f32; 4]; 3],
    highlights: HighlightMode,
    tone_lut: Vec<u16>,
    saturation: f32,
    base_lut: Vec<u16>,
}

impl Developer {
    pub fn new(params: &DevelopParams, mode: DeveloperMode) -> Self {
        let rgb_max = params.rgb_max.max(1) as f32;
        let exposure = (2f64.powf(params.exposure) * 65535.0 / rgb_max as f64) as f32;
        let mut matrix = params.rgb_cam;
        for row in matrix.iter_mut() {
            for v in row.iter_mut() {
                *v *= exposure;
            }
        }
        let (tone_lut, base_lut) = match mode {
            DeveloperMode::Full => (params.curve.lut(), params.base_curve.lut()),
            DeveloperMode::Auto => (Vec::new(), Vec::new()),
        };
        debug!(
            ?mode,
            exposure = params.exposure,
            saturation = params.saturation,
            "Prepared developer"
        );
        Self {
            mode,
            colors: params.colors,
            wb: params.chan_mul.map(|v| v as f32),
            clip: rgb_max,
            matrix,
            highlights: params.highlights,
            tone_lut,
            saturation: params.saturation as f32,
            base_lut,
        }
    }

    pub fn mode(&self) -> DeveloperMode {
        self.mode
    }

    /// Develops one pixel to 16-bit RGB. `gain` is an extra per-pixel factor applied
    /// with white balance (vignetting correction).
    #[inline]
    pub fn develop_pixel(&self, px: &[u16; 4], gain: f32) -> [u16; 3] {
        let mut balanced = [0.0f32; 4];
        for c in 0..self.colors {
            balanced[c] = (px[c] as f32 * self.wb[c] * gain).min(self.clip);
        }
        let mut rgb = [0.0f32; 3];
        for (i, v) in rgb.iter_mut().enumerate() {
            *v = (0..self.colors).map(|c| self.matrix[i][c] * balanced[c]).sum::<f32>().max(0.0);
        }
        let rgb = self.apply_highlights(rgb);
        if self.mode == DeveloperMode::Auto {
            return rgb;
        }
        let toned = rgb.map(|v| self.tone_lut[v as usize]);
        let saturated = self.apply_saturation(toned);
        saturated.map(|v| self.base_lut[v as usize])
    }

    #[inline]
    fn apply_highlights(&self, rgb: [f32; 3]) -> [u16; 3] {
        let full = (LUT_SIZE - 1) as f32;
        match self.highlights {
            HighlightMode::Clip => rgb.map(|v| v.min(full) as u16),
            HighlightMode::Restore => {
                let max = rgb[0].max(rgb[1]).max(rgb[2]) / full;
                if max <= SHOULDER_KNEE {
                    return rgb.map(|v| v as u16);
                }
                let over = max - SHOULDER_KNEE;
                let room = 1.0 - SHOULDER_KNEE;
                let compressed = SHOULDER_KNEE + room * over / (over + room);
                let scale = compressed / max;
                rgb.map(|v| (v * scale).min(full) as u16)
            }
        }
    }

    #[inline]
    fn apply_saturation(&self, rgb: [u16; 3]) -> [u16; 3] {
        if self.saturation == 1.0 {
            return rgb;
        }
        let [r, g, b] = rgb.map(|v| v as f32);
        let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        [r, g, b].map(|v| (luma + self.saturation * (v - luma)).clamp(0.0, 65535.0) as u16)
    }

    /// Develops a row into 8- or 16-bit pixels; 8-bit output keeps the high byte.
    pub fn develop_row<P: Pixel>(&self, src: &[[u16; 4]], gains: Option<&[f32]>, dst: &mut [P]) {
        let shift = if std::mem::size_of::<P>() / P::CHANNELS == 1 { 8 } else { 0 };
        for (i, (px, out)) in src.iter().zip(dst.iter_mut()).enumerate() {
            let gain = gains.map_or(1.0, |g| g[i]);
            let rgb = self.develop_pixel(px, gain);
            for (c, v) in rgb.into_iter().enumerate() {
                out.set_channel(c, v >> shift);
            }
        }
    }

    /// Develops a whole image, rows in parallel.
    pub fn develop_image<P: Pixel>(&self, src: &Image16) -> Image<P> {
        let mut out = Image::<P>::new(src.width, src.height, 3);
        for_each_row(&mut out.pixels, src.width, |y, row| {
            self.develop_row(src.row(y), None, row)
        });
        out
    }
}
