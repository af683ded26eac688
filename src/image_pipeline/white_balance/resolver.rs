use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::presets::PresetTable;
use super::temperature::{rgb_to_temperature, temperature_to_rgb};
use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::common::matrix::cam_rgb_from_rgb_cam;
use crate::image_pipeline::demosaic::WB_UNITY;
use crate::image_pipeline::geometry::CropRect;
use crate::image_pipeline::raw::RawFrame;

/// Samples this close to the white level are treated as clipped by auto white balance.
const CLIP_MARGIN: u32 = 25;

/// How the channel multipliers are chosen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "value")]
pub enum WhiteBalanceMode {
    /// From temperature and green.
    #[default]
    Manual,
    /// Neutral patch, in sensor coordinates.
    Spot(CropRect),
    Auto,
    Camera,
    /// Maker preset by name, fine-tuned by `WbParams::tuning`.
    Preset(String),
}

impl WhiteBalanceMode {
    pub fn name(&self) -> &str {
        match self {
            WhiteBalanceMode::Manual => "manual",
            WhiteBalanceMode::Spot(_) => "spot",
            WhiteBalanceMode::Auto => "auto",
            WhiteBalanceMode::Camera => "camera",
            WhiteBalanceMode::Preset(name) => name,
        }
    }
}

/// User-facing white balance parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WbParams {
    pub temperature: f64,
    pub green: f64,
    pub tuning: i32,
}

impl Default for WbParams {
    fn default() -> Self {
        Self { temperature: 6500.0, green: 1.0, tuning: 0 }
    }
}

/// Everything besides the mode the resolver reads.
pub struct WbInputs<'a> {
    pub frame: &'a RawFrame,
    /// Raw phase cells, used by spot and auto.
    pub raw: &'a Image16,
    pub presets: &'a PresetTable,
    pub use_matrix: bool,
}

/// Channel multipliers (smallest is 1) plus the temperature/green they correspond to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWb {
    pub chan_mul: [f64; 4],
    pub temperature: f64,
    pub green: f64,
    pub tuning: i32,
}

impl ResolvedWb {
    /// 16.16 gains for the interpolation pass, scaled so the largest is unity.
    pub fn finalize_gains(&self, colors: usize) -> [u32; 4] {
        let max = self.chan_mul.iter().take(colors).copied().fold(0.0, f64::max);
        let mut gains = [WB_UNITY; 4];
        if max > 0.0 {
            for c in 0..colors {
                gains[c] = ((self.chan_mul[c] / max) * WB_UNITY as f64).round().max(1.0) as u32;
            }
        }
        if colors == 3 {
            gains[3] = gains[1];
        }
        gains
    }
}

/// Result of `resolve_with_fallback`: the mode that actually applied and the warning
/// raised when it differs from the requested one.
#[derive(Debug, Clone)]
pub struct WbOutcome {
    pub resolved: ResolvedWb,
    pub mode: WhiteBalanceMode,
    pub warning: Option<String>,
}

/// Computes channel multipliers for `mode`.
#[instrument(skip(params, inputs), fields(mode = mode.name()))]
pub fn resolve(mode: &WhiteBalanceMode, params: &WbParams, inputs: &WbInputs) -> Result<ResolvedWb> {
    let frame = inputs.frame;
    let colors = frame.colors;
    let mut tuning = 0;
    let mut chan_mul = match mode {
        WhiteBalanceMode::Manual => manual_multipliers(params, inputs),
        WhiteBalanceMode::Spot(rect) => spot_multipliers(rect, inputs),
        WhiteBalanceMode::Auto => auto_multipliers(inputs),
        WhiteBalanceMode::Camera => {
            let cam = frame.cam_mul.ok_or(PipelineError::NoCameraWb)?;
            cam.map(f64::from)
        }
        WhiteBalanceMode::Preset(name) => {
            let (channel, used) = inputs.presets.lookup(&frame.make, &frame.model, name, params.tuning)?;
            if used != params.tuning {
                debug!("Preset tuning {} clamped to {}", params.tuning, used);
            }
            tuning = used;
            channel
        }
    };
    normalize(&mut chan_mul, colors);

    let (temperature, green) = match mode {
        WhiteBalanceMode::Manual => (params.temperature, params.green),
        _ => rgb_to_temperature(multipliers_to_rgb(&chan_mul, inputs)),
    };
    debug!(
        "White balance {}: {:?}, {:.0}K green {:.3}",
        mode.name(),
        chan_mul,
        temperature,
        green
    );
    Ok(ResolvedWb { chan_mul, temperature, green, tuning })
}

/// `resolve` with the documented single retry: camera falls back to auto, an unknown
/// preset falls back to manual.
pub fn resolve_with_fallback(
    mode: &WhiteBalanceMode,
    params: &WbParams,
    inputs: &WbInputs,
) -> Result<WbOutcome> {
    let (fallback, message) = match resolve(mode, params, inputs) {
        Ok(resolved) => return Ok(WbOutcome { resolved, mode: mode.clone(), warning: None }),
        Err(PipelineError::NoCameraWb) => (
            WhiteBalanceMode::Auto,
            "Cannot use camera white balance, reverting to auto white balance.".to_string(),
        ),
        Err(e @ PipelineError::PresetNotFound { .. }) => {
            (WhiteBalanceMode::Manual, format!("{}, using manual white balance.", e))
        }
        Err(e) => return Err(e),
    };
    warn!("{}", message);
    let resolved = resolve(&fallback, params, inputs)?;
    Ok(WbOutcome { resolved, mode: fallback, warning: Some(message) })
}

/// Scales so the smallest used multiplier is 1. Non-positive values count as 1.
fn normalize(chan_mul: &mut [f64; 4], colors: usize) {
    for v in chan_mul.iter_mut().take(colors) {
        if !v.is_finite() || *v <= 0.0 {
            *v = 1.0;
        }
    }
    let min = chan_mul.iter().take(colors).copied().fold(f64::MAX, f64::min);
    for v in chan_mul.iter_mut().take(colors) {
        *v /= min;
    }
    if colors == 3 {
        chan_mul[3] = chan_mul[1];
    }
}

fn manual_multipliers(params: &WbParams, inputs: &WbInputs) -> [f64; 4] {
    let frame = inputs.frame;
    let mut rgb = temperature_to_rgb(params.temperature);
    if params.green > 0.0 {
        rgb[1] /= params.green;
    }
    let pre_mul = frame.pre_mul.map(f64::from);
    let mut chan_mul = [1.0; 4];
    if inputs.use_matrix {
        let cam_rgb = cam_rgb_from_rgb_cam(&frame.rgb_cam, frame.colors);
        for c in 0..frame.colors {
            let sum: f64 = (0..3).map(|k| cam_rgb[c][k] * rgb[k]).sum::<f64>() / pre_mul[c];
            chan_mul[c] = if sum > 0.0 { 1.0 / sum } else { 1.0 };
        }
    } else {
        for c in 0..frame.colors {
            let k = if c == 3 { 1 } else { c };
            chan_mul[c] = pre_mul[c] / rgb[k];
        }
    }
    chan_mul
}

/// Linear RGB of a neutral surface once `chan_mul` has been applied.
fn multipliers_to_rgb(chan_mul: &[f64; 4], inputs: &WbInputs) -> [f64; 3] {
    let frame = inputs.frame;
    let pre_mul = frame.pre_mul.map(f64::from);
    let mut rgb = [0.0; 3];
    for (c, v) in rgb.iter_mut().enumerate() {
        *v = if inputs.use_matrix {
            (0..frame.colors)
                .map(|k| frame.rgb_cam[c][k] as f64 * pre_mul[k] / chan_mul[k])
                .sum()
        } else {
            pre_mul[c] / chan_mul[c]
        };
    }
    rgb.map(|v| v.max(1e-9))
}

/// Per-channel sums of black-subtracted raw cells in `rect` (raw cell coordinates).
/// Second greens of three-color mosaics are averaged into channel 1.
fn channel_sums<F>(inputs: &WbInputs, rect: CropRect, mut accept: F) -> [f64; 4]
where
    F: FnMut(&[u16; 4]) -> bool,
{
    let frame = inputs.frame;
    let raw = inputs.raw;
    let mut sums = [0.0; 4];
    for row in rect.top..rect.bottom.min(raw.height) {
        for cell in &raw.row(row)[rect.left.min(raw.width)..rect.right.min(raw.width)] {
            if !accept(cell) {
                continue;
            }
            for c in 0..raw.colors {
                sums[c] += cell[c].saturating_sub(frame.black[c]) as f64;
            }
        }
    }
    if frame.filters.is_some() && frame.colors == 3 {
        sums[1] = (sums[1] + sums[3]) / 2.0;
        sums[3] = sums[1];
    }
    sums
}

fn reciprocal(sums: [f64; 4]) -> [f64; 4] {
    sums.map(|s| if s > 0.0 { 1.0 / s } else { 1.0 })
}

fn spot_multipliers(rect: &CropRect, inputs: &WbInputs) -> [f64; 4] {
    let frame = inputs.frame;
    let rect = rect.normalized(frame.width, frame.height);
    let cells = if frame.filters.is_some() {
        CropRect::new(rect.left / 2, rect.top / 2, rect.right.div_ceil(2), rect.bottom.div_ceil(2))
    } else {
        rect
    };
    reciprocal(channel_sums(inputs, cells, |_| true))
}

fn auto_multipliers(inputs: &WbInputs) -> [f64; 4] {
    let frame = inputs.frame;
    let raw = inputs.raw;
    let colors = raw.colors;
    let limit: [u32; 4] = std::array::from_fn(|c| (frame.white[c] as u32).saturating_sub(CLIP_MARGIN));
    let full = CropRect::full(raw.width, raw.height);
    let sums = channel_sums(inputs, full, |cell| {
        (0..colors).all(|c| (cell[c] as u32) <= limit[c])
    });
    reciprocal(sums)
}
