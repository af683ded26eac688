use crate::image_pipeline::common::matrix::XYZ_TO_SRGB;

pub const MIN_TEMPERATURE: f64 = 2000.0;
pub const MAX_TEMPERATURE: f64 = 23000.0;
const MIN_GREEN: f64 = 0.2;
const MAX_GREEN: f64 = 2.5;

/// Chromaticity of a black body at `t` kelvin, using the Kim et al. cubic fit to the
/// Planckian locus (valid from 1667 K to 25000 K).
fn planckian_xy(t: f64) -> (f64, f64) {
    let t = t.clamp(1667.0, 25000.0);
    let (t2, t3) = (t * t, t * t * t);
    let x = if t <= 4000.0 {
        -0.2661239e9 / t3 - 0.2343589e6 / t2 + 0.8776956e3 / t + 0.179910
    } else {
        -3.0258469e9 / t3 + 2.1070379e6 / t2 + 0.2226347e3 / t + 0.240390
    };
    let (x2, x3) = (x * x, x * x * x);
    let y = if t <= 2222.0 {
        -1.1063814 * x3 - 1.34811020 * x2 + 2.18555832 * x - 0.20219683
    } else if t <= 4000.0 {
        -0.9549476 * x3 - 1.37418593 * x2 + 2.09137015 * x - 0.16748867
    } else {
        3.0817580 * x3 - 5.87338670 * x2 + 3.75112997 * x - 0.37001483
    };
    (x, y)
}

/// Linear sRGB color of a black body at `temperature` kelvin, scaled so the largest
/// channel is 1.
pub fn temperature_to_rgb(temperature: f64) -> [f64; 3] {
    let (x, y) = planckian_xy(temperature);
    let xyz = [x / y, 1.0, (1.0 - x - y) / y];
    let mut rgb = [0.0; 3];
    for (c, v) in rgb.iter_mut().enumerate() {
        *v = (0..3).map(|k| XYZ_TO_SRGB[c][k] * xyz[k]).sum::<f64>().max(1e-6);
    }
    let max = rgb.iter().copied().fold(f64::MIN, f64::max);
    rgb.map(|v| v / max)
}

/// Temperature whose blue/red ratio matches `rgb`, plus the green factor needed to
/// reach `rgb`'s green, clamped to `[0.2, 2.5]`.
pub fn rgb_to_temperature(rgb: [f64; 3]) -> (f64, f64) {
    let (mut tmin, mut tmax) = (MIN_TEMPERATURE, MAX_TEMPERATURE);
    let target = rgb[2] / rgb[0];
    let mut t = (tmin + tmax) / 2.0;
    let mut test = temperature_to_rgb(t);
    while tmax - tmin > 0.1 {
        test = temperature_to_rgb(t);
        if test[2] / test[0] > target {
            tmax = t;
        } else {
            tmin = t;
        }
        t = (tmin + tmax) / 2.0;
    }
    let green = (test[1] / test[0]) / (rgb[1] / rgb[0]);
    let green = if green.is_finite() { green.clamp(MIN_GREEN, MAX_GREEN) } else { 1.0 };
    (t, green)
}
