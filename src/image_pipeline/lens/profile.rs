use serde::{Deserialize, Serialize};

/// Radial distortion, mapping a corrected radius to the radius recorded by the lens.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "model")]
pub enum DistortionModel {
    #[default]
    None,
    /// `r_d = r·(1 − k1 + k1·r²)`
    Poly3 { k1: f64 },
    /// `r_d = r·(1 + k1·r² + k2·r⁴)`
    Poly5 { k1: f64, k2: f64 },
    /// PanoTools: `r_d = r·(a·r³ + b·r² + c·r + 1 − a − b − c)`
    PtLens { a: f64, b: f64, c: f64 },
}

impl DistortionModel {
    #[inline]
    pub fn distort(&self, r: f64) -> f64 {
        match *self {
            DistortionModel::None => r,
            DistortionModel::Poly3 { k1 } => r * (1.0 - k1 + k1 * r * r),
            DistortionModel::Poly5 { k1, k2 } => {
                let r2 = r * r;
                r * (1.0 + k1 * r2 + k2 * r2 * r2)
            }
            DistortionModel::PtLens { a, b, c } => {
                r * (a * r * r * r + b * r * r + c * r + 1.0 - a - b - c)
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DistortionModel::None)
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        let l = |a: f64, b: f64| a + (b - a) * t;
        match (*self, *other) {
            (DistortionModel::Poly3 { k1: a }, DistortionModel::Poly3 { k1: b }) => {
                DistortionModel::Poly3 { k1: l(a, b) }
            }
            (DistortionModel::Poly5 { k1: a1, k2: a2 }, DistortionModel::Poly5 { k1: b1, k2: b2 }) => {
                DistortionModel::Poly5 { k1: l(a1, b1), k2: l(a2, b2) }
            }
            (
                DistortionModel::PtLens { a: a0, b: b0, c: c0 },
                DistortionModel::PtLens { a: a1, b: b1, c: c1 },
            ) => DistortionModel::PtLens { a: l(a0, a1), b: l(b0, b1), c: l(c0, c1) },
            _ if t < 0.5 => *self,
            _ => *other,
        }
    }
}

/// Pablo d'Angelo vignetting: light falls off as `1 + k1·r² + k2·r⁴ + k3·r⁶`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "model")]
pub enum VignettingModel {
    #[default]
    None,
    Pa { k1: f64, k2: f64, k3: f64 },
}

impl VignettingModel {
    /// Relative illumination at normalized radius `r`.
    #[inline]
    pub fn falloff(&self, r: f64) -> f64 {
        match *self {
            VignettingModel::None => 1.0,
            VignettingModel::Pa { k1, k2, k3 } => {
                let r2 = r * r;
                1.0 + r2 * (k1 + r2 * (k2 + r2 * k3))
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, VignettingModel::None)
    }
}

/// Linear transverse chromatic aberration: red and blue radii scaled relative to green.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "model")]
pub enum TcaModel {
    #[default]
    None,
    Linear { kr: f64, kb: f64 },
}

impl TcaModel {
    /// Radius scale for red, green and blue.
    pub fn scales(&self) -> [f64; 3] {
        match *self {
            TcaModel::None => [1.0; 3],
            TcaModel::Linear { kr, kb } => [kr, 1.0, kb],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TcaModel::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistortionCalib {
    pub focal: f64,
    pub model: DistortionModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TcaCalib {
    pub focal: f64,
    pub model: TcaModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VignettingCalib {
    pub focal: f64,
    pub aperture: f64,
    pub distance: f64,
    pub model: VignettingModel,
}

/// Lens calibration data as stored in a lens database.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LensProfile {
    pub maker: String,
    pub model: String,
    /// Camera makers the lens fits; empty means any.
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub distortion: Vec<DistortionCalib>,
    #[serde(default)]
    pub vignetting: Vec<VignettingCalib>,
    #[serde(default)]
    pub tca: Vec<TcaCalib>,
}

/// Models in effect for one shot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LensCalibration {
    pub distortion: DistortionModel,
    pub vignetting: VignettingModel,
    pub tca: TcaModel,
}

/// Brackets `focal` among entries sorted by focal length and returns the two neighbours
/// with the interpolation factor. Outside the range the nearest entry is used alone.
fn bracket<T>(entries: &[T], focal: f64, key: impl Fn(&T) -> f64) -> Option<(&T, &T, f64)> {
    let mut sorted: Vec<&T> = entries.iter().collect();
    sorted.sort_by(|a, b| key(*a).total_cmp(&key(*b)));
    let first = *sorted.first()?;
    let last = *sorted.last()?;
    if focal <= key(first) {
        return Some((first, first, 0.0));
    }
    if focal >= key(last) {
        return Some((last, last, 0.0));
    }
    sorted.windows(2).find_map(|w| {
        let (lo, hi) = (key(w[0]), key(w[1]));
        (focal >= lo && focal <= hi).then(|| {
            let t = if hi > lo { (focal - lo) / (hi - lo) } else { 0.0 };
            (w[0], w[1], t)
        })
    })
}

impl LensProfile {
    /// Calibration at the given shooting parameters.
    ///
    /// Distortion and TCA are interpolated linearly in focal length. Vignetting uses
    /// inverse distance weighting over focal length, aperture and distance.
    pub fn interpolate(&self, focal: f64, aperture: f64, distance: f64) -> LensCalibration {
        let distortion = bracket(&self.distortion, focal, |c| c.focal)
            .map(|(a, b, t)| a.model.lerp(&b.model, t))
            .unwrap_or_default();
        let tca = bracket(&self.tca, focal, |c| c.focal)
            .map(|(a, b, t)| match (a.model, b.model) {
                (TcaModel::Linear { kr: r0, kb: b0 }, TcaModel::Linear { kr: r1, kb: b1 }) => {
                    TcaModel::Linear { kr: r0 + (r1 - r0) * t, kb: b0 + (b1 - b0) * t }
                }
                (m, _) => m,
            })
            .unwrap_or_default();
        LensCalibration { distortion, vignetting: self.interpolate_vignetting(focal, aperture, distance), tca }
    }

    fn interpolate_vignetting(&self, focal: f64, aperture: f64, distance: f64) -> VignettingModel {
        let (min_f, max_f) = self
            .vignetting
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.focal), hi.max(c.focal)));
        let span = (max_f - min_f).max(1.0);
        let coords = |f: f64, a: f64, d: f64| {
            [(f - min_f) / span, 4.0 / a.max(0.5), 0.1 / d.max(0.1)]
        };
        let target = coords(focal, aperture, distance);
        let mut weights = 0.0;
        let mut k = [0.0; 3];
        for calib in &self.vignetting {
            let VignettingModel::Pa { k1, k2, k3 } = calib.model else {
                continue;
            };
            let at = coords(calib.focal, calib.aperture, calib.distance);
            let dist: f64 = at.iter().zip(&target).map(|(a, b)| (a - b) * (a - b)).sum::<f64>().sqrt();
            if dist < 1e-4 {
                return calib.model;
            }
            let w = dist.powf(-3.5);
            weights += w;
            k[0] += w * k1;
            k[1] += w * k2;
            k[2] += w * k3;
        }
        if weights == 0.0 {
            return VignettingModel::None;
        }
        VignettingModel::Pa { k1: k[0] / weights, k2: k[1] / weights, k3: k[2] / weights }
    }
}
