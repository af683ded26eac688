use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::error::{PipelineError, Result};

/// Entries in every 16-bit lookup table.
pub const LUT_SIZE: usize = 0x10000;
pub const MAX_ANCHORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

impl CurvePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A spline through anchors in the unit square. The identity curve has the two anchors
/// (0,0) and (1,1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneCurve {
    anchors: Vec<CurvePoint>,
}

impl Default for ToneCurve {
    fn default() -> Self {
        Self { anchors: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 1.0)] }
    }
}

impl ToneCurve {
    /// Anchors must be strictly increasing in x, inside the unit square, and between two
    /// and `MAX_ANCHORS` of them.
    pub fn new(anchors: Vec<CurvePoint>) -> Result<Self> {
        if anchors.len() < 2 || anchors.len() > MAX_ANCHORS {
            return Err(PipelineError::ConfigError(format!(
                "a curve needs 2 to {} anchors, got {}",
                MAX_ANCHORS,
                anchors.len()
            )));
        }
        let inside = |p: &CurvePoint| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y);
        if !anchors.iter().all(inside) || anchors.windows(2).any(|w| w[1].x <= w[0].x) {
            return Err(PipelineError::ConfigError(
                "curve anchors must be ordered and inside the unit square".to_string(),
            ));
        }
        Ok(Self { anchors })
    }

    pub fn anchors(&self) -> &[CurvePoint] {
        &self.anchors
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Moves the first anchor to `(x, 0)`, the black point.
    pub fn set_black_point(&mut self, x: f64) {
        let limit = self.anchors.get(1).map_or(1.0, |p| p.x);
        let x = x.min(limit - 1e-6).max(0.0);
        self.anchors[0] = CurvePoint::new(x, 0.0);
    }

    pub fn black_point(&self) -> f64 {
        self.anchors[0].x
    }

    /// Curve value at `x`, flat outside the outer anchors.
    pub fn eval(&self, x: f64) -> f64 {
        let a = &self.anchors;
        let n = a.len();
        if x <= a[0].x {
            return a[0].y;
        }
        if x >= a[n - 1].x {
            return a[n - 1].y;
        }
        let seg = a.partition_point(|p| p.x <= x).saturating_sub(1).min(n - 2);
        let tangents = self.tangents();
        hermite(a[seg], a[seg + 1], tangents[seg], tangents[seg + 1], x)
    }

    /// Fritsch-Carlson tangents, so segments between monotone anchors stay monotone.
    fn tangents(&self) -> Vec<f64> {
        let a = &self.anchors;
        let n = a.len();
        let slopes: Vec<f64> = a.windows(2).map(|w| (w[1].y - w[0].y) / (w[1].x - w[0].x)).collect();
        let mut m = vec![0.0; n];
        m[0] = slopes[0];
        m[n - 1] = slopes[n - 2];
        for i in 1..n - 1 {
            m[i] = if slopes[i - 1] * slopes[i] <= 0.0 {
                0.0
            } else {
                (slopes[i - 1] + slopes[i]) / 2.0
            };
        }
        for i in 0..n - 1 {
            if slopes[i] == 0.0 {
                m[i] = 0.0;
                m[i + 1] = 0.0;
                continue;
            }
            let (alpha, beta) = (m[i] / slopes[i], m[i + 1] / slopes[i]);
            let norm = alpha * alpha + beta * beta;
            if norm > 9.0 {
                let tau = 3.0 / norm.sqrt();
                m[i] = tau * alpha * slopes[i];
                m[i + 1] = tau * beta * slopes[i];
            }
        }
        m
    }

    /// 16-bit table over the whole input range.
    pub fn lut(&self) -> Vec<u16> {
        if self.is_identity() {
            return (0..LUT_SIZE).map(|i| i as u16).collect();
        }
        let tangents = self.tangents();
        let a = &self.anchors;
        let mut seg = 0;
        (0..LUT_SIZE)
            .map(|i| {
                let x = i as f64 / (LUT_SIZE - 1) as f64;
                let y = if x <= a[0].x {
                    a[0].y
                } else if x >= a[a.len() - 1].x {
                    a[a.len() - 1].y
                } else {
                    while a[seg + 1].x < x {
                        seg += 1;
                    }
                    hermite(a[seg], a[seg + 1], tangents[seg], tangents[seg + 1], x)
                };
                to_u16(y)
            })
            .collect()
    }
}

fn hermite(p0: CurvePoint, p1: CurvePoint, m0: f64, m1: f64, x: f64) -> f64 {
    let h = p1.x - p0.x;
    let t = (x - p0.x) / h;
    let (t2, t3) = (t * t, t * t * t);
    let y = (2.0 * t3 - 3.0 * t2 + 1.0) * p0.y
        + (t3 - 2.0 * t2 + t) * h * m0
        + (-2.0 * t3 + 3.0 * t2) * p1.y
        + (t3 - t2) * h * m1;
    y.clamp(0.0, 1.0)
}

#[inline]
fn to_u16(y: f64) -> u16 {
    (y * 65535.0 + 0.5).clamp(0.0, 65535.0) as u16
}

/// Last curve of the develop chain, mapping linear light to output code values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum BaseCurve {
    Linear,
    /// Power law with a linear toe: `c·x` below `linearity`, `(a·x + b)^g` above, with
    /// `a`, `b`, `c` and `g` chosen so value and slope are continuous at the joint.
    Gamma { gamma: f64, linearity: f64 },
    Custom { curve: ToneCurve },
}

impl Default for BaseCurve {
    fn default() -> Self {
        BaseCurve::Gamma { gamma: 0.45, linearity: 0.10 }
    }
}

impl BaseCurve {
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            BaseCurve::Linear => x.clamp(0.0, 1.0),
            BaseCurve::Gamma { gamma, linearity } => gamma_value(x, *gamma, *linearity),
            BaseCurve::Custom { curve } => curve.eval(x),
        }
    }

    pub fn lut(&self) -> Vec<u16> {
        match self {
            BaseCurve::Linear => (0..LUT_SIZE).map(|i| i as u16).collect(),
            BaseCurve::Custom { curve } => curve.lut(),
            BaseCurve::Gamma { .. } => (0..LUT_SIZE)
                .map(|i| to_u16(self.eval(i as f64 / (LUT_SIZE - 1) as f64)))
                .collect(),
        }
    }
}

fn gamma_value(x: f64, gamma: f64, linearity: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    if gamma <= 0.0 || linearity >= 1.0 {
        return x;
    }
    let linearity = linearity.max(0.0);
    let g = gamma * (1.0 - linearity) / (1.0 - gamma * linearity);
    let a = 1.0 / (1.0 + linearity * (g - 1.0));
    let b = linearity * (g - 1.0) * a;
    if x < linearity {
        let c = (a * linearity + b).powf(g) / linearity;
        c * x
    } else {
        (a * x + b).powf(g)
    }
}
