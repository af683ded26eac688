use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::database::LensDatabase;
use super::lanczos::sample;
use super::profile::LensCalibration;
use crate::image_pipeline::common::image::{Image, Pixel};
use crate::image_pipeline::common::parallel::for_each_row;

/// Lens selection and shooting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensSettings {
    /// Lens name as known to the database; `None` disables lens correction.
    pub lens: Option<String>,
    pub focal_length: f64,
    pub aperture: f64,
    /// Subject distance in meters.
    pub distance: f64,
    /// Extra magnification in stops: the image is scaled by `2^scale`.
    pub scale: f64,
}

impl Default for LensSettings {
    fn default() -> Self {
        Self { lens: None, focal_length: 50.0, aperture: 8.0, distance: 1000.0, scale: 0.0 }
    }
}

/// Per-pixel correction for one image size.
///
/// Radii are normalized so that half of the shorter image side is 1.
#[derive(Debug, Clone)]
pub struct LensModifier {
    calibration: LensCalibration,
    width: usize,
    height: usize,
    center: (f64, f64),
    norm: f64,
    scale: f64,
}

impl LensModifier {
    pub fn new(calibration: LensCalibration, width: usize, height: usize, scale: f64) -> Self {
        let half = (width.min(height) as f64 / 2.0).max(1.0);
        Self {
            calibration,
            width,
            height,
            center: ((width as f64 - 1.0) / 2.0, (height as f64 - 1.0) / 2.0),
            norm: 1.0 / half,
            scale: 2f64.powf(scale),
        }
    }

    /// Looks the lens up and interpolates its calibration. `None` when no lens is
    /// selected, the lens is unknown, or the profile corrects nothing.
    pub fn from_database(
        database: &dyn LensDatabase,
        make: &str,
        model: &str,
        settings: &LensSettings,
        width: usize,
        height: usize,
    ) -> Option<Self> {
        let name = settings.lens.as_deref()?;
        let profile = database.find_lens(make, model, name)?;
        let calibration = profile.interpolate(settings.focal_length, settings.aperture, settings.distance);
        let modifier = Self::new(calibration, width, height, settings.scale);
        if !modifier.is_active() {
            debug!("Lens '{}' needs no correction at these settings", name);
            return None;
        }
        info!(
            lens = name,
            geometry = modifier.has_geometry(),
            vignetting = modifier.has_vignetting(),
            "Lens correction enabled"
        );
        Some(modifier)
    }

    pub fn calibration(&self) -> &LensCalibration {
        &self.calibration
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Whether pixels move: distortion, TCA or scaling.
    pub fn has_geometry(&self) -> bool {
        !self.calibration.distortion.is_none() || !self.calibration.tca.is_none() || self.scale != 1.0
    }

    pub fn has_vignetting(&self) -> bool {
        !self.calibration.vignetting.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.has_geometry() || self.has_vignetting()
    }

    /// Source position of each color channel for the output pixel `(x, y)`.
    #[inline]
    pub fn source_coords(&self, x: f64, y: f64) -> [(f32, f32); 3] {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        let r = (dx * dx + dy * dy).sqrt() * self.norm / self.scale;
        let distortion = if r > 0.0 { self.calibration.distortion.distort(r) / r } else { 1.0 };
        let factor = distortion / self.scale;
        self.calibration.tca.scales().map(|k| {
            let f = factor * k;
            ((self.center.0 + dx * f) as f32, (self.center.1 + dy * f) as f32)
        })
    }

    /// Brightness gain undoing the light falloff at `(x, y)`.
    #[inline]
    pub fn vignetting_gain(&self, x: f64, y: f64) -> f32 {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        let falloff = self.calibration.vignetting.falloff((dx * dx + dy * dy).sqrt() * self.norm);
        if falloff > 1e-3 { (1.0 / falloff) as f32 } else { 1.0 }
    }

    /// Vignetting gains for `out.len()` pixels of row `y` starting at column `x0`.
    pub fn vignetting_row(&self, y: usize, x0: usize, out: &mut [f32]) {
        for (i, g) in out.iter_mut().enumerate() {
            *g = self.vignetting_gain((x0 + i) as f64, y as f64);
        }
    }

    /// Remaps `out.len()` pixels of row `y`, starting at column `x0`, from `src`.
    pub fn remap_row<P: Pixel>(&self, src: &Image<P>, y: usize, x0: usize, out: &mut [P]) {
        for (i, px) in out.iter_mut().enumerate() {
            let coords = self.source_coords((x0 + i) as f64, y as f64);
            for (c, (sx, sy)) in coords.into_iter().enumerate() {
                px.set_channel(c, sample(src, sx, sy, c));
            }
        }
    }

    /// Geometry-corrected copy of `src`, rows in parallel.
    pub fn remap<P: Pixel>(&self, src: &Image<P>) -> Image<P> {
        if !self.has_geometry() {
            return src.clone();
        }
        let mut out = Image::<P>::new(src.width, src.height, src.colors);
        for_each_row(&mut out.pixels, src.width, |y, row| self.remap_row(src, y, 0, row));
        out
    }

    /// Bounding box `(left, top, right, bottom)` (exclusive) of the source pixels read
    /// when remapping the given output rectangle, judged from its corners and edge
    /// midpoints and clamped to the image.
    pub fn source_bounds(&self, x: usize, y: usize, w: usize, h: usize) -> (usize, usize, usize, usize) {
        let (x1, y1) = ((x + w).saturating_sub(1) as f64, (y + h).saturating_sub(1) as f64);
        let (xm, ym) = ((x + w / 2) as f64, (y + h / 2) as f64);
        let (x0, y0) = (x as f64, y as f64);
        let probes = [(x0, y0), (xm, y0), (x1, y0), (x0, ym), (x1, ym), (x0, y1), (xm, y1), (x1, y1)];
        let margin = super::lanczos::LANCZOS_SUPPORT as f32;
        let (mut left, mut top, mut right, mut bottom) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (px, py) in probes {
            for (sx, sy) in self.source_coords(px, py) {
                left = left.min(sx - margin);
                top = top.min(sy - margin);
                right = right.max(sx + margin + 1.0);
                bottom = bottom.max(sy + margin + 1.0);
            }
        }
        let clamp = |v: f32, max: usize| (v.max(0.0) as usize).min(max);
        (
            clamp(left, self.width),
            clamp(top, self.height),
            clamp(right, self.width),
            clamp(bottom, self.height),
        )
    }
}
