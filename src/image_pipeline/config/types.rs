use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::demosaic::Interpolation;
use crate::image_pipeline::develop::{BaseCurve, HighlightMode, ToneCurve};
use crate::image_pipeline::geometry::{CropRect, FlipCode, normalize_rotation};
use crate::image_pipeline::lens::LensSettings;
use crate::image_pipeline::tiff::TiffOptions;
use crate::image_pipeline::white_balance::{WbParams, WhiteBalanceMode};

/// State of an automatic adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoState {
    #[default]
    Disabled,
    /// The value was computed automatically and has not been edited since.
    Enabled,
    /// Compute on the next conversion, then become `Enabled`.
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputDepth {
    #[default]
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "16")]
    Sixteen,
}

/// All user parameters of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub white_balance: WhiteBalanceMode,
    pub wb_params: WbParams,
    /// Exposure compensation in EV.
    pub exposure: f64,
    pub auto_exposure: AutoState,
    pub auto_black: AutoState,
    pub auto_curve: AutoState,
    pub curve: ToneCurve,
    pub base_curve: BaseCurve,
    pub saturation: f64,
    pub highlights: HighlightMode,
    /// Crop in the coordinates of the full-size oriented image; `None` keeps everything.
    pub crop: Option<CropRect>,
    /// Clockwise rotation in degrees.
    pub rotation: f64,
    /// Flip applied on top of the sensor layout; `None` follows the camera.
    pub orientation: Option<FlipCode>,
    pub denoise_threshold: f32,
    /// Hot pixel sensitivity; zero disables the filter.
    pub hot_pixel_sensitivity: f64,
    pub interpolation: Interpolation,
    /// Integer downscale; ignored when `size` is set.
    pub shrink: usize,
    /// Long edge of the output in pixels; zero keeps the full size.
    pub size: usize,
    pub darkframe: Option<PathBuf>,
    /// Use the camera's color matrix; otherwise raw colors are taken as sRGB.
    pub use_matrix: bool,
    pub lens: LensSettings,
    pub output_depth: OutputDepth,
    pub tiff: TiffOptions,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            white_balance: WhiteBalanceMode::Camera,
            wb_params: WbParams::default(),
            exposure: 0.0,
            auto_exposure: AutoState::Disabled,
            auto_black: AutoState::Disabled,
            auto_curve: AutoState::Disabled,
            curve: ToneCurve::default(),
            base_curve: BaseCurve::default(),
            saturation: 1.0,
            highlights: HighlightMode::Clip,
            crop: None,
            rotation: 0.0,
            orientation: None,
            denoise_threshold: 0.0,
            hot_pixel_sensitivity: 0.0,
            interpolation: Interpolation::Ahd,
            shrink: 1,
            size: 0,
            darkframe: None,
            use_matrix: true,
            lens: LensSettings::default(),
            output_depth: OutputDepth::Eight,
            tiff: TiffOptions::default(),
        }
    }
}

impl Configuration {
    pub fn builder() -> super::builder::ConfigurationBuilder {
        super::builder::ConfigurationBuilder::default()
    }

    /// Rejects parameter values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str| Err(PipelineError::ConfigError(what.to_string()));
        if self.shrink == 0 {
            return bad("shrink factor must be at least 1");
        }
        if !self.exposure.is_finite() || !self.rotation.is_finite() {
            return bad("exposure and rotation must be finite");
        }
        if !(self.saturation >= 0.0) {
            return bad("saturation must be non-negative");
        }
        if !(self.denoise_threshold >= 0.0) {
            return bad("denoise threshold must be non-negative");
        }
        if self.hot_pixel_sensitivity.is_nan() {
            return bad("hot pixel sensitivity must be a number");
        }
        let params = &self.wb_params;
        if !(params.temperature > 0.0) || !(params.green > 0.0) {
            return bad("white balance temperature and green must be positive");
        }
        if !self.lens.scale.is_finite() {
            return bad("lens scale must be finite");
        }
        ToneCurve::new(self.curve.anchors().to_vec())?;
        if let BaseCurve::Custom { curve } = &self.base_curve {
            ToneCurve::new(curve.anchors().to_vec())?;
        }
        Ok(())
    }

    /// Folds whole quarter turns of `rotation` into `orientation`, leaving an angle in
    /// `[0, 90)`. `camera` is the orientation used when none is set.
    pub fn normalize_rotation(&mut self, camera: FlipCode) {
        let (angle, orientation) = normalize_rotation(self.rotation, self.orientation.unwrap_or(camera));
        self.rotation = angle;
        if orientation != self.orientation.unwrap_or(camera) {
            self.orientation = Some(orientation);
        }
    }

    /// Effective orientation for a camera reporting `camera`.
    pub fn effective_orientation(&self, camera: FlipCode) -> FlipCode {
        self.orientation.unwrap_or(camera)
    }

    /// Crop clamped to a `width`×`height` image.
    pub fn crop_for(&self, width: usize, height: usize) -> CropRect {
        self.crop
            .map_or(CropRect::full(width, height), |c| c.normalized(width, height))
    }
}
