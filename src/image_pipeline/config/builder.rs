use std::path::PathBuf;

use super::types::{AutoState, Configuration, OutputDepth};
use crate::image_pipeline::demosaic::Interpolation;
use crate::image_pipeline::develop::{BaseCurve, HighlightMode, ToneCurve};
use crate::image_pipeline::geometry::{CropRect, FlipCode};
use crate::image_pipeline::lens::LensSettings;
use crate::image_pipeline::tiff::{TiffCompression, TiffOptions};
use crate::image_pipeline::white_balance::{WbParams, WhiteBalanceMode};

/// Builder for Configuration
#[derive(Default)]
pub struct ConfigurationBuilder {
    white_balance: Option<WhiteBalanceMode>,
    wb_params: Option<WbParams>,
    exposure: Option<f64>,
    auto_exposure: Option<AutoState>,
    auto_black: Option<AutoState>,
    auto_curve: Option<AutoState>,
    curve: Option<ToneCurve>,
    base_curve: Option<BaseCurve>,
    saturation: Option<f64>,
    highlights: Option<HighlightMode>,
    crop: Option<CropRect>,
    rotation: Option<f64>,
    orientation: Option<FlipCode>,
    denoise_threshold: Option<f32>,
    hot_pixel_sensitivity: Option<f64>,
    interpolation: Option<Interpolation>,
    shrink: Option<usize>,
    size: Option<usize>,
    darkframe: Option<PathBuf>,
    use_matrix: Option<bool>,
    lens: Option<LensSettings>,
    output_depth: Option<OutputDepth>,
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
}

impl ConfigurationBuilder {
    pub fn white_balance(mut self, mode: WhiteBalanceMode) -> Self {
        self.white_balance = Some(mode);
        self
    }

    /// Manual white balance at `temperature` kelvin with a green factor.
    pub fn temperature(mut self, temperature: f64, green: f64) -> Self {
        let params = self.wb_params.unwrap_or_default();
        self.wb_params = Some(WbParams { temperature, green, ..params });
        self.white_balance = Some(WhiteBalanceMode::Manual);
        self
    }

    pub fn wb_tuning(mut self, tuning: i32) -> Self {
        let params = self.wb_params.unwrap_or_default();
        self.wb_params = Some(WbParams { tuning, ..params });
        self
    }

    pub fn exposure(mut self, exposure: f64) -> Self {
        self.exposure = Some(exposure);
        self
    }

    pub fn auto_exposure(mut self, state: AutoState) -> Self {
        self.auto_exposure = Some(state);
        self
    }

    pub fn auto_black(mut self, state: AutoState) -> Self {
        self.auto_black = Some(state);
        self
    }

    pub fn auto_curve(mut self, state: AutoState) -> Self {
        self.auto_curve = Some(state);
        self
    }

    pub fn curve(mut self, curve: ToneCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn base_curve(mut self, base_curve: BaseCurve) -> Self {
        self.base_curve = Some(base_curve);
        self
    }

    pub fn saturation(mut self, saturation: f64) -> Self {
        self.saturation = Some(saturation);
        self
    }

    pub fn highlights(mut self, mode: HighlightMode) -> Self {
        self.highlights = Some(mode);
        self
    }

    pub fn crop(mut self, crop: CropRect) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn orientation(mut self, orientation: FlipCode) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn denoise_threshold(mut self, threshold: f32) -> Self {
        self.denoise_threshold = Some(threshold);
        self
    }

    pub fn hot_pixel_sensitivity(mut self, sensitivity: f64) -> Self {
        self.hot_pixel_sensitivity = Some(sensitivity);
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    pub fn shrink(mut self, shrink: usize) -> Self {
        self.shrink = Some(shrink);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn darkframe(mut self, path: impl Into<PathBuf>) -> Self {
        self.darkframe = Some(path.into());
        self
    }

    pub fn use_matrix(mut self, enable: bool) -> Self {
        self.use_matrix = Some(enable);
        self
    }

    pub fn lens(mut self, lens: LensSettings) -> Self {
        self.lens = Some(lens);
        self
    }

    pub fn output_depth(mut self, depth: OutputDepth) -> Self {
        self.output_depth = Some(depth);
        self
    }

    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn build(self) -> Configuration {
        let default = Configuration::default();
        Configuration {
            white_balance: self.white_balance.unwrap_or(default.white_balance),
            wb_params: self.wb_params.unwrap_or(default.wb_params),
            exposure: self.exposure.unwrap_or(default.exposure),
            auto_exposure: self.auto_exposure.unwrap_or(default.auto_exposure),
            auto_black: self.auto_black.unwrap_or(default.auto_black),
            auto_curve: self.auto_curve.unwrap_or(default.auto_curve),
            curve: self.curve.unwrap_or(default.curve),
            base_curve: self.base_curve.unwrap_or(default.base_curve),
            saturation: self.saturation.unwrap_or(default.saturation),
            highlights: self.highlights.unwrap_or(default.highlights),
            crop: self.crop.or(default.crop),
            rotation: self.rotation.unwrap_or(default.rotation),
            orientation: self.orientation.or(default.orientation),
            denoise_threshold: self.denoise_threshold.unwrap_or(default.denoise_threshold),
            hot_pixel_sensitivity: self.hot_pixel_sensitivity.unwrap_or(default.hot_pixel_sensitivity),
            interpolation: self.interpolation.unwrap_or(default.interpolation),
            shrink: self.shrink.unwrap_or(default.shrink),
            size: self.size.unwrap_or(default.size),
            darkframe: self.darkframe.or(default.darkframe),
            use_matrix: self.use_matrix.unwrap_or(default.use_matrix),
            lens: self.lens.unwrap_or(default.lens),
            output_depth: self.output_depth.unwrap_or(default.output_depth),
            tiff: TiffOptions {
                compression: self.compression.unwrap_or(default.tiff.compression),
                predictor: self.predictor.unwrap_or(default.tiff.predictor),
            },
        }
    }
}
