use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, info_span, instrument, warn};

use super::image::{PhaseBuffer, PipelineImage, SUBAREA_COUNT, Subarea, SubareaGrid};
use super::phase::{Change, Phase, config_changes};
use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::image::{Image16, Rgb8Image, Rgb16Image};
use crate::image_pipeline::common::matrix::identity_rgb_cam;
use crate::image_pipeline::common::parallel::for_each_row;
use crate::image_pipeline::common::timing::{PipelineTimings, Timer};
use crate::image_pipeline::config::{AutoState, Configuration, OutputDepth};
use crate::image_pipeline::demosaic::{FinalizeParams, WB_UNITY, choose_scale, finalize};
use crate::image_pipeline::denoise::wavelet_denoise;
use crate::image_pipeline::develop::{DevelopParams, Developer, DeveloperMode};
use crate::image_pipeline::exposure::{AutoAdjust, RawHistogram};
use crate::image_pipeline::geometry::{
    CropRect, FlipCode, crop, flip, resize, rotate_arbitrary, rotated_dimensions, stretch,
    stretched_dimensions,
};
use crate::image_pipeline::hotpixel;
use crate::image_pipeline::lens::{LensDatabase, LensModifier};
use crate::image_pipeline::raw::{
    Darkframe, RawFrame, RawImageReader, RawLoaderReader, scale_to_full_range,
};
use crate::image_pipeline::tiff::OutputImage;
use crate::image_pipeline::white_balance::{
    PresetTable, ResolvedWb, WbInputs, WhiteBalanceMode, resolve_with_fallback,
};

/// Called after every computed subarea with the phase and its completed fraction.
pub type ProgressCallback = Box<dyn FnMut(Phase, f64)>;

/// One image being converted: the normalized frame, the configuration and the phase
/// buffers, recomputed lazily as the configuration changes.
pub struct Session<R: RawImageReader = RawLoaderReader> {
    reader: R,
    frame: RawFrame,
    raw_multiplier: u32,
    config: Configuration,
    images: [PipelineImage; Phase::COUNT],
    presets: PresetTable,
    lens_database: Option<Arc<dyn LensDatabase>>,
    darkframe: Option<Darkframe>,
    white_balance: Option<ResolvedWb>,
    histogram: RawHistogram,
    developer: Option<Developer>,
    modifier: Option<LensModifier>,
    hot_pixels: usize,
    warnings: Vec<String>,
    timings: PipelineTimings,
    progress: Option<ProgressCallback>,
}

impl Session<RawLoaderReader> {
    /// Decodes `path` with rawloader.
    pub fn open(path: impl AsRef<Path>, config: Configuration) -> Result<Self> {
        Self::open_with(RawLoaderReader, path, config)
    }
}

impl<R: RawImageReader> Session<R> {
    pub fn open_with(reader: R, path: impl AsRef<Path>, config: Configuration) -> Result<Self> {
        let path = path.as_ref();
        info!(input = %path.display(), "Opening raw file");
        let frame = {
            let _span = info_span!("decode_raw").entered();
            reader.open(path)?
        };
        Self::from_frame(reader, frame, config)
    }

    /// Starts a session on an already decoded frame. `reader` is kept for darkframes.
    #[instrument(skip_all, fields(make = %frame.make, model = %frame.model))]
    pub fn from_frame(reader: R, mut frame: RawFrame, mut config: Configuration) -> Result<Self> {
        config.validate()?;
        frame.validate()?;
        let raw_multiplier = scale_to_full_range(&mut frame);
        config.normalize_rotation(frame.orientation);
        clamp_crop(&mut config, &frame);
        let histogram = RawHistogram::new(signal_max(&frame));
        info!(
            width = frame.width,
            height = frame.height,
            colors = frame.colors,
            raw_multiplier,
            "Session ready"
        );
        let darkframe_path = config.darkframe.clone();
        let mut session = Self {
            reader,
            frame,
            raw_multiplier,
            config,
            images: Default::default(),
            presets: PresetTable::default(),
            lens_database: None,
            darkframe: None,
            white_balance: None,
            histogram,
            developer: None,
            modifier: None,
            hot_pixels: 0,
            warnings: Vec::new(),
            timings: PipelineTimings::new(),
            progress: None,
        };
        if let Some(path) = darkframe_path {
            session.load_darkframe(&path)?;
        }
        Ok(session)
    }

    pub fn with_presets(mut self, presets: PresetTable) -> Self {
        self.presets = presets;
        self.white_balance = None;
        self.developer = None;
        self
    }

    pub fn with_lens_database(mut self, database: Arc<dyn LensDatabase>) -> Self {
        self.lens_database = Some(database);
        self
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    pub fn frame(&self) -> &RawFrame {
        &self.frame
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Power of two the raw samples were scaled by when the session opened.
    pub fn raw_multiplier(&self) -> u32 {
        self.raw_multiplier
    }

    pub fn image(&self, phase: Phase) -> &PipelineImage {
        &self.images[phase.index()]
    }

    pub fn white_balance(&self) -> Option<&ResolvedWb> {
        self.white_balance.as_ref()
    }

    pub fn lens_modifier(&self) -> Option<&LensModifier> {
        self.modifier.as_ref()
    }

    pub fn darkframe(&self) -> Option<&Darkframe> {
        self.darkframe.as_ref()
    }

    /// Hot pixels repaired by the last raw phase run.
    pub fn hot_pixels(&self) -> usize {
        self.hot_pixels
    }

    /// Fallback messages raised so far, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn timings(&self) -> &PipelineTimings {
        &self.timings
    }

    pub fn take_timings(&mut self) -> PipelineTimings {
        std::mem::take(&mut self.timings)
    }

    /// Orientation applied in the first phase.
    pub fn orientation(&self) -> FlipCode {
        self.config.effective_orientation(self.frame.orientation)
    }

    /// Phase holding the final display pixels: `Lens` when lens geometry is corrected,
    /// `Develop` otherwise.
    pub fn output_phase(&self) -> Phase {
        if self.has_lens_geometry() { Phase::Lens } else { Phase::Develop }
    }

    /// Final 8-bit pixels as far as they have been computed.
    pub fn display_image(&self) -> Option<&Rgb8Image> {
        self.images[self.output_phase().index()].rgb8()
    }

    fn has_lens_geometry(&self) -> bool {
        self.modifier.as_ref().is_some_and(LensModifier::has_geometry)
    }

    /// Size of the first phase image at full scale: after the panoramic unskew, pixel
    /// aspect stretch, orientation and rotation. Crop rectangles live in these
    /// coordinates.
    pub fn full_dimensions(&self) -> (usize, usize) {
        full_dimensions(&self.frame, &self.config)
    }

    /// Crop in the coordinates of the current first phase buffer.
    pub fn crop_rect(&self) -> CropRect {
        let full = self.full_dimensions();
        let first = &self.images[Phase::First.index()];
        let current = if first.width() > 0 { (first.width(), first.height()) } else { full };
        self.config.crop_for(full.0, full.1).rescaled(full, current)
    }

    /// Marks `phase` and every later phase stale and raises their invalidate events.
    pub fn invalidate(&mut self, phase: Phase) {
        debug!(phase = phase.name(), "Invalidating");
        for p in phase.and_later() {
            self.images[p.index()].invalidate();
        }
        if phase <= Phase::Develop {
            self.developer = None;
        }
        if phase == Phase::Raw {
            if matches!(self.config.white_balance, WhiteBalanceMode::Auto | WhiteBalanceMode::Spot(_)) {
                self.white_balance = None;
            }
            self.histogram = RawHistogram::new(signal_max(&self.frame));
        }
    }

    /// Returns whether `phase` was invalidated since the last call, clearing the event.
    pub fn take_invalidate_event(&mut self, phase: Phase) -> bool {
        self.images[phase.index()].take_invalidate_event()
    }

    /// Replaces the configuration, invalidating from the earliest phase depending on a
    /// changed value. An orientation change alone flips the existing buffers.
    #[instrument(skip_all)]
    pub fn set_config(&mut self, mut config: Configuration) -> Result<()> {
        config.validate()?;
        config.normalize_rotation(self.frame.orientation);
        clamp_crop(&mut config, &self.frame);
        let changes = config_changes(&self.config, &config);
        if changes.is_empty() {
            return Ok(());
        }
        debug!(?changes, "Configuration changed");
        let old_orientation = self.orientation();
        self.config = config;

        if changes.contains(&Change::Darkframe) {
            self.darkframe = None;
            if let Some(path) = self.config.darkframe.clone() {
                self.load_darkframe(&path)?;
            }
        }
        if changes.contains(&Change::WhiteBalance) || changes.contains(&Change::ColorMatrix) {
            self.white_balance = None;
        }
        let earliest = changes.iter().filter_map(|c| c.phase()).min();
        if changes.contains(&Change::Orientation) && earliest.is_none_or(|p| p > Phase::First) {
            self.flip_buffers(old_orientation.inverse().then(self.orientation()));
        }
        if changes.contains(&Change::Lens) && self.images[Phase::First.index()].wide().is_some() {
            self.prepare_buffers();
        }
        if let Some(phase) = earliest {
            self.invalidate(phase);
        }
        Ok(())
    }

    /// Applies `code` after everything else. Mirroring flips negate the rotation since
    /// the two don't commute; the crop and the existing buffers follow the flip.
    #[instrument(skip(self))]
    pub fn flip(&mut self, code: FlipCode) {
        if code.is_identity() {
            return;
        }
        let (width, height) = self.full_dimensions();
        self.config.orientation = Some(self.orientation().then(code));
        if code.is_mirror() && self.config.rotation != 0.0 {
            self.config.rotation = -self.config.rotation;
            self.config.normalize_rotation(self.frame.orientation);
        }
        if let Some(rect) = self.config.crop {
            self.config.crop = Some(rect.normalized(width, height).flipped(code, width, height));
        }
        self.flip_buffers(code);
    }

    fn flip_buffers(&mut self, code: FlipCode) {
        if code.is_identity() {
            return;
        }
        let [_, first, develop, lens] = &mut self.images;
        if let Some(img) = first.wide_mut() {
            flip(img, code);
        }
        for image in [develop, lens] {
            if let Some(img) = image.rgb8_mut() {
                flip(img, code);
            }
            // Subarea bits no longer match the moved pixels.
            if !image.is_complete() && !image.is_stale() {
                image.invalidate();
            }
        }
        if self.images[Phase::First.index()].wide().is_some() {
            self.prepare_buffers();
        }
    }

    /// Reads a darkframe with the session's reader and uses it from the next raw phase.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_darkframe(&mut self, path: &Path) -> Result<()> {
        let frame = self.reader.open(path)?;
        let darkframe = Darkframe::new(path.display().to_string(), frame, &self.frame)?;
        info!("Using darkframe {}", darkframe.name);
        self.darkframe = Some(darkframe);
        self.config.darkframe = Some(path.to_path_buf());
        self.invalidate(Phase::Raw);
        Ok(())
    }

    pub fn clear_darkframe(&mut self) {
        if self.darkframe.take().is_some() {
            self.config.darkframe = None;
            self.invalidate(Phase::Raw);
        }
    }

    /// Computes every subarea of `phase` that is not valid yet.
    pub fn convert_phase(&mut self, phase: Phase) -> Result<()> {
        for area in 0..SUBAREA_COUNT {
            self.convert_image_area(area, phase)?;
        }
        Ok(())
    }

    /// Makes subarea `area` of `phase` valid, computing what it depends on first. Raw
    /// and first phases are always computed whole.
    pub fn convert_image_area(&mut self, area: usize, phase: Phase) -> Result<()> {
        if area >= SUBAREA_COUNT {
            return Err(PipelineError::ConfigError(format!("subarea {} out of range", area)));
        }
        let image = &self.images[phase.index()];
        let ready = if phase.is_whole_buffer() { image.is_complete() } else { image.is_valid(area) };
        if ready {
            return Ok(());
        }
        match phase {
            Phase::Raw => {
                self.convert_raw()?;
                self.images[Phase::Raw.index()].mark_complete();
            }
            Phase::First => {
                self.convert_image_area(area, Phase::Raw)?;
                self.convert_first()?;
                self.prepare_buffers();
                self.images[Phase::First.index()].mark_complete();
            }
            Phase::Develop => {
                self.convert_image_area(area, Phase::First)?;
                self.ensure_developer()?;
                self.develop_area(area)?;
                self.images[Phase::Develop.index()].mark_valid(area);
            }
            Phase::Lens => {
                self.convert_image_area(area, Phase::Develop)?;
                if self.has_lens_geometry() {
                    self.correct_lens_area(area)?;
                    self.images[Phase::Lens.index()].mark_valid(area);
                } else {
                    let mask = self.images[Phase::Develop.index()].valid_mask();
                    self.images[Phase::Lens.index()].set_valid_mask(mask);
                }
            }
        }
        self.report_progress(phase);
        Ok(())
    }

    fn report_progress(&mut self, phase: Phase) {
        let done = self.images[phase.index()].valid_mask().count_ones() as f64 / SUBAREA_COUNT as f64;
        if let Some(callback) = self.progress.as_mut() {
            callback(phase, done);
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn wide_buffer(&self, phase: Phase) -> Result<&Image16> {
        self.images[phase.index()]
            .wide()
            .ok_or(PipelineError::MissingBuffer(phase.name()))
    }

    /// Hot pixels, denoise and darkframe on the half-size raw cells.
    fn convert_raw(&mut self) -> Result<()> {
        let timer = Timer::start(Phase::Raw.name());
        let _span = info_span!("raw_phase").entered();
        let mut raw = self.frame.to_raw_image();
        let (width, height, colors) = (raw.width, raw.height, raw.colors);
        self.hot_pixels = hotpixel::repair(
            &mut raw.pixels,
            width,
            height,
            colors,
            self.frame.rgb_max() as u32,
            self.config.hot_pixel_sensitivity,
        );
        if self.config.denoise_threshold > 0.0 {
            // Thresholds are given for unscaled samples.
            let threshold = self.config.denoise_threshold * (self.raw_multiplier as f32).sqrt();
            wavelet_denoise(&mut raw, threshold);
        }
        if let Some(darkframe) = &self.darkframe {
            darkframe.subtract(&mut raw)?;
        }
        self.images[Phase::Raw.index()].set_buffer(PhaseBuffer::Wide(raw));
        self.timings.record(timer);
        Ok(())
    }

    /// Resolves white balance once per change, retrying with the fallback mode and
    /// writing the outcome back into the configuration.
    fn ensure_white_balance(&mut self) -> Result<ResolvedWb> {
        if let Some(wb) = self.white_balance {
            return Ok(wb);
        }
        self.convert_image_area(0, Phase::Raw)?;
        let outcome = {
            let inputs = WbInputs {
                frame: &self.frame,
                raw: self.wide_buffer(Phase::Raw)?,
                presets: &self.presets,
                use_matrix: self.config.use_matrix,
            };
            resolve_with_fallback(&self.config.white_balance, &self.config.wb_params, &inputs)?
        };
        if let Some(message) = outcome.warning {
            self.warnings.push(message);
        }
        let resolved = outcome.resolved;
        self.config.white_balance = outcome.mode;
        self.config.wb_params.temperature = resolved.temperature;
        self.config.wb_params.green = resolved.green;
        self.config.wb_params.tuning = resolved.tuning;
        self.white_balance = Some(resolved);
        Ok(resolved)
    }

    /// Demosaic with white balance, geometry, then white balance undone.
    fn convert_first(&mut self) -> Result<()> {
        let wb = self.ensure_white_balance()?;
        let timer = Timer::start(Phase::First.name());
        let _span = info_span!("first_phase").entered();
        let full = self.full_dimensions();
        let full_crop = self.config.crop_for(full.0, full.1);
        let scale = choose_scale(
            self.config.shrink,
            self.config.size,
            self.config.interpolation,
            self.frame.filters.is_some(),
            self.frame.pixel_aspect,
            full_crop.width().max(full_crop.height()),
        );
        let gains = wb.finalize_gains(self.frame.colors);
        let params = FinalizeParams {
            interpolation: self.config.interpolation,
            scale,
            gains,
        };
        let mut image = finalize(self.wide_buffer(Phase::Raw)?, &self.frame, &params)?;

        if self.frame.pixel_aspect != 1.0 {
            image = stretch(&image, self.frame.pixel_aspect);
        }
        // Non-square pixels lowered the integer scale; finish the shrink here.
        if self.config.size == 0 && self.config.shrink > 1 {
            let long = image.width.max(image.height);
            resize(&mut image, scale * long / self.config.shrink)?;
        }
        flip(&mut image, self.orientation());
        if self.config.rotation != 0.0 {
            image = rotate_arbitrary(&image, self.config.rotation);
        }
        if self.config.size > 0 {
            let current = full_crop.rescaled(full, (image.width, image.height));
            let crop_long = current.width().max(current.height()).max(1);
            let long = image.width.max(image.height);
            let target = (long as f64 * self.config.size as f64 / crop_long as f64).round() as usize;
            match resize(&mut image, target) {
                Ok(()) => {}
                Err(e @ PipelineError::UpscaleNotSupported { .. }) => {
                    self.warn(format!("{}, keeping {}x{}", e, image.width, image.height));
                }
                Err(e) => return Err(e),
            }
        }
        reverse_white_balance(&mut image, &gains);
        info!(width = image.width, height = image.height, scale, "First phase ready");
        self.images[Phase::First.index()].set_buffer(PhaseBuffer::Wide(image));
        self.timings.record(timer);
        Ok(())
    }

    /// Sizes the develop and lens buffers after the first phase and rebuilds the lens
    /// modifier for that size.
    fn prepare_buffers(&mut self) {
        let first = &self.images[Phase::First.index()];
        let (width, height) = (first.width(), first.height());
        self.images[Phase::Develop.index()].prepare_rgb8(width, height);
        self.modifier = self.lens_database.as_deref().and_then(|database| {
            LensModifier::from_database(
                database,
                &self.frame.make,
                &self.frame.model,
                &self.config.lens,
                width,
                height,
            )
        });
        if self.has_lens_geometry() {
            self.images[Phase::Lens.index()].prepare_rgb8(width, height);
        } else {
            self.images[Phase::Lens.index()].release();
        }
    }

    fn develop_params(&self, wb: &ResolvedWb) -> DevelopParams {
        let colors = self.frame.colors;
        DevelopParams {
            colors,
            chan_mul: wb.chan_mul,
            rgb_cam: if self.config.use_matrix { self.frame.rgb_cam } else { identity_rgb_cam(colors) },
            rgb_max: signal_max(&self.frame),
            exposure: self.config.exposure,
            highlights: self.config.highlights,
            curve: self.config.curve.clone(),
            saturation: self.config.saturation,
            base_curve: self.config.base_curve.clone(),
        }
    }

    fn ensure_developer(&mut self) -> Result<()> {
        if self.developer.is_some() {
            return Ok(());
        }
        let wb = self.ensure_white_balance()?;
        self.apply_auto_adjustments(&wb)?;
        self.developer = Some(Developer::new(&self.develop_params(&wb), DeveloperMode::Full));
        Ok(())
    }

    /// Runs the automatic exposure, black point and curve searches that are in the
    /// `Apply` state and moves them to `Enabled`.
    fn apply_auto_adjustments(&mut self, wb: &ResolvedWb) -> Result<()> {
        let pending = [self.config.auto_exposure, self.config.auto_black, self.config.auto_curve]
            .contains(&AutoState::Apply);
        if !pending {
            return Ok(());
        }
        let _span = info_span!("auto_adjust").entered();
        self.convert_image_area(0, Phase::Raw)?;
        {
            let raw = self.images[Phase::Raw.index()]
                .wide()
                .ok_or(PipelineError::MissingBuffer(Phase::Raw.name()))?;
            self.histogram.update(raw, &self.frame.black, self.frame.colors, &wb.chan_mul);
        }
        let rgb_max = signal_max(&self.frame);

        if self.config.auto_exposure == AutoState::Apply {
            let mut params = self.develop_params(wb);
            params.exposure = 0.0;
            let developer = Developer::new(&params, DeveloperMode::Auto);
            let adjust = AutoAdjust {
                histogram: &self.histogram,
                developer: &developer,
                chan_mul: wb.chan_mul,
                colors: self.frame.colors,
                rgb_max,
            };
            self.config.exposure = adjust.exposure();
            self.config.auto_exposure = AutoState::Enabled;
        }

        let developer = Developer::new(&self.develop_params(wb), DeveloperMode::Auto);
        let adjust = AutoAdjust {
            histogram: &self.histogram,
            developer: &developer,
            chan_mul: wb.chan_mul,
            colors: self.frame.colors,
            rgb_max,
        };
        if self.config.auto_curve == AutoState::Apply {
            let curve = adjust.curve();
            self.config.curve = curve;
            self.config.auto_curve = AutoState::Enabled;
            if self.config.auto_black == AutoState::Apply {
                self.config.auto_black = AutoState::Enabled;
            }
        } else if self.config.auto_black == AutoState::Apply {
            let black = adjust.black_point();
            self.config.curve.set_black_point(black);
            self.config.auto_black = AutoState::Enabled;
        }
        Ok(())
    }

    fn develop_area(&mut self, area: usize) -> Result<()> {
        let timer = Timer::start(Phase::Develop.name());
        let developer = self
            .developer
            .as_ref()
            .ok_or(PipelineError::MissingBuffer(Phase::Develop.name()))?;
        let vignetting = self.modifier.as_ref().filter(|m| m.has_vignetting());
        let [_, first, develop, _] = &mut self.images;
        let src = first.wide().ok_or(PipelineError::MissingBuffer(Phase::First.name()))?;
        let rect = SubareaGrid::new(src.width, src.height).rect(area);
        let dst = develop
            .rgb8_mut()
            .ok_or(PipelineError::MissingBuffer(Phase::Develop.name()))?;
        process_rows(&mut dst.pixels, dst.width, rect, |y, out| {
            let span = rect.x..rect.x + rect.width;
            let gains = vignetting.map(|modifier| {
                let mut gains = vec![1.0; rect.width];
                modifier.vignetting_row(y, rect.x, &mut gains);
                gains
            });
            developer.develop_row(&src.row(y)[span], gains.as_deref(), out);
        });
        self.timings.record(timer);
        Ok(())
    }

    /// Remaps one subarea of the lens phase, first developing every subarea its source
    /// pixels come from.
    fn correct_lens_area(&mut self, area: usize) -> Result<()> {
        let timer = Timer::start(Phase::Lens.name());
        let grid = self.images[Phase::Lens.index()].grid();
        let rect = grid.rect(area);
        if rect.is_empty() {
            return Ok(());
        }
        let needed = match self.modifier.as_ref() {
            Some(modifier) => {
                let (left, top, right, bottom) =
                    modifier.source_bounds(rect.x, rect.y, rect.width, rect.height);
                grid.intersecting(left, top, right, bottom)
            }
            None => return Err(PipelineError::MissingBuffer(Phase::Lens.name())),
        };
        for source_area in needed {
            self.convert_image_area(source_area, Phase::Develop)?;
        }

        let modifier = self
            .modifier
            .as_ref()
            .ok_or(PipelineError::MissingBuffer(Phase::Lens.name()))?;
        let [_, _, develop, lens] = &mut self.images;
        let src = develop
            .rgb8()
            .ok_or(PipelineError::MissingBuffer(Phase::Develop.name()))?;
        let dst = lens.rgb8_mut().ok_or(PipelineError::MissingBuffer(Phase::Lens.name()))?;
        process_rows(&mut dst.pixels, dst.width, rect, |y, out| {
            modifier.remap_row(src, y, rect.x, out);
        });
        self.timings.record(timer);
        Ok(())
    }

    /// Final cropped image at the configured depth. 8-bit output is the display
    /// pipeline's result; 16-bit output develops the first phase again at full depth.
    #[instrument(skip(self))]
    pub fn render(&mut self) -> Result<OutputImage> {
        let image = match self.config.output_depth {
            OutputDepth::Eight => {
                self.convert_phase(Phase::Lens)?;
                let rect = self.crop_rect();
                let image = self
                    .display_image()
                    .ok_or(PipelineError::MissingBuffer(self.output_phase().name()))?;
                OutputImage::Rgb8(crop(image, rect))
            }
            OutputDepth::Sixteen => {
                self.convert_phase(Phase::First)?;
                self.ensure_developer()?;
                let timer = Timer::start("render16");
                let image = self.develop_full_depth()?;
                let image = match self.modifier.as_ref().filter(|m| m.has_geometry()) {
                    Some(modifier) => modifier.remap(&image),
                    None => image,
                };
                self.timings.record(timer);
                OutputImage::Rgb16(crop(&image, self.crop_rect()))
            }
        };
        info!(
            width = image.width(),
            height = image.height(),
            depth = ?self.config.output_depth,
            "Rendered output"
        );
        Ok(image)
    }

    fn develop_full_depth(&self) -> Result<Rgb16Image> {
        let developer = self
            .developer
            .as_ref()
            .ok_or(PipelineError::MissingBuffer(Phase::Develop.name()))?;
        let src = self.wide_buffer(Phase::First)?;
        let vignetting = self.modifier.as_ref().filter(|m| m.has_vignetting());
        let mut out = Rgb16Image::new(src.width, src.height, 3);
        for_each_row(&mut out.pixels, src.width, |y, row| {
            let gains = vignetting.map(|modifier| {
                let mut gains = vec![1.0; row.len()];
                modifier.vignetting_row(y, 0, &mut gains);
                gains
            });
            developer.develop_row(src.row(y), gains.as_deref(), row);
        });
        Ok(out)
    }
}

/// First phase size at full scale for `config`; see `Session::full_dimensions`.
fn full_dimensions(frame: &RawFrame, config: &Configuration) -> (usize, usize) {
    let (mut width, mut height) = (frame.width, frame.height);
    if frame.fuji_width > 0
        && frame.fuji_step > 0.0
        && frame.fuji_step != 1.0
        && frame.fuji_width < frame.height
    {
        width = (frame.fuji_width as f64 / frame.fuji_step) as usize;
        height = ((frame.height - frame.fuji_width) as f64 / frame.fuji_step) as usize;
    }
    let (width, height) = stretched_dimensions(width, height, frame.pixel_aspect);
    let (width, height) = config
        .effective_orientation(frame.orientation)
        .apply_dimensions(width, height);
    rotated_dimensions(width, height, config.rotation)
}

/// Stores the crop ordered and clamped to the full-scale image.
fn clamp_crop(config: &mut Configuration, frame: &RawFrame) {
    if let Some(rect) = config.crop {
        let (width, height) = full_dimensions(frame, config);
        config.crop = Some(rect.normalized(width, height));
    }
}

/// Largest black-subtracted sample value.
fn signal_max(frame: &RawFrame) -> u32 {
    (frame.rgb_max() as u32).saturating_sub(frame.black_max() as u32).max(1)
}

/// Runs `f(y, row_part)` in parallel for the rows of `rect`, handing it the part of
/// each row inside the rectangle.
fn process_rows<T, F>(pixels: &mut [T], width: usize, rect: Subarea, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if rect.is_empty() || width == 0 {
        return;
    }
    pixels
        .par_chunks_mut(width)
        .enumerate()
        .skip(rect.y)
        .take(rect.height)
        .for_each(|(y, row)| f(y, &mut row[rect.x..rect.x + rect.width]));
}

/// Divides the finalize gains back out so the first phase holds unbalanced values.
fn reverse_white_balance(image: &mut Image16, gains: &[u32; 4]) {
    let colors = image.colors.min(4);
    let unity = WB_UNITY as u64;
    let inverse = gains.map(|g| unity * unity / g.max(1) as u64);
    for_each_row(&mut image.pixels, image.width, |_, row| {
        for px in row.iter_mut() {
            for c in 0..colors {
                px[c] = ((px[c] as u64 * inverse[c]) >> 16).min(0xFFFF) as u16;
            }
        }
    });
}
