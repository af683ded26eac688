use crate::image_pipeline::config::Configuration;

/// Intermediate buffers of a session, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Half-size raw cells after hot pixel repair, denoise and darkframe.
    Raw,
    /// Full-color 16-bit image after demosaic and geometry, white balance undone.
    First,
    /// 8-bit developed RGB.
    Develop,
    /// Lens geometry corrected RGB; aliases `Develop` when no pixel moves.
    Lens,
}

impl Phase {
    pub const COUNT: usize = 4;
    pub const ALL: [Phase; Phase::COUNT] = [Phase::Raw, Phase::First, Phase::Develop, Phase::Lens];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Raw => "raw",
            Phase::First => "first",
            Phase::Develop => "develop",
            Phase::Lens => "lens",
        }
    }

    /// This phase and every phase after it.
    pub fn and_later(self) -> impl Iterator<Item = Phase> {
        Phase::ALL.into_iter().skip(self.index())
    }

    /// Whether the phase is always computed as a whole.
    pub fn is_whole_buffer(self) -> bool {
        matches!(self, Phase::Raw | Phase::First)
    }
}

/// A group of configuration values with a common earliest dependent phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    HotPixels,
    Denoise,
    Darkframe,
    Interpolation,
    Crop,
    Rotation,
    Shrink,
    Size,
    /// Handled by flipping the existing buffers.
    Orientation,
    WhiteBalance,
    Exposure,
    Curves,
    Saturation,
    Highlights,
    ColorMatrix,
    Lens,
    /// Output encoding only; no buffer depends on it.
    Output,
}

impl Change {
    /// Earliest phase that has to be recomputed, if any.
    pub fn phase(self) -> Option<Phase> {
        match self {
            Change::HotPixels | Change::Denoise | Change::Darkframe => Some(Phase::Raw),
            Change::Interpolation | Change::Crop | Change::Rotation | Change::Shrink | Change::Size => {
                Some(Phase::First)
            }
            Change::WhiteBalance
            | Change::Exposure
            | Change::Curves
            | Change::Saturation
            | Change::Highlights
            | Change::ColorMatrix
            | Change::Lens => Some(Phase::Develop),
            Change::Orientation | Change::Output => None,
        }
    }
}

/// Categories of the values that differ between two configurations. Rotation and
/// orientation are compared as given, so both sides should be normalized first.
pub fn config_changes(old: &Configuration, new: &Configuration) -> Vec<Change> {
    let checks = [
        (old.hot_pixel_sensitivity != new.hot_pixel_sensitivity, Change::HotPixels),
        (old.denoise_threshold != new.denoise_threshold, Change::Denoise),
        (old.darkframe != new.darkframe, Change::Darkframe),
        (old.interpolation != new.interpolation, Change::Interpolation),
        (old.crop != new.crop, Change::Crop),
        (old.rotation != new.rotation, Change::Rotation),
        (old.shrink != new.shrink, Change::Shrink),
        (old.size != new.size, Change::Size),
        (old.orientation != new.orientation, Change::Orientation),
        (
            old.white_balance != new.white_balance || old.wb_params != new.wb_params,
            Change::WhiteBalance,
        ),
        (
            old.exposure != new.exposure || old.auto_exposure != new.auto_exposure,
            Change::Exposure,
        ),
        (
            old.curve != new.curve
                || old.base_curve != new.base_curve
                || old.auto_black != new.auto_black
                || old.auto_curve != new.auto_curve,
            Change::Curves,
        ),
        (old.saturation != new.saturation, Change::Saturation),
        (old.highlights != new.highlights, Change::Highlights),
        (old.use_matrix != new.use_matrix, Change::ColorMatrix),
        (old.lens != new.lens, Change::Lens),
        (
            old.output_depth != new.output_depth || old.tiff != new.tiff,
            Change::Output,
        ),
    ];
    checks
        .into_iter()
        .filter_map(|(changed, change)| changed.then_some(change))
        .collect()
}
