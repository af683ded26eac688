use serde::{Deserialize, Serialize};

/// Fixed-point white balance gain equal to 1.0.
pub const WB_UNITY: u32 = 0x10000;

/// Demosaic strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    /// Adaptive homogeneity-directed. Three-color Bayer sensors only.
    #[default]
    Ahd,
    /// Variable number of gradients.
    Vng,
    /// VNG over the four-color split, greens averaged afterwards.
    FourColor,
    Bilinear,
    /// Half-size output by 2×2 block averaging, no interpolation.
    Half,
}

impl Interpolation {
    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::Ahd => "ahd",
            Interpolation::Vng => "vng",
            Interpolation::FourColor => "four-color",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Half => "half",
        }
    }
}

impl std::str::FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ahd" => Ok(Interpolation::Ahd),
            "vng" => Ok(Interpolation::Vng),
            "four-color" | "4color" | "fourcolor" => Ok(Interpolation::FourColor),
            "bilinear" | "linear" => Ok(Interpolation::Bilinear),
            "half" => Ok(Interpolation::Half),
            other => Err(format!("unknown interpolation '{}'", other)),
        }
    }
}
