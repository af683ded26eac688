//! Lens geometry corrector
//!
//! Vignetting, distortion and transverse chromatic aberration corrections computed from
//! a lens profile at the shot's focal length, aperture and distance.

mod database;
mod lanczos;
mod modifier;
mod profile;

#[cfg(test)]
mod tests;

pub use database::{LensDatabase, StaticLensDatabase};
pub use lanczos::{LANCZOS_SUPPORT, sample};
pub use modifier::{LensModifier, LensSettings};
pub use profile::{
    DistortionCalib, DistortionModel, LensCalibration, LensProfile, TcaCalib, TcaModel,
    VignettingCalib, VignettingModel,
};
