//! Demosaic and finalize engine
//!
//! Turns the half-size raw cells into a per-pixel color image, either by block
//! averaging (shrink) or by full interpolation, and undoes the 45° sensor layout of
//! panoramic (fuji) sensors.

mod ahd;
mod bilinear;
mod finalize;
mod fuji;
mod interpolate;
mod shrink;
mod types;
mod vng;

#[cfg(test)]
mod tests;

pub use finalize::{FinalizeParams, choose_scale, finalize};
pub use fuji::fuji_unskew;
pub use interpolate::interpolate;
pub use shrink::shrink;
pub use types::{Interpolation, WB_UNITY};
