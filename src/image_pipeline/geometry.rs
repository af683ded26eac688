//! Geometry engine
//!
//! Orientation flips, arbitrary rotation, pixel-aspect stretch, area downsampling and
//! crop rectangles. All operations are generic over the pixel type so they serve both
//! the 16-bit working buffers and the 8-bit display buffers.

mod crop;
mod flip;
mod resize;
mod rotate;
mod stretch;

#[cfg(test)]
mod tests;

pub use crop::{CropRect, crop};
pub use flip::{FlipCode, flip, normalize_rotation};
pub use resize::resize;
pub use rotate::{rotate_arbitrary, rotated_dimensions};
pub use stretch::{stretch, stretched_dimensions};
