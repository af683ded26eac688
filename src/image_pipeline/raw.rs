//! RAW image ingest
//!
//! Decoding through the external decoder, scale normalization and darkframes.

mod darkframe;
mod normalize;
mod rawloader_reader;
mod reader;
pub mod types;

#[cfg(test)]
mod tests;

pub use darkframe::Darkframe;
pub use normalize::scale_to_full_range;
pub use rawloader_reader::RawLoaderReader;
pub use reader::RawImageReader;
pub use types::{FilterPattern, RawFrame};
