//! TIFF output for developed images

mod standard_tiff_writer;
pub mod types;
mod writer;


pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{OutputImage, TiffCompression, TiffOptions};
pub use writer::TiffWriter;
