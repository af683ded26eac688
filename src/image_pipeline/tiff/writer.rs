use std::io::Write;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::tiff::types::{OutputImage, TiffOptions};

pub trait TiffWriter {
    fn write_tiff(&self, image: &OutputImage, output: &mut dyn Write, options: &TiffOptions) -> Result<()>;
}
