use std::io::{Cursor, Write};

use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, colortype};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::tiff::types::{OutputImage, TiffCompression, TiffOptions};
use crate::image_pipeline::tiff::writer::TiffWriter;

pub struct StandardTiffWriter;

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &OutputImage, output: &mut dyn Write, options: &TiffOptions) -> Result<()> {
        let (width, height) = (image.width() as u32, image.height() as u32);
        debug!(
            "Encoding {}-bit TIFF image: {}x{}",
            image.bits_per_sample(),
            width,
            height
        );
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidDimensions(image.width(), image.height()));
        }

        let compression = match options.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut buffer = Vec::new();
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| PipelineError::EncodeError(e.to_string()))?
            .with_compression(compression);
        if let Some(predictor) = options.predictor {
            encoder = encoder.with_predictor(match predictor {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            });
        }

        match image {
            OutputImage::Rgb8(img) => {
                encoder.write_image::<colortype::RGB8>(width, height, img.pixels.as_flattened())
            }
            OutputImage::Rgb16(img) => {
                encoder.write_image::<colortype::RGB16>(width, height, img.pixels.as_flattened())
            }
        }
        .map_err(|e| PipelineError::EncodeError(e.to_string()))?;

        output
            .write_all(&buffer)
            .map_err(|e| PipelineError::OutputWriteError(e.to_string()))?;
        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}
