use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::image::{Rgb8Image, Rgb16Image};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TiffOptions {
    pub compression: TiffCompression,
    /// 2 selects horizontal differencing; anything else disables the predictor.
    pub predictor: Option<u16>,
}

/// A developed image ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputImage {
    Rgb8(Rgb8Image),
    Rgb16(Rgb16Image),
}

impl OutputImage {
    pub fn width(&self) -> usize {
        match self {
            OutputImage::Rgb8(img) => img.width,
            OutputImage::Rgb16(img) => img.width,
        }
    }

    pub fn height(&self) -> usize {
        match self {
            OutputImage::Rgb8(img) => img.height,
            OutputImage::Rgb16(img) => img.height,
        }
    }

    pub fn bits_per_sample(&self) -> u8 {
        match self {
            OutputImage::Rgb8(_) => 8,
            OutputImage::Rgb16(_) => 16,
        }
    }
}
