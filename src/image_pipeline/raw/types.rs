//! RAW frame and color filter array types

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::common::matrix::identity_rgb_cam;
use crate::image_pipeline::geometry::FlipCode;

/// Largest supported filter repeat in either direction.
const MAX_PATTERN_SIZE: usize = 8;

/// Color filter array descriptor: a `width`×`height` tile of color indices repeated over
/// the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPattern {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl FilterPattern {
    /// Builds a pattern from row-major cells.
    ///
    /// Every aligned 2×2 cell must hold four distinct colors once greens sharing a row
    /// with blue are split into color 3, otherwise half-size cells would merge samples.
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Result<Self> {
        if width == 0
            || height == 0
            || width > MAX_PATTERN_SIZE
            || height > MAX_PATTERN_SIZE
            || width % 2 != 0
            || height % 2 != 0
        {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{}x{} color filter array",
                width, height
            )));
        }
        if cells.len() != width * height || cells.iter().any(|&c| c > 3) {
            return Err(PipelineError::UnsupportedFormat(
                "malformed color filter array".to_string(),
            ));
        }
        let pattern = Self { width, height, cells };
        let split = pattern.four_color();
        for row in (0..height).step_by(2) {
            for col in (0..width).step_by(2) {
                let mut seen = [false; 4];
                for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                    let c = split.color_at(row + dr, col + dc);
                    if seen[c] {
                        return Err(PipelineError::UnsupportedFormat(format!(
                            "color filter array repeats color {} in a 2x2 cell",
                            c
                        )));
                    }
                    seen[c] = true;
                }
            }
        }
        Ok(pattern)
    }

    /// Standard 2×2 Bayer pattern from its top-left, top-right, bottom-left, bottom-right
    /// colors.
    pub fn bayer(cells: [u8; 4]) -> Result<Self> {
        Self::new(2, 2, cells.to_vec())
    }

    pub fn rggb() -> Self {
        Self { width: 2, height: 2, cells: vec![0, 1, 1, 2] }
    }

    pub fn bggr() -> Self {
        Self { width: 2, height: 2, cells: vec![2, 1, 1, 0] }
    }

    pub fn grbg() -> Self {
        Self { width: 2, height: 2, cells: vec![1, 0, 2, 1] }
    }

    pub fn gbrg() -> Self {
        Self { width: 2, height: 2, cells: vec![1, 2, 0, 1] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn color_at(&self, row: usize, col: usize) -> usize {
        self.cells[(row % self.height) * self.width + col % self.width] as usize
    }

    /// Splits greens that share a row with blue into a fourth color. Patterns that already
    /// use color 3 are returned unchanged.
    pub fn four_color(&self) -> FilterPattern {
        if self.cells.contains(&3) {
            return self.clone();
        }
        let mut cells = self.cells.clone();
        for row in 0..self.height {
            let line = &mut cells[row * self.width..(row + 1) * self.width];
            if line.contains(&2) {
                for c in line.iter_mut().filter(|c| **c == 1) {
                    *c = 3;
                }
            }
        }
        FilterPattern { width: self.width, height: self.height, cells }
    }

    /// Maps the fourth color back onto green.
    pub fn three_color(&self) -> FilterPattern {
        let cells = self.cells.iter().map(|&c| if c == 3 { 1 } else { c }).collect();
        FilterPattern { width: self.width, height: self.height, cells }
    }

    /// The 2×2 Bayer arrangement, if this pattern is one.
    pub fn bayer_cells(&self) -> Option<[u8; 4]> {
        let three = self.three_color();
        let base = [
            three.color_at(0, 0) as u8,
            three.color_at(0, 1) as u8,
            three.color_at(1, 0) as u8,
            three.color_at(1, 1) as u8,
        ];
        let repeats = (0..self.height)
            .all(|r| (0..self.width).all(|c| three.color_at(r, c) as u8 == base[(r % 2) * 2 + c % 2]));
        let mut counts = [0usize; 4];
        for c in base {
            counts[c as usize] += 1;
        }
        (repeats && counts == [1, 2, 1, 0]).then_some(base)
    }
}

/// Decoded sensor data plus the calibration constants the pipeline needs.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: usize,
    pub height: usize,
    /// 3 for RGB sensors, 4 for CMYG/RGBE sensors.
    pub colors: usize,
    /// `None` for sensors that deliver full-color pixels.
    pub filters: Option<FilterPattern>,
    /// Samples per pixel: 1 for mosaics, `colors` otherwise.
    pub cpp: usize,
    pub black: [u16; 4],
    pub white: [u16; 4],
    pub pre_mul: [f32; 4],
    pub cam_mul: Option<[f32; 4]>,
    /// Sensor to linear sRGB.
    pub rgb_cam: [[f32; 4]; 3],
    pub make: String,
    pub model: String,
    pub orientation: FlipCode,
    pub pixel_aspect: f64,
    pub fuji_width: usize,
    pub fuji_step: f64,
    pub data: Vec<u16>,
}

impl RawFrame {
    /// A mosaic frame with neutral calibration.
    pub fn from_mosaic(
        width: usize,
        height: usize,
        pattern: FilterPattern,
        black: u16,
        white: u16,
        data: Vec<u16>,
    ) -> Result<Self> {
        let frame = Self {
            width,
            height,
            colors: 3,
            filters: Some(pattern),
            cpp: 1,
            black: [black; 4],
            white: [white; 4],
            pre_mul: [1.0; 4],
            cam_mul: None,
            rgb_cam: identity_rgb_cam(3),
            make: String::new(),
            model: String::new(),
            orientation: FlipCode::NONE,
            pixel_aspect: 1.0,
            fuji_width: 0,
            fuji_step: 1.0,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidDimensions(self.width, self.height));
        }
        if self.colors != 3 && self.colors != 4 {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{} color sensor",
                self.colors
            )));
        }
        let expected_cpp = if self.filters.is_some() { 1 } else { self.colors };
        if self.cpp != expected_cpp || self.data.len() != self.width * self.height * self.cpp {
            return Err(PipelineError::InvalidDimensions(self.width, self.height));
        }
        Ok(())
    }

    /// Largest white level over all colors.
    pub fn rgb_max(&self) -> u16 {
        self.white.iter().copied().max().unwrap_or(0xFFFF)
    }

    /// Largest black level over all colors.
    pub fn black_max(&self) -> u16 {
        self.black.iter().copied().max().unwrap_or(0)
    }

    /// Channels of the half-size raw cells: 4 for any mosaic, `colors` otherwise.
    pub fn raw_colors(&self) -> usize {
        if self.filters.is_some() { 4 } else { self.colors }
    }

    /// Filter pattern with greens split into a fourth color, matching the raw cells.
    pub fn four_color_filters(&self) -> Option<FilterPattern> {
        self.filters.as_ref().map(FilterPattern::four_color)
    }

    /// Dimensions of the raw phase buffer.
    pub fn raw_dimensions(&self) -> (usize, usize) {
        if self.filters.is_some() {
            ((self.width + 1) / 2, (self.height + 1) / 2)
        } else {
            (self.width, self.height)
        }
    }

    /// Packs the samples into the raw phase layout: one 4-channel cell per 2×2 mosaic
    /// block, or one pixel per sensor pixel when there is no filter array.
    pub fn to_raw_image(&self) -> Image16 {
        let (rw, rh) = self.raw_dimensions();
        let colors = self.raw_colors();
        let mut image = Image16::new(rw, rh, colors);
        match self.four_color_filters() {
            Some(f4) => {
                for row in 0..self.height {
                    let src = &self.data[row * self.width..(row + 1) * self.width];
                    let cells = image.row_mut(row / 2);
                    for (col, &v) in src.iter().enumerate() {
                        cells[col / 2][f4.color_at(row, col)] = v;
                    }
                }
            }
            None => {
                for (dst, src) in image.pixels.iter_mut().zip(self.data.chunks_exact(self.cpp)) {
                    dst[..self.cpp].copy_from_slice(src);
                }
            }
        }
        image
    }
}
