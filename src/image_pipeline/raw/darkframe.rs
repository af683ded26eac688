//! Dark frame subtraction
//!
//! A dark frame is a shot with the lens cap on. Its strongest samples mark hot sensor
//! sites; everything below the per-channel threshold is bias noise and is ignored.

use tracing::{debug, info};

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::raw::normalize::scale_to_full_range;
use crate::image_pipeline::raw::types::RawFrame;

/// Fraction of samples, per channel, treated as hot: one in ten thousand.
const HOT_FRACTION: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Darkframe {
    pub name: String,
    /// Raw cells in the same layout as the primary frame's raw phase.
    pub cells: Image16,
    pub black: [u16; 4],
    pub thresholds: [u16; 4],
}

impl Darkframe {
    /// Normalizes `frame` and checks it against the primary frame's geometry.
    pub fn new(name: impl Into<String>, mut frame: RawFrame, primary: &RawFrame) -> Result<Self> {
        let name = name.into();
        if frame.width != primary.width
            || frame.height != primary.height
            || frame.colors != primary.colors
            || frame.filters.is_some() != primary.filters.is_some()
        {
            return Err(PipelineError::DarkframeMismatch(format!(
                "{}: {}x{} {} colors, expected {}x{} {} colors",
                name,
                frame.width,
                frame.height,
                frame.colors,
                primary.width,
                primary.height,
                primary.colors
            )));
        }
        scale_to_full_range(&mut frame);
        let cells = frame.to_raw_image();
        let thresholds = hot_thresholds(&cells);
        debug!("Darkframe {} thresholds {:?}", name, thresholds);
        Ok(Self {
            name,
            cells,
            black: frame.black,
            thresholds,
        })
    }

    /// Subtracts the dark signal of hot sites from the raw cells.
    pub fn subtract(&self, raw: &mut Image16) -> Result<()> {
        if raw.width != self.cells.width || raw.height != self.cells.height {
            return Err(PipelineError::DarkframeMismatch(self.name.clone()));
        }
        let colors = raw.colors;
        let mut subtracted = 0usize;
        for (px, dark) in raw.pixels.iter_mut().zip(&self.cells.pixels) {
            for c in 0..colors {
                if dark[c] >= self.thresholds[c] {
                    px[c] = px[c].saturating_sub(dark[c].saturating_sub(self.black[c]));
                    subtracted += 1;
                }
            }
        }
        info!("Darkframe {} subtracted at {} sites", self.name, subtracted);
        Ok(())
    }
}

/// Per-channel level at or above which the top `1/HOT_FRACTION` of samples lie.
pub(crate) fn hot_thresholds(cells: &Image16) -> [u16; 4] {
    let point = cells.pixels.len() / HOT_FRACTION;
    let mut thresholds = [0xFFFFu16; 4];
    for (c, threshold) in thresholds.iter_mut().enumerate().take(cells.colors) {
        let mut histogram = vec![0usize; 0x10000];
        for px in &cells.pixels {
            histogram[px[c] as usize] += 1;
        }
        let mut sum = 0usize;
        let mut level = 0x10000usize;
        while level > 0 && sum < point.max(1) {
            level -= 1;
            sum += histogram[level];
        }
        *threshold = level as u16;
    }
    thresholds
}
