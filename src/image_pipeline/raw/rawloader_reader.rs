//! RAW decoding through the rawloader library.
//!
//! Supports whatever rawloader can decode (ARW, CR2, NEF, DNG, ...). The decoder's crop is
//! applied, its XYZ→camera matrix is turned into a sensor→sRGB matrix and its EXIF
//! orientation into a flip code.

use std::io::Cursor;

use rawloader::{Orientation, RawImageData as RawloaderImageData};
use tracing::{debug, warn};

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::common::matrix::{SRGB_TO_XYZ, identity_rgb_cam, pseudoinverse};
use crate::image_pipeline::geometry::FlipCode;
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{FilterPattern, RawFrame};

/// RAW image reader backed by rawloader.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLoaderReader;

impl RawImageReader for RawLoaderReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| PipelineError::DecodeError(e.to_string()))?;

        let [top, right, bottom, left] = decoded.crops;
        let width = decoded.width.saturating_sub(left + right);
        let height = decoded.height.saturating_sub(top + bottom);
        let cpp = decoded.cpp;
        debug!(
            "Decoded {} {}: {}x{} (cropped {}x{}), cpp={}",
            decoded.clean_make, decoded.clean_model, decoded.width, decoded.height, width, height, cpp
        );

        let samples: Vec<u16> = match &decoded.data {
            RawloaderImageData::Integer(values) => values.clone(),
            // Float data is normalized to 0.0-1.0
            RawloaderImageData::Float(values) => values
                .iter()
                .map(|&v| (v * u16::MAX as f32).clamp(0.0, u16::MAX as f32) as u16)
                .collect(),
        };
        let stride = decoded.width * cpp;
        if samples.len() < decoded.height * stride {
            return Err(PipelineError::DecodeError(format!(
                "{} samples for a {}x{} image",
                samples.len(),
                decoded.width,
                decoded.height
            )));
        }
        let mut data = Vec::with_capacity(width * height * cpp);
        for row in top..top + height {
            let start = row * stride + left * cpp;
            data.extend_from_slice(&samples[start..start + width * cpp]);
        }

        let (filters, colors) = match cpp {
            1 => {
                if decoded.cfa.width == 0 || decoded.cfa.height == 0 {
                    return Err(PipelineError::UnsupportedFormat(
                        "monochrome sensors are not supported".to_string(),
                    ));
                }
                let (pw, ph) = (decoded.cfa.width, decoded.cfa.height);
                let cells = (0..ph)
                    .flat_map(|r| (0..pw).map(move |c| (r, c)))
                    .map(|(r, c)| decoded.cfa.color_at(r + top, c + left) as u8)
                    .collect::<Vec<_>>();
                let colors = if cells.contains(&3) { 4 } else { 3 };
                (Some(FilterPattern::new(pw, ph, cells)?), colors)
            }
            3 => (None, 3),
            n => {
                return Err(PipelineError::UnsupportedFormat(format!(
                    "{} samples per pixel",
                    n
                )));
            }
        };

        let mut black = decoded.blacklevels;
        let mut white = decoded.whitelevels;
        if colors == 3 {
            black[3] = black[1];
            white[3] = white[1];
        }

        let (rgb_cam, pre_mul) = color_matrix(&decoded.xyz_to_cam, colors);
        let cam_mul = camera_multipliers(&decoded.wb_coeffs, colors);
        if cam_mul.is_none() {
            debug!("No usable camera white balance coefficients");
        }

        let frame = RawFrame {
            width,
            height,
            colors,
            filters,
            cpp,
            black,
            white,
            pre_mul,
            cam_mul,
            rgb_cam,
            make: decoded.clean_make.clone(),
            model: decoded.clean_model.clone(),
            orientation: flip_from_orientation(decoded.orientation),
            pixel_aspect: 1.0,
            fuji_width: 0,
            fuji_step: 1.0,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }
}

/// EXIF orientation to the flip code applied when leaving the sensor layout.
pub(crate) fn flip_from_orientation(orientation: Orientation) -> FlipCode {
    let code = match orientation {
        Orientation::Normal | Orientation::Unknown => 0,
        Orientation::HorizontalFlip => 1,
        Orientation::VerticalFlip => 2,
        Orientation::Rotate180 => 3,
        Orientation::Transpose => 4,
        Orientation::Rotate270 => 5,
        Orientation::Rotate90 => 6,
        Orientation::Transverse => 7,
    };
    FlipCode::new(code)
}

/// Sensor→sRGB matrix and pre-multipliers from the decoder's XYZ→camera matrix.
///
/// Camera rows of `cam_xyz · xyz_rgb` are normalized to one; the reciprocals of the row
/// sums become the pre-multipliers. Unknown cameras get the identity.
pub(crate) fn color_matrix(xyz_to_cam: &[[f32; 3]; 4], colors: usize) -> ([[f32; 4]; 3], [f32; 4]) {
    let mut cam_rgb = [[0.0f64; 3]; 4];
    for i in 0..colors {
        for j in 0..3 {
            cam_rgb[i][j] = (0..3)
                .map(|k| xyz_to_cam[i][k] as f64 * SRGB_TO_XYZ[k][j])
                .sum();
        }
    }
    let mut pre_mul = [1.0f32; 4];
    for i in 0..colors {
        let sum: f64 = cam_rgb[i].iter().sum();
        if !sum.is_finite() || sum.abs() < 1e-9 {
            if xyz_to_cam.iter().take(colors).any(|r| r.iter().any(|&v| v != 0.0)) {
                warn!("Degenerate camera matrix row {}, using identity", i);
            }
            return (identity_rgb_cam(colors), [1.0; 4]);
        }
        for v in cam_rgb[i].iter_mut() {
            *v /= sum;
        }
        pre_mul[i] = (1.0 / sum) as f32;
    }
    let Some(inverse) = pseudoinverse(&cam_rgb, colors) else {
        warn!("Camera matrix is singular, using identity");
        return (identity_rgb_cam(colors), [1.0; 4]);
    };
    let mut rgb_cam = [[0.0f32; 4]; 3];
    for (i, row) in rgb_cam.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate().take(colors) {
            *v = inverse[j][i] as f32;
        }
    }
    if colors == 3 {
        pre_mul[3] = pre_mul[1];
    }
    (rgb_cam, pre_mul)
}

fn camera_multipliers(wb: &[f32; 4], colors: usize) -> Option<[f32; 4]> {
    let mut mul = *wb;
    if colors == 3 {
        mul[3] = mul[1];
    }
    mul.iter()
        .take(colors.max(3))
        .all(|v| v.is_finite() && *v > 0.0)
        .then_some(mul)
}
