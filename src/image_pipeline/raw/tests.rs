use rawloader::Orientation;

use crate::image_pipeline::common::error::PipelineError;
use crate::image_pipeline::geometry::FlipCode;
use crate::image_pipeline::raw::darkframe::hot_thresholds;
use crate::image_pipeline::raw::rawloader_reader::{color_matrix, flip_from_orientation};
use crate::image_pipeline::raw::{
    Darkframe, FilterPattern, RawFrame, RawImageReader, RawLoaderReader, scale_to_full_range,
};

fn flat_frame(width: usize, height: usize, value: u16, white: u16) -> RawFrame {
    RawFrame::from_mosaic(
        width,
        height,
        FilterPattern::rggb(),
        0,
        white,
        vec![value; width * height],
    )
    .unwrap()
}

#[test]
fn test_four_color_split_marks_blue_row_greens() {
    let f4 = FilterPattern::rggb().four_color();
    assert_eq!(f4.color_at(0, 0), 0);
    assert_eq!(f4.color_at(0, 1), 1);
    assert_eq!(f4.color_at(1, 0), 3);
    assert_eq!(f4.color_at(1, 1), 2);
    assert_eq!(f4.three_color(), FilterPattern::rggb());
    assert_eq!(f4.color_at(3, 2), 3);
}

#[test]
fn test_bayer_cells_detection() {
    assert_eq!(FilterPattern::gbrg().bayer_cells(), Some([1, 2, 0, 1]));
    let cmyg = FilterPattern::new(2, 2, vec![0, 1, 3, 2]).unwrap();
    assert_eq!(cmyg.bayer_cells(), Some([0, 1, 1, 2]));
    let wide = FilterPattern::new(2, 4, vec![0, 1, 3, 2, 1, 0, 2, 3]).unwrap();
    assert_eq!(wide.bayer_cells(), None);
}

#[test]
fn test_xtrans_pattern_is_rejected() {
    #[rustfmt::skip]
    let xtrans = vec![
        1, 1, 0, 1, 1, 2,
        1, 1, 2, 1, 1, 0,
        2, 0, 1, 0, 2, 1,
        1, 1, 2, 1, 1, 0,
        1, 1, 0, 1, 1, 2,
        0, 2, 1, 2, 0, 1,
    ];
    let err = FilterPattern::new(6, 6, xtrans).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
    assert!(FilterPattern::new(3, 2, vec![0; 6]).is_err());
}

#[test]
fn test_raw_image_packs_cells() {
    let data = vec![
        10, 20, 11, 21, //
        30, 40, 31, 41, //
        12, 22, 13, 23, //
        32, 42, 33, 43,
    ];
    let frame = RawFrame::from_mosaic(4, 4, FilterPattern::rggb(), 0, 4095, data).unwrap();
    let raw = frame.to_raw_image();
    assert_eq!((raw.width, raw.height, raw.colors), (2, 2, 4));
    assert_eq!(*raw.pixel(0, 0), [10, 20, 40, 30]);
    assert_eq!(*raw.pixel(1, 1), [13, 23, 43, 33]);
}

#[test]
fn test_raw_image_odd_dimensions() {
    let frame = flat_frame(5, 3, 7, 4095);
    let raw = frame.to_raw_image();
    assert_eq!((raw.width, raw.height), (3, 2));
    // Last cell only has the red sample of its first row.
    assert_eq!(*raw.pixel(2, 1), [7, 0, 0, 0]);
}

#[test]
fn test_frame_validation() {
    let result = RawFrame::from_mosaic(4, 4, FilterPattern::rggb(), 0, 4095, vec![0; 15]);
    assert!(matches!(result, Err(PipelineError::InvalidDimensions(4, 4))));
}

#[test]
fn test_scale_to_full_range_is_idempotent() {
    let mut frame = flat_frame(4, 4, 1000, 4095);
    frame.black = [64; 4];

    assert_eq!(scale_to_full_range(&mut frame), 16);
    assert_eq!(frame.white, [65520; 4]);
    assert_eq!(frame.black, [1024; 4]);
    assert!(frame.data.iter().all(|&v| v == 16000));

    let snapshot = frame.clone();
    assert_eq!(scale_to_full_range(&mut frame), 1);
    assert_eq!(frame.data, snapshot.data);
    assert_eq!(frame.black, snapshot.black);
    assert_eq!(frame.white, snapshot.white);
}

#[test]
fn test_scale_to_full_range_clamps_overshoot() {
    let mut frame = flat_frame(2, 2, 4095, 4000);
    assert_eq!(scale_to_full_range(&mut frame), 16);
    assert!(frame.data.iter().all(|&v| v == 0xFFFF));
}

#[test]
fn test_orientation_mapping() {
    assert_eq!(flip_from_orientation(Orientation::Normal), FlipCode::NONE);
    assert_eq!(flip_from_orientation(Orientation::Rotate180), FlipCode::new(3));
    assert_eq!(flip_from_orientation(Orientation::Rotate90), FlipCode::new(6));
    assert_eq!(flip_from_orientation(Orientation::Rotate270), FlipCode::new(5));
    assert_eq!(flip_from_orientation(Orientation::Unknown), FlipCode::NONE);
}

#[test]
fn test_color_matrix_for_srgb_camera() {
    // A camera whose sensor is sRGB has xyz_to_cam = XYZ_TO_SRGB.
    let mut xyz_to_cam = [[0.0f32; 3]; 4];
    let srgb = crate::image_pipeline::common::matrix::XYZ_TO_SRGB;
    for i in 0..3 {
        for j in 0..3 {
            xyz_to_cam[i][j] = srgb[i][j] as f32;
        }
    }
    let (rgb_cam, pre_mul) = color_matrix(&xyz_to_cam, 3);
    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((rgb_cam[i][j] - expected).abs() < 1e-3, "{:?}", rgb_cam);
        }
        assert!((pre_mul[i] - 1.0).abs() < 1e-2);
    }
}

#[test]
fn test_color_matrix_unknown_camera() {
    let (rgb_cam, pre_mul) = color_matrix(&[[0.0; 3]; 4], 3);
    assert_eq!(rgb_cam[0][0], 1.0);
    assert_eq!(rgb_cam[0][1], 0.0);
    assert_eq!(pre_mul, [1.0; 4]);
}

#[test]
fn test_reader_rejects_garbage() {
    let result = RawLoaderReader.read_raw(b"definitely not a raw file");
    assert!(matches!(result, Err(PipelineError::DecodeError(_))));
}

#[test]
fn test_reader_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = RawLoaderReader.open(&dir.path().join("missing.arw"));
    assert!(matches!(result, Err(PipelineError::InputReadError(_))));
}

#[test]
fn test_darkframe_geometry_mismatch() {
    let primary = flat_frame(8, 8, 100, 0xFFFF);
    let dark = flat_frame(8, 6, 100, 0xFFFF);
    let result = Darkframe::new("dark", dark, &primary);
    assert!(matches!(result, Err(PipelineError::DarkframeMismatch(_))));
}

#[test]
fn test_darkframe_subtracts_only_hot_sites() {
    let primary = flat_frame(200, 200, 1000, 0xFFFF);
    let mut dark = flat_frame(200, 200, 50, 0xFFFF);
    dark.black = [50; 4];
    // Red sample of cell (3, 2).
    dark.data[4 * 200 + 6] = 5000;
    let darkframe = Darkframe::new("dark", dark, &primary).unwrap();
    assert_eq!(darkframe.thresholds[0], 5000);

    let mut raw = primary.to_raw_image();
    darkframe.subtract(&mut raw).unwrap();
    assert_eq!(raw.pixel(3, 2)[0], 0);
    assert_eq!(raw.pixel(3, 2)[1], 1000);
    assert_eq!(raw.pixel(0, 0)[0], 1000);
}

#[test]
fn test_hot_thresholds_of_flat_channel() {
    let frame = flat_frame(4, 4, 300, 0xFFFF);
    let thresholds = hot_thresholds(&frame.to_raw_image());
    assert_eq!(thresholds, [300; 4]);
}
