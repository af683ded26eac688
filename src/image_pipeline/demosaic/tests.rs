use crate::image_pipeline::common::error::PipelineError;
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::demosaic::{
    FinalizeParams, Interpolation, WB_UNITY, choose_scale, finalize, fuji_unskew, interpolate,
    shrink,
};
use crate::image_pipeline::raw::{FilterPattern, RawFrame};

const UNITY: [u32; 4] = [WB_UNITY; 4];

/// RGGB mosaic where every 2×2 block reads `[r, g1, g2, b]`.
fn bayer_frame(width: usize, height: usize, block: [u16; 4], black: u16) -> RawFrame {
    let data = (0..height)
        .flat_map(|row| (0..width).map(move |col| block[(row % 2) * 2 + col % 2]))
        .collect();
    RawFrame::from_mosaic(width, height, FilterPattern::rggb(), black, 0xFFFF, data).unwrap()
}

fn interior(image: &Image16, border: usize) -> impl Iterator<Item = &[u16; 4]> {
    let (w, h) = (image.width, image.height);
    image
        .pixels
        .iter()
        .enumerate()
        .filter(move |(i, _)| {
            let (y, x) = (i / w, i % w);
            y >= border && y + border < h && x >= border && x + border < w
        })
        .map(|(_, p)| p)
}

#[test]
fn test_shrink_by_two_averages_blocks() {
    let frame = bayer_frame(4, 4, [100, 140, 160, 200], 0);
    let out = shrink(&frame.to_raw_image(), &frame, 2, UNITY);
    assert_eq!((out.width, out.height, out.colors), (2, 2, 3));
    assert!(out.pixels.iter().all(|p| *p == [100, 150, 200, 0]));
}

#[test]
fn test_shrink_subtracts_black_and_clamps() {
    let frame = bayer_frame(4, 4, [100, 140, 160, 20], 50);
    let out = shrink(&frame.to_raw_image(), &frame, 2, UNITY);
    assert_eq!(out.pixels[0], [50, 100, 0, 0]);
}

#[test]
fn test_shrink_applies_gains() {
    let frame = bayer_frame(4, 4, [100, 150, 150, 200], 0);
    let gains = [2 * WB_UNITY, WB_UNITY, WB_UNITY, WB_UNITY / 2];
    let out = shrink(&frame.to_raw_image(), &frame, 2, gains);
    assert_eq!(out.pixels[3], [200, 150, 100, 0]);
}

#[test]
fn test_shrink_odd_scale_uses_mosaic() {
    let frame = bayer_frame(7, 6, [100, 140, 160, 200], 0);
    let out = shrink(&frame.to_raw_image(), &frame, 3, UNITY);
    assert_eq!((out.width, out.height), (2, 2));
    assert!(out.pixels.iter().all(|p| *p == [100, 150, 200, 0]));
}

#[test]
fn test_shrink_by_four() {
    let frame = bayer_frame(9, 8, [10, 20, 20, 30], 0);
    let out = shrink(&frame.to_raw_image(), &frame, 4, UNITY);
    assert_eq!((out.width, out.height), (2, 2));
    assert_eq!(out.pixels[0], [10, 20, 30, 0]);
}

#[test]
fn test_interpolation_keeps_flat_fields() {
    let frame = bayer_frame(12, 10, [100, 150, 150, 200], 0);
    let raw = frame.to_raw_image();
    for algorithm in [
        Interpolation::Bilinear,
        Interpolation::Vng,
        Interpolation::Ahd,
        Interpolation::FourColor,
    ] {
        let out = interpolate(&raw, &frame, algorithm, UNITY).unwrap();
        assert_eq!((out.width, out.height, out.colors), (12, 10, 3));
        for p in interior(&out, 1) {
            assert_eq!(&p[..3], &[100, 150, 200], "{:?}", algorithm);
        }
    }
}

#[test]
fn test_interpolation_keeps_own_samples() {
    let frame = bayer_frame(8, 8, [1000, 3000, 3000, 500], 0);
    let out = interpolate(&frame.to_raw_image(), &frame, Interpolation::Ahd, UNITY).unwrap();
    assert_eq!(out.pixel(2, 2)[0], 1000);
    assert_eq!(out.pixel(3, 3)[2], 500);
    assert_eq!(out.pixel(3, 2)[1], 3000);
}

#[test]
fn test_interpolation_applies_gains_and_black() {
    let frame = bayer_frame(8, 8, [150, 250, 250, 350], 50);
    let gains = [2 * WB_UNITY, WB_UNITY, WB_UNITY, WB_UNITY];
    let out = interpolate(&frame.to_raw_image(), &frame, Interpolation::Vng, gains).unwrap();
    for p in interior(&out, 2) {
        assert_eq!(&p[..3], &[200, 200, 300]);
    }
}

#[test]
fn test_vertical_edge_stays_sharp_with_vng() {
    // Left half dark, right half bright gray.
    let data = (0..10)
        .flat_map(|_row| (0..10).map(|col| if col < 5 { 1000 } else { 9000 }))
        .collect();
    let frame = RawFrame::from_mosaic(10, 10, FilterPattern::rggb(), 0, 0xFFFF, data).unwrap();
    let out = interpolate(&frame.to_raw_image(), &frame, Interpolation::Vng, UNITY).unwrap();
    let left = out.pixel(2, 4);
    let right = out.pixel(7, 4);
    assert!(left.iter().take(3).all(|&v| v == 1000), "{:?}", left);
    assert!(right.iter().take(3).all(|&v| v == 9000), "{:?}", right);
}

#[test]
fn test_interpolation_requires_filters() {
    let mut frame = bayer_frame(4, 4, [1, 2, 2, 3], 0);
    frame.filters = None;
    frame.cpp = 3;
    frame.data = vec![0; 48];
    let result = interpolate(&frame.to_raw_image(), &frame, Interpolation::Ahd, UNITY);
    assert!(matches!(result, Err(PipelineError::NoColorFilterArray)));

    // Finalize goes through the shrink path instead.
    let params = FinalizeParams { interpolation: Interpolation::Ahd, scale: 1, gains: UNITY };
    let out = finalize(&frame.to_raw_image(), &frame, &params).unwrap();
    assert_eq!((out.width, out.height), (4, 4));
}

#[test]
fn test_finalize_modes() {
    let frame = bayer_frame(8, 6, [100, 140, 160, 200], 0);
    let raw = frame.to_raw_image();
    let full = finalize(&raw, &frame, &FinalizeParams { interpolation: Interpolation::Bilinear, scale: 1, gains: UNITY }).unwrap();
    assert_eq!((full.width, full.height), (8, 6));
    let half = finalize(&raw, &frame, &FinalizeParams { interpolation: Interpolation::Half, scale: 2, gains: UNITY }).unwrap();
    assert_eq!((half.width, half.height), (4, 3));
}

#[test]
fn test_choose_scale() {
    assert_eq!(choose_scale(4, 0, Interpolation::Ahd, true, 1.0, 0), 4);
    assert_eq!(choose_scale(4, 0, Interpolation::Ahd, true, 0.5, 0), 2);
    assert_eq!(choose_scale(1, 0, Interpolation::Half, true, 1.0, 0), 2);
    assert_eq!(choose_scale(1, 500, Interpolation::Ahd, true, 1.0, 1000), 2);
    assert_eq!(choose_scale(1, 600, Interpolation::Ahd, true, 1.0, 1000), 1);
    assert_eq!(choose_scale(1, 500, Interpolation::Ahd, false, 1.0, 1000), 1);
    assert_eq!(choose_scale(1, 0, Interpolation::Vng, true, 1.0, 1000), 1);
}

#[test]
fn test_fuji_unskew() {
    let mut image = Image16::from_pixels(8, 8, 3, vec![[500, 600, 700, 0]; 64]);
    let before = image.clone();
    fuji_unskew(&mut image, 0, 0.5f64.sqrt());
    assert_eq!(image, before);
    fuji_unskew(&mut image, 4, 1.0);
    assert_eq!(image, before);

    fuji_unskew(&mut image, 4, 0.5f64.sqrt());
    assert_eq!((image.width, image.height), (5, 5));
    assert_eq!(image.pixel(0, 0)[..3], [500, 600, 700]);
}

#[test]
fn test_interpolation_names_parse() {
    for algorithm in [
        Interpolation::Ahd,
        Interpolation::Vng,
        Interpolation::FourColor,
        Interpolation::Bilinear,
        Interpolation::Half,
    ] {
        assert_eq!(algorithm.name().parse::<Interpolation>(), Ok(algorithm));
    }
    assert!("ppg".parse::<Interpolation>().is_err());
}
