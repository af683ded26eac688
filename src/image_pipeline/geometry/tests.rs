use crate::image_pipeline::common::error::PipelineError;
use crate::image_pipeline::common::image::{Image, Image16, Rgb8Image};
use crate::image_pipeline::geometry::{
    CropRect, FlipCode, crop, flip, normalize_rotation, resize, rotate_arbitrary, rotated_dimensions,
    stretch, stretched_dimensions,
};

fn numbered(width: usize, height: usize) -> Image16 {
    let pixels = (0..width * height)
        .map(|i| [i as u16, (i * 3) as u16, (i * 7) as u16, 0])
        .collect();
    Image::from_pixels(width, height, 3, pixels)
}

fn flipped(image: &Image16, code: u8) -> Image16 {
    let mut out = image.clone();
    flip(&mut out, FlipCode::new(code));
    out
}

#[test]
fn test_involutive_flips() {
    for (w, h) in [(4, 3), (5, 7), (1, 6), (3, 3)] {
        let image = numbered(w, h);
        for code in [0, 1, 2, 3, 4, 7] {
            assert_eq!(flipped(&flipped(&image, code), code), image, "code {} on {}x{}", code, w, h);
        }
    }
}

#[test]
fn test_quarter_turns_are_mutual_inverses() {
    for (w, h) in [(4, 3), (5, 7), (2, 9)] {
        let image = numbered(w, h);
        assert_eq!(flipped(&flipped(&image, 5), 6), image);
        assert_eq!(flipped(&flipped(&image, 6), 5), image);
        assert_ne!(flipped(&flipped(&image, 5), 5), image);
    }
}

#[test]
fn test_clockwise_quarter_turn() {
    // a b c       d a
    // d e f  ->   e b
    //             f c
    let image = numbered(3, 2);
    let turned = flipped(&image, 6);
    assert_eq!((turned.width, turned.height), (2, 3));
    let firsts: Vec<u16> = turned.pixels.iter().map(|p| p[0]).collect();
    assert_eq!(firsts, vec![3, 0, 4, 1, 5, 2]);
}

#[test]
fn test_composition_table_matches_pixels() {
    let image = numbered(5, 3);
    for a in 0..8u8 {
        for b in 0..8u8 {
            let composed = FlipCode::new(a).then(FlipCode::new(b));
            assert_eq!(
                flipped(&flipped(&image, a), b),
                flipped(&image, composed.code()),
                "{} then {}",
                a,
                b
            );
        }
        let code = FlipCode::new(a);
        assert!(code.then(code.inverse()).is_identity());
    }
}

#[test]
fn test_flip_generic_over_display_pixels() {
    let mut image = Rgb8Image::from_pixels(2, 1, 3, vec![[1, 2, 3], [4, 5, 6]]);
    flip(&mut image, FlipCode::MIRROR_COLUMNS);
    assert_eq!(image.pixels, vec![[4, 5, 6], [1, 2, 3]]);
}

#[test]
fn test_normalize_rotation() {
    assert_eq!(normalize_rotation(0.0, FlipCode::NONE), (0.0, FlipCode::NONE));
    assert_eq!(normalize_rotation(90.0, FlipCode::NONE), (0.0, FlipCode::new(6)));
    assert_eq!(normalize_rotation(180.0, FlipCode::NONE), (0.0, FlipCode::new(3)));
    assert_eq!(normalize_rotation(450.0, FlipCode::NONE), (0.0, FlipCode::new(6)));

    let (angle, orientation) = normalize_rotation(-10.0, FlipCode::NONE);
    assert!((angle - 80.0).abs() < 1e-9);
    assert_eq!(orientation, FlipCode::new(5));

    let (angle, orientation) = normalize_rotation(100.0, FlipCode::new(6));
    assert!((angle - 10.0).abs() < 1e-9);
    assert_eq!(orientation, FlipCode::HALF_TURN);
}

#[test]
fn test_crop_normalization() {
    let rect = CropRect::new(50, 40, 10, 5).normalized(30, 30);
    assert_eq!(rect, CropRect::new(10, 5, 30, 30));
    assert_eq!(CropRect::new(5, 5, 5, 9).normalized(10, 10), CropRect::full(10, 10));
}

#[test]
fn test_crop_follows_flips() {
    let image = numbered(7, 5);
    let rect = CropRect::new(1, 2, 4, 5);
    for code in 0..8u8 {
        let out = flipped(&image, code);
        let moved = rect.flipped(FlipCode::new(code), 7, 5);
        assert_eq!(moved.normalized(out.width, out.height), moved, "code {}", code);
        assert_eq!(moved.width() * moved.height(), rect.width() * rect.height());

        let mut inside: Vec<u16> = (rect.top..rect.bottom)
            .flat_map(|y| (rect.left..rect.right).map(move |x| (x, y)))
            .map(|(x, y)| image.pixel(x, y)[0])
            .collect();
        let mut moved_inside: Vec<u16> = (moved.top..moved.bottom)
            .flat_map(|y| (moved.left..moved.right).map(move |x| (x, y)))
            .map(|(x, y)| out.pixel(x, y)[0])
            .collect();
        inside.sort_unstable();
        moved_inside.sort_unstable();
        assert_eq!(inside, moved_inside, "code {}", code);
    }
}

#[test]
fn test_crop_rescale_stays_inside() {
    let rect = CropRect::new(10, 10, 99, 77).rescaled((100, 80), (33, 27));
    assert_eq!(rect.normalized(33, 27), rect);
    assert_eq!(rect.left, 3);
    assert_eq!(rect.right, 33);
}

#[test]
fn test_crop_copies_region() {
    let image = numbered(7, 5);
    let out = crop(&image, CropRect::new(2, 1, 5, 3));
    assert_eq!((out.width, out.height), (3, 2));
    assert_eq!(out.pixel(0, 0), image.pixel(2, 1));
    assert_eq!(out.pixel(2, 1), image.pixel(4, 2));
    assert_eq!(crop(&image, CropRect::new(0, 0, 70, 50)), image);
}

#[test]
fn test_rotation_dimensions_and_content() {
    assert_eq!(rotated_dimensions(100, 50, 0.0), (100, 50));
    let (w, h) = rotated_dimensions(100, 50, 30.0);
    assert_eq!(w, (50.0 * 0.5f64 + 100.0 * 0.75f64.sqrt()).ceil() as usize);
    assert_eq!(h, (100.0 * 0.5f64 + 50.0 * 0.75f64.sqrt()).ceil() as usize);

    let flat = Image16::from_pixels(40, 30, 3, vec![[1000, 2000, 3000, 0]; 1200]);
    let rotated = rotate_arbitrary(&flat, 30.0);
    assert_eq!((rotated.width, rotated.height), (w_of(40, 30, 30.0), h_of(40, 30, 30.0)));
    // Corners fall outside the source, the center does not.
    assert_eq!(*rotated.pixel(0, 0), [0; 4]);
    let center = rotated.pixel(rotated.width / 2, rotated.height / 2);
    assert_eq!(&center[..3], &[1000, 2000, 3000]);
}

fn w_of(w: usize, h: usize, a: f64) -> usize {
    rotated_dimensions(w, h, a).0
}

fn h_of(w: usize, h: usize, a: f64) -> usize {
    rotated_dimensions(w, h, a).1
}

#[test]
fn test_zero_rotation_is_identity() {
    let image = numbered(6, 4);
    assert_eq!(rotate_arbitrary(&image, 0.0), image);
}

#[test]
fn test_stretch() {
    assert_eq!(stretched_dimensions(10, 10, 1.0), (10, 10));
    assert_eq!(stretched_dimensions(10, 10, 0.5), (10, 20));
    assert_eq!(stretched_dimensions(10, 10, 2.0), (20, 10));

    let image = Image16::from_pixels(2, 1, 1, vec![[0; 4], [100, 0, 0, 0]]);
    let wide = stretch(&image, 2.0);
    let firsts: Vec<u16> = wide.pixels.iter().map(|p| p[0]).collect();
    assert_eq!(firsts, vec![0, 50, 100, 100]);

    let tall = stretch(&numbered(3, 2), 0.5);
    assert_eq!((tall.width, tall.height), (3, 4));
    assert_eq!(tall.pixel(0, 1)[0], 2);
}

#[test]
fn test_resize_rejects_upscale() {
    let mut image = numbered(8, 6);
    let before = image.clone();
    let err = resize(&mut image, 9).unwrap_err();
    assert!(matches!(err, PipelineError::UpscaleNotSupported { from: 8, to: 9 }));
    assert_eq!(image, before);
}

#[test]
fn test_resize_averages_blocks() {
    let pixels = vec![
        [10, 0, 0, 0], [30, 0, 0, 0], [100, 0, 0, 0], [100, 0, 0, 0],
        [10, 0, 0, 0], [30, 0, 0, 0], [100, 0, 0, 0], [100, 0, 0, 0],
        [0, 8, 0, 0], [0, 8, 0, 0], [4, 0, 0, 0], [4, 0, 0, 0],
        [0, 8, 0, 0], [0, 8, 0, 0], [4, 0, 0, 0], [4, 0, 0, 0],
    ];
    let mut image = Image16::from_pixels(4, 4, 3, pixels);
    resize(&mut image, 2).unwrap();
    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(image.pixels, vec![[20, 0, 0, 0], [100, 0, 0, 0], [0, 8, 0, 0], [4, 0, 0, 0]]);
}

#[test]
fn test_resize_fractional_scale_keeps_mean() {
    let mut image = Image16::from_pixels(9, 6, 3, vec![[900, 450, 90, 0]; 54]);
    resize(&mut image, 4).unwrap();
    assert_eq!((image.width, image.height), (4, 2));
    assert!(image.pixels.iter().all(|p| p[..3] == [900, 450, 90]));
}

#[test]
fn test_resize_keeps_collapsed_edge_one_pixel_long() {
    let mut image = Image16::from_pixels(8, 2, 3, vec![[900, 450, 90, 0]; 16]);
    resize(&mut image, 2).unwrap();
    assert_eq!((image.width, image.height), (2, 1));
    assert!(image.pixels.iter().all(|p| p[..3] == [900, 450, 90]));

    let mut image = numbered(6, 3);
    resize(&mut image, 0).unwrap();
    assert_eq!((image.width, image.height), (1, 1));
}
