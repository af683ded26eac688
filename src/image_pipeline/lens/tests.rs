use super::*;
use crate::image_pipeline::common::image::{Image16, Rgb8Image};

struct MockDatabase {
    profile: Option<LensProfile>,
}

impl LensDatabase for MockDatabase {
    fn find_lens(&self, _make: &str, _model: &str, _lens: &str) -> Option<LensProfile> {
        self.profile.clone()
    }
}

fn zoom_profile() -> LensProfile {
    LensProfile {
        maker: "Nikon".to_string(),
        model: "AF-S 18-55mm".to_string(),
        mounts: vec!["NIKON".to_string()],
        distortion: vec![
            DistortionCalib { focal: 55.0, model: DistortionModel::Poly3 { k1: 0.01 } },
            DistortionCalib { focal: 18.0, model: DistortionModel::Poly3 { k1: -0.03 } },
        ],
        vignetting: vec![
            VignettingCalib { focal: 18.0, aperture: 3.5, distance: 10.0, model: VignettingModel::Pa { k1: -0.5, k2: 0.1, k3: 0.0 } },
            VignettingCalib { focal: 55.0, aperture: 5.6, distance: 10.0, model: VignettingModel::Pa { k1: -0.2, k2: 0.0, k3: 0.0 } },
        ],
        tca: vec![TcaCalib { focal: 18.0, model: TcaModel::Linear { kr: 1.001, kb: 0.999 } }],
    }
}

fn gradient(width: usize, height: usize) -> Image16 {
    let pixels = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            [(x * 1000) as u16, (y * 1000) as u16, 30000, 0]
        })
        .collect();
    Image16::from_pixels(width, height, 3, pixels)
}

#[test]
fn test_distortion_interpolates_in_focal_length() {
    let calib = zoom_profile().interpolate(36.5, 8.0, 10.0);
    match calib.distortion {
        DistortionModel::Poly3 { k1 } => assert!((k1 - (-0.01)).abs() < 1e-12),
        other => panic!("unexpected model {:?}", other),
    }
    assert_eq!(
        zoom_profile().interpolate(10.0, 8.0, 10.0).distortion,
        DistortionModel::Poly3 { k1: -0.03 }
    );
    assert_eq!(
        zoom_profile().interpolate(200.0, 8.0, 10.0).distortion,
        DistortionModel::Poly3 { k1: 0.01 }
    );
}

#[test]
fn test_vignetting_exact_match_and_blend() {
    let profile = zoom_profile();
    assert_eq!(
        profile.interpolate(18.0, 3.5, 10.0).vignetting,
        VignettingModel::Pa { k1: -0.5, k2: 0.1, k3: 0.0 }
    );
    let VignettingModel::Pa { k1, .. } = profile.interpolate(30.0, 4.5, 10.0).vignetting else {
        panic!("expected a blended vignetting model");
    };
    assert!(k1 > -0.5 && k1 < -0.2);
}

#[test]
fn test_distortion_models_fix_unit_radius() {
    let models = [
        DistortionModel::Poly3 { k1: 0.05 },
        DistortionModel::PtLens { a: 0.01, b: -0.02, c: 0.03 },
    ];
    for model in models {
        assert!((model.distort(1.0) - 1.0).abs() < 1e-12);
        assert_eq!(model.distort(0.0), 0.0);
    }
    assert!((DistortionModel::Poly5 { k1: 0.1, k2: 0.0 }.distort(1.0) - 1.1).abs() < 1e-12);
}

#[test]
fn test_identity_modifier_preserves_image() {
    let modifier = LensModifier::new(LensCalibration::default(), 9, 7, 0.0);
    assert!(!modifier.is_active());
    let src = gradient(9, 7);
    assert_eq!(modifier.remap(&src), src);
}

#[test]
fn test_center_pixel_is_fixed() {
    let calib = LensCalibration { distortion: DistortionModel::Poly3 { k1: 0.2 }, ..Default::default() };
    let modifier = LensModifier::new(calib, 11, 11, 0.0);
    assert!(modifier.has_geometry());
    for (x, y) in modifier.source_coords(5.0, 5.0) {
        assert_eq!((x, y), (5.0, 5.0));
    }
    let src = gradient(11, 11);
    let out = modifier.remap(&src);
    assert_eq!(out.pixel(5, 5), src.pixel(5, 5));
}

#[test]
fn test_barrel_correction_samples_outward() {
    let calib = LensCalibration { distortion: DistortionModel::Poly5 { k1: 0.1, k2: 0.0 }, ..Default::default() };
    let modifier = LensModifier::new(calib, 101, 101, 0.0);
    let [(_, _), (gx, _), (_, _)] = modifier.source_coords(100.0, 50.0);
    assert!(gx > 100.0);
}

#[test]
fn test_scale_magnifies() {
    let modifier = LensModifier::new(LensCalibration::default(), 101, 101, 1.0);
    assert!(modifier.has_geometry());
    let [(x, y), ..] = modifier.source_coords(100.0, 50.0);
    assert!((x - 75.0).abs() < 1e-4 && (y - 50.0).abs() < 1e-4);
}

#[test]
fn test_tca_separates_channels() {
    let calib = LensCalibration { tca: TcaModel::Linear { kr: 1.01, kb: 0.99 }, ..Default::default() };
    let modifier = LensModifier::new(calib, 101, 101, 0.0);
    let [(rx, _), (gx, _), (bx, _)] = modifier.source_coords(100.0, 50.0);
    assert!(rx > gx && gx > bx);
    assert!((gx - 100.0).abs() < 1e-4);
}

#[test]
fn test_vignetting_gain_brightens_corners() {
    let calib = LensCalibration { vignetting: VignettingModel::Pa { k1: -0.1, k2: 0.0, k3: 0.0 }, ..Default::default() };
    let modifier = LensModifier::new(calib, 100, 60, 0.0);
    assert!(modifier.has_vignetting() && !modifier.has_geometry());
    let center = modifier.vignetting_gain(49.5, 29.5);
    let corner = modifier.vignetting_gain(0.0, 0.0);
    assert!((center - 1.0).abs() < 1e-6);
    assert!(corner > 1.0);

    let mut row = vec![0.0; 100];
    modifier.vignetting_row(0, 0, &mut row);
    assert_eq!(row[0], corner);
}

#[test]
fn test_lanczos_exact_at_integer_positions_and_zero_outside() {
    let src = gradient(8, 8);
    assert_eq!(sample(&src, 3.0, 4.0, 0), 3000);
    assert_eq!(sample(&src, 0.0, 0.0, 2), 30000);
    assert_eq!(sample(&src, -3.0, 2.0, 0), 0);
    let mid = sample(&src, 3.5, 4.0, 0);
    assert!((3400..=3600).contains(&mid), "{}", mid);
}

#[test]
fn test_remap_eight_bit_image() {
    let calib = LensCalibration { distortion: DistortionModel::Poly3 { k1: 0.05 }, ..Default::default() };
    let modifier = LensModifier::new(calib, 16, 16, 0.0);
    let src = Rgb8Image::from_pixels(16, 16, 3, vec![[200, 100, 50]; 256]);
    let out = modifier.remap(&src);
    assert_eq!(out.pixel(8, 8), &[200, 100, 50]);
}

#[test]
fn test_source_bounds_cover_the_rectangle() {
    let calib = LensCalibration { distortion: DistortionModel::Poly3 { k1: 0.1 }, ..Default::default() };
    let modifier = LensModifier::new(calib, 64, 48, 0.0);
    let (l, t, r, b) = modifier.source_bounds(16, 12, 16, 12);
    assert!(l <= 16 && t <= 12 && r >= 32 && b >= 24);
    assert!(r <= 64 && b <= 48);
}

#[test]
fn test_modifier_from_database() {
    let settings = LensSettings { lens: Some("AF-S 18-55mm".to_string()), focal_length: 18.0, ..Default::default() };
    let db = MockDatabase { profile: Some(zoom_profile()) };
    let modifier = LensModifier::from_database(&db, "NIKON", "D70", &settings, 64, 48).unwrap();
    assert!(modifier.has_geometry());
    assert_eq!(modifier.dimensions(), (64, 48));

    let missing = MockDatabase { profile: None };
    assert!(LensModifier::from_database(&missing, "NIKON", "D70", &settings, 64, 48).is_none());
    let no_lens = LensSettings::default();
    assert!(LensModifier::from_database(&db, "NIKON", "D70", &no_lens, 64, 48).is_none());
}

#[test]
fn test_static_database_matches_names_and_mounts() {
    let json = serde_json::to_string(&vec![zoom_profile()]).unwrap();
    let db = StaticLensDatabase::from_json(&json).unwrap();
    assert_eq!(db.len(), 1);
    assert!(db.find_lens("NIKON", "D70", "af-s 18-55mm").is_some());
    assert!(db.find_lens("nikon", "D70", "Nikon  AF-S 18-55mm").is_some());
    assert!(db.find_lens("Canon", "EOS 5D", "AF-S 18-55mm").is_none());
    assert!(StaticLensDatabase::from_json("not json").is_err());
}

#[test]
fn test_static_database_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lenses.json");
    std::fs::write(&path, serde_json::to_string(&vec![zoom_profile()]).unwrap()).unwrap();
    assert_eq!(StaticLensDatabase::load(&path).unwrap().len(), 1);
    assert!(StaticLensDatabase::load(&dir.path().join("missing.json")).is_err());
}
