use super::*;
use crate::image_pipeline::common::error::PipelineError;
use crate::image_pipeline::common::image::Image16;
use crate::image_pipeline::geometry::CropRect;
use crate::image_pipeline::raw::{FilterPattern, RawFrame};

fn frame_with_cells(cell: [u16; 4]) -> (RawFrame, Image16) {
    let data = (0..16 * 16)
        .map(|i| {
            let (row, col) = (i / 16, i % 16);
            match (row % 2, col % 2) {
                (0, 0) => cell[0],
                (1, 1) => cell[2],
                (0, 1) => cell[1],
                _ => cell[3],
            }
        })
        .collect();
    let frame = RawFrame::from_mosaic(16, 16, FilterPattern::rggb(), 0, 4095, data).unwrap();
    let raw = frame.to_raw_image();
    (frame, raw)
}

fn preset(name: &str, tuning: i32, channel: [f64; 4]) -> WbPreset {
    WbPreset {
        make: "NIKON".to_string(),
        model: "D70".to_string(),
        name: name.to_string(),
        tuning,
        channel,
    }
}

fn inputs<'a>(frame: &'a RawFrame, raw: &'a Image16, presets: &'a PresetTable) -> WbInputs<'a> {
    WbInputs { frame, raw, presets, use_matrix: true }
}

fn assert_normalized(wb: &ResolvedWb, colors: usize) {
    let min = wb.chan_mul.iter().take(colors).copied().fold(f64::MAX, f64::min);
    assert!((min - 1.0).abs() < 1e-9, "min multiplier {:?}", wb.chan_mul);
    assert!(wb.chan_mul.iter().take(colors).all(|&v| v >= 1.0));
}

#[test]
fn test_temperature_round_trip() {
    for t in [3000.0, 4500.0, 6500.0, 9000.0] {
        let (back, green) = rgb_to_temperature(temperature_to_rgb(t));
        assert!((back - t).abs() < 5.0, "{} -> {}", t, back);
        assert!((green - 1.0).abs() < 1e-3);
    }
}

#[test]
fn test_warm_light_is_red() {
    let warm = temperature_to_rgb(3000.0);
    let cool = temperature_to_rgb(10000.0);
    assert!(warm[0] > warm[2]);
    assert!(cool[2] > cool[0]);
}

#[test]
fn test_auto_neutralizes_gray_card() {
    let (frame, raw) = frame_with_cells([1000, 2000, 500, 2000]);
    let presets = PresetTable::default();
    let wb = resolve(&WhiteBalanceMode::Auto, &WbParams::default(), &inputs(&frame, &raw, &presets)).unwrap();

    assert_normalized(&wb, 3);
    assert!((wb.chan_mul[0] - 2.0).abs() < 1e-9);
    assert!((wb.chan_mul[2] - 4.0).abs() < 1e-9);
    assert_eq!(wb.chan_mul[3], wb.chan_mul[1]);
}

#[test]
fn test_auto_skips_clipped_cells() {
    let (frame, mut raw) = frame_with_cells([1000, 2000, 500, 2000]);
    for cell in raw.row_mut(0) {
        *cell = [4095, 100, 4095, 100];
    }
    let presets = PresetTable::default();
    let wb = resolve(&WhiteBalanceMode::Auto, &WbParams::default(), &inputs(&frame, &raw, &presets)).unwrap();
    assert!((wb.chan_mul[0] - 2.0).abs() < 1e-9);
}

#[test]
fn test_spot_uses_rectangle() {
    let (frame, mut raw) = frame_with_cells([1000, 1000, 1000, 1000]);
    raw.pixel_mut(1, 1)[0] = 250;
    raw.pixel_mut(1, 1)[2] = 500;
    let presets = PresetTable::default();
    let mode = WhiteBalanceMode::Spot(CropRect::new(2, 2, 4, 4));
    let wb = resolve(&mode, &WbParams::default(), &inputs(&frame, &raw, &presets)).unwrap();
    assert_normalized(&wb, 3);
    assert!((wb.chan_mul[0] - 4.0).abs() < 1e-9);
    assert!((wb.chan_mul[2] - 2.0).abs() < 1e-9);
}

#[test]
fn test_zero_sums_do_not_produce_zero_multipliers() {
    let (frame, raw) = frame_with_cells([0, 0, 0, 0]);
    let presets = PresetTable::default();
    let wb = resolve(&WhiteBalanceMode::Auto, &WbParams::default(), &inputs(&frame, &raw, &presets)).unwrap();
    assert_eq!(&wb.chan_mul[..3], &[1.0, 1.0, 1.0]);
}

#[test]
fn test_manual_multipliers_are_normalized() {
    let (frame, raw) = frame_with_cells([1000; 4]);
    let presets = PresetTable::default();
    for temperature in [2500.0, 5000.0, 7500.0, 15000.0] {
        let params = WbParams { temperature, green: 1.2, tuning: 0 };
        let wb = resolve(&WhiteBalanceMode::Manual, &params, &inputs(&frame, &raw, &presets)).unwrap();
        assert_normalized(&wb, 3);
        assert_eq!(wb.temperature, temperature);
    }
}

#[test]
fn test_manual_warm_light_boosts_blue() {
    let (frame, raw) = frame_with_cells([1000; 4]);
    let presets = PresetTable::default();
    let params = WbParams { temperature: 3000.0, green: 1.0, tuning: 0 };
    let wb = resolve(&WhiteBalanceMode::Manual, &params, &inputs(&frame, &raw, &presets)).unwrap();
    assert!(wb.chan_mul[2] > wb.chan_mul[0]);
}

#[test]
fn test_camera_requires_multipliers() {
    let (mut frame, raw) = frame_with_cells([1000; 4]);
    let presets = PresetTable::default();
    let err = resolve(&WhiteBalanceMode::Camera, &WbParams::default(), &inputs(&frame, &raw, &presets));
    assert!(matches!(err, Err(PipelineError::NoCameraWb)));

    frame.cam_mul = Some([2.0, 1.0, 1.5, 1.0]);
    let wb = resolve(&WhiteBalanceMode::Camera, &WbParams::default(), &inputs(&frame, &raw, &presets)).unwrap();
    assert_eq!(&wb.chan_mul[..3], &[2.0, 1.0, 1.5]);
}

#[test]
fn test_camera_falls_back_to_auto_once() {
    let (frame, raw) = frame_with_cells([1000, 2000, 500, 2000]);
    let presets = PresetTable::default();
    let outcome =
        resolve_with_fallback(&WhiteBalanceMode::Camera, &WbParams::default(), &inputs(&frame, &raw, &presets))
            .unwrap();
    assert_eq!(outcome.mode, WhiteBalanceMode::Auto);
    assert!(outcome.warning.unwrap().contains("auto white balance"));
    assert!((outcome.resolved.chan_mul[2] - 4.0).abs() < 1e-9);
}

#[test]
fn test_unknown_preset_falls_back_to_manual() {
    let (frame, raw) = frame_with_cells([1000; 4]);
    let presets = PresetTable::default();
    let mode = WhiteBalanceMode::Preset("Shade".to_string());
    assert!(matches!(
        resolve(&mode, &WbParams::default(), &inputs(&frame, &raw, &presets)),
        Err(PipelineError::PresetNotFound { .. })
    ));
    let outcome = resolve_with_fallback(&mode, &WbParams::default(), &inputs(&frame, &raw, &presets)).unwrap();
    assert_eq!(outcome.mode, WhiteBalanceMode::Manual);
    assert!(outcome.warning.is_some());
}

#[test]
fn test_preset_tuning_interpolates_and_clamps() {
    let table = PresetTable::new(vec![
        preset("Daylight", 3, [1.0, 1.0, 3.0, 0.0]),
        preset("Daylight", -3, [2.0, 1.0, 1.0, 0.0]),
        preset("Daylight", 0, [1.5, 1.0, 2.0, 0.0]),
    ]);

    let (exact, t) = table.lookup("NIKON", "D70", "Daylight", 0).unwrap();
    assert_eq!((exact, t), ([1.5, 1.0, 2.0, 0.0], 0));

    let (between, t) = table.lookup("NIKON", "D70", "Daylight", 1).unwrap();
    assert_eq!(t, 1);
    assert!((between[2] - (2.0 + 1.0 / 3.0)).abs() < 1e-9);

    assert_eq!(table.lookup("NIKON", "D70", "Daylight", 9).unwrap(), ([1.0, 1.0, 3.0, 0.0], 3));
    assert_eq!(table.lookup("NIKON", "D70", "Daylight", -9).unwrap(), ([2.0, 1.0, 1.0, 0.0], -3));
}

#[test]
fn test_preset_resolution_reports_clamped_tuning() {
    let (mut frame, raw) = frame_with_cells([1000; 4]);
    frame.make = "NIKON".to_string();
    frame.model = "D70".to_string();
    let presets = PresetTable::new(vec![preset("Cloudy", -2, [2.0, 1.0, 1.2, 0.0]), preset("Cloudy", 2, [2.4, 1.0, 1.0, 0.0])]);
    let params = WbParams { tuning: 6, ..WbParams::default() };
    let wb = resolve(&WhiteBalanceMode::Preset("Cloudy".to_string()), &params, &inputs(&frame, &raw, &presets)).unwrap();
    assert_eq!(wb.tuning, 2);
    assert_normalized(&wb, 3);
    assert!((wb.chan_mul[0] - 2.4).abs() < 1e-9);
}

#[test]
fn test_minolta_model_names() {
    assert_eq!(canonical_model("MINOLTA", "ALPHA 7D"), "DYNAX 7D");
    assert_eq!(canonical_model("MINOLTA", "MAXXUM 5D"), "DYNAX 5D");
    assert_eq!(canonical_model("MINOLTA", "DYNAX 7D"), "DYNAX 7D");
    assert_eq!(canonical_model("NIKON", "ALPHA 1"), "ALPHA 1");
}

#[test]
fn test_presets_from_json() {
    let json = r#"[{"make":"NIKON","model":"D70","name":"Flash","tuning":0,"channel":[1.9,1.0,1.3,0.0]}]"#;
    let table = PresetTable::from_json(json).unwrap();
    assert_eq!(table.names("NIKON", "D70"), vec!["Flash"]);
    assert!(PresetTable::from_json("{").is_err());
}

#[test]
fn test_finalize_gains_peak_at_unity() {
    let wb = ResolvedWb { chan_mul: [2.0, 1.0, 4.0, 1.0], temperature: 5000.0, green: 1.0, tuning: 0 };
    let gains = wb.finalize_gains(3);
    assert_eq!(gains[2], 0x10000);
    assert_eq!(gains[0], 0x8000);
    assert_eq!(gains[1], 0x4000);
    assert_eq!(gains[3], gains[1]);
}
