//! Develop/tone engine
//!
//! Turns white-balance-reversed linear sensor data into output RGB: white balance gain,
//! color matrix, exposure, highlight policy, tone curve, saturation and base curve.

mod curve;
mod developer;


pub use curve::{BaseCurve, CurvePoint, LUT_SIZE, MAX_ANCHORS, ToneCurve};
pub use developer::{DevelopParams, Developer, DeveloperMode, HighlightMode};
