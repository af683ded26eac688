//! White balance resolution
//!
//! Turns a white balance mode (manual temperature, spot, auto, camera or named preset)
//! into per-channel multipliers, and back into a temperature/green pair for display.

mod presets;
mod resolver;
mod temperature;

#[cfg(test)]
mod tests;

pub use presets::{PresetTable, WbPreset, canonical_model};
pub use resolver::{
    ResolvedWb, WbInputs, WbOutcome, WbParams, WhiteBalanceMode, resolve, resolve_with_fallback,
};
pub use temperature::{rgb_to_temperature, temperature_to_rgb};
