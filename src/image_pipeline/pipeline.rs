//! Staged conversion pipeline
//!
//! A `Session` keeps one buffer per phase (raw, first, develop, lens) and a 32-bit
//! validity mask for each. Configuration changes invalidate from the earliest affected
//! phase onwards; buffers are recomputed on demand, the develop and lens phases one
//! subarea at a time.

mod convert;
mod image;
mod phase;
mod session;


pub use convert::{ConversionReport, RawConverter};
pub use image::{ChannelLayout, PhaseBuffer, PipelineImage, SUBAREA_COUNT, Subarea, SubareaGrid};
pub use phase::{Change, Phase, config_changes};
pub use session::{ProgressCallback, Session};
