//! Common utilities module
//!
//! This module contains shared utilities used across the image pipeline.

pub mod error;
pub mod image;
pub mod matrix;
pub mod parallel;
pub mod timing;

pub use error::{PipelineError, Result, Severity};
pub use image::{Image, Image16, Pixel, Rgb8Image, Rgb16Image};
pub use timing::{PipelineTimings, StepTiming, Timer};
