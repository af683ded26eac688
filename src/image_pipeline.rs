//! Raw image development pipeline
//!
//! Stage modules (raw ingest, hot pixels, denoise, demosaic, geometry, white balance,
//! exposure, develop, lens correction) are independent of each other; `pipeline` ties
//! them together into a session with lazily recomputed phases, and `tiff` writes the
//! result.

pub mod common;
pub mod config;
pub mod demosaic;
pub mod denoise;
pub mod develop;
pub mod exposure;
pub mod geometry;
pub mod hotpixel;
pub mod lens;
pub mod pipeline;
pub mod raw;
pub mod tiff;
pub mod white_balance;

pub use common::{PipelineError, Result};

pub use config::{Configuration, ConfigurationBuilder, ConfigStore, JsonConfigStore};

pub use raw::{RawFrame, RawImageReader, RawLoaderReader};

pub use tiff::{OutputImage, StandardTiffWriter, TiffCompression, TiffWriter};

pub use lens::{LensDatabase, StaticLensDatabase};

pub use pipeline::{ConversionReport, Phase, RawConverter, Session};
