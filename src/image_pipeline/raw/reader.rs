use std::path::Path;

use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::raw::types::RawFrame;

/// Boundary to the external raw decoder.
pub trait RawImageReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame>;

    fn open(&self, path: &Path) -> Result<RawFrame> {
        let data = std::fs::read(path)
            .map_err(|e| PipelineError::InputReadError(format!("{}: {}", path.display(), e)))?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        self.read_raw(&data)
    }
}
