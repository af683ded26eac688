use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Configuration;
use crate::image_pipeline::common::error::{PipelineError, Result};

/// Persistence of configurations.
pub trait ConfigStore {
    fn load(&self) -> Result<Configuration>;
    fn save(&self, config: &Configuration) -> Result<()>;
}

/// Configuration stored as pretty-printed JSON in a single file.
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Configuration> {
        debug!("Loading configuration from {}", self.path.display());
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| PipelineError::InputReadError(format!("{}: {}", self.path.display(), e)))?;
        let config: Configuration = serde_json::from_str(&json)
            .map_err(|e| PipelineError::ConfigError(format!("{}: {}", self.path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn save(&self, config: &Configuration) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| PipelineError::OutputWriteError(format!("{}: {}", self.path.display(), e)))?;
        info!("Saved configuration to {}", self.path.display());
        Ok(())
    }
}
