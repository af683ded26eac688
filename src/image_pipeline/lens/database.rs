use std::path::Path;

use tracing::debug;

use crate::image_pipeline::common::error::{PipelineError, Result};
use crate::image_pipeline::lens::profile::LensProfile;

/// Source of lens calibration profiles.
pub trait LensDatabase {
    /// Profile of `lens` mounted on a camera by `make`/`model`.
    fn find_lens(&self, make: &str, model: &str, lens: &str) -> Option<LensProfile>;
}

/// In-memory profile list, typically loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct StaticLensDatabase {
    profiles: Vec<LensProfile>,
}

impl StaticLensDatabase {
    pub fn new(profiles: Vec<LensProfile>) -> Self {
        Self { profiles }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let profiles = serde_json::from_str(json)
            .map_err(|e| PipelineError::ConfigError(format!("lens database: {}", e)))?;
        Ok(Self::new(profiles))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::InputReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn normalized(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl LensDatabase for StaticLensDatabase {
    fn find_lens(&self, make: &str, model: &str, lens: &str) -> Option<LensProfile> {
        let wanted = normalized(lens);
        let found = self
            .profiles
            .iter()
            .filter(|p| p.mounts.is_empty() || p.mounts.iter().any(|m| m.eq_ignore_ascii_case(make)))
            .find(|p| {
                let full = normalized(&format!("{} {}", p.maker, p.model));
                wanted == normalized(&p.model) || wanted == full
            })
            .cloned();
        debug!(
            "Lens '{}' on {} {}: {}",
            lens,
            make,
            model,
            if found.is_some() { "found" } else { "not found" }
        );
        found
    }
}
