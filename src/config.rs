use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detection::heatmap::HeatmapConfig;
use crate::detection::windows::SearchConfig;
use crate::features::FeatureConfig;

/// All tunables of a detection run. Missing fields fall back to the defaults,
/// so a config file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub features: FeatureConfig,
    pub search: SearchConfig,
    pub heatmap: HeatmapConfig,
}

impl DetectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&data).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
