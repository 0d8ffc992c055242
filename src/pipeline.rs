use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use image::DynamicImage;
use tracing::debug;

/// Stages of one per-image detection run. A run starts and ends `Idle`;
/// nothing carries over from one image to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    WindowsGenerated,
    Scanned,
    HeatmapBuilt,
    Thresholded,
    BoxesExtracted,
}

impl RunStage {
    /// Stage that follows this one
    pub fn next(self) -> RunStage {
        match self {
            RunStage::Idle => RunStage::WindowsGenerated,
            RunStage::WindowsGenerated => RunStage::Scanned,
            RunStage::Scanned => RunStage::HeatmapBuilt,
            RunStage::HeatmapBuilt => RunStage::Thresholded,
            RunStage::Thresholded => RunStage::BoxesExtracted,
            RunStage::BoxesExtracted => RunStage::Idle,
        }
    }

    pub fn index(self) -> usize {
        match self {
            RunStage::Idle => 0,
            RunStage::WindowsGenerated => 1,
            RunStage::Scanned => 2,
            RunStage::HeatmapBuilt => 3,
            RunStage::Thresholded => 4,
            RunStage::BoxesExtracted => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RunStage::Idle => "Input",
            RunStage::WindowsGenerated => "Windows Generated",
            RunStage::Scanned => "Scanned",
            RunStage::HeatmapBuilt => "Heatmap Built",
            RunStage::Thresholded => "Thresholded",
            RunStage::BoxesExtracted => "Boxes Extracted",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

impl DebugConfig {
    /// The directory must be empty or non-existent
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self {
            output_dir,
            enabled: true,
        })
    }

    /// Directory for one stage, e.g. `03_heatmap_built`
    pub fn stage_dir(&self, stage: RunStage) -> PathBuf {
        let name = format!(
            "{:02}_{}",
            stage.index(),
            stage.name().to_lowercase().replace(' ', "_")
        );
        self.output_dir.join(name)
    }

    /// Save the diagnostic image of one stage as `<stage dir>/<image_name>.png`
    pub fn save(&self, stage: RunStage, image_name: &str, image: &DynamicImage) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let step_dir = self.stage_dir(stage);
        std::fs::create_dir_all(&step_dir)?;

        let output_path = step_dir.join(format!("{}.png", image_name));
        image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        debug!(path = %output_path.display(), "saved debug image");
        Ok(())
    }
}

/// Context shared by every run of a detector
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    pub fn save_debug(&self, stage: RunStage, image_name: &str, image: &DynamicImage) -> Result<()> {
        match &self.debug {
            Some(debug) => debug.save(stage, image_name, image),
            None => Ok(()),
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.as_ref().is_some_and(|d| d.enabled)
    }
}
