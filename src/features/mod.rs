pub mod color;
pub mod descriptors;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
pub use color::{ColorConversion, ColorSpace};

/// Maps a classifier-sized crop to a fixed-length feature vector.
pub trait FeatureExtractor: Send + Sync {
    /// Length of every vector `extract` returns
    fn feature_len(&self) -> usize;

    fn extract(&self, crop: &RgbImage) -> Result<Vec<f32>, FeatureError>;
}

/// Which channel(s) of the converted crop feed the gradient histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HogChannel {
    Channel(usize),
    All,
}

impl Default for HogChannel {
    fn default() -> Self {
        HogChannel::Channel(0)
    }
}

/// Feature parameters. They must match between training and detection,
/// which is why the model bundle stores a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub color_space: ColorSpace,
    pub spatial_size: u32,
    pub hist_bins: usize,
    pub hist_range: (f32, f32),
    pub orientations: usize,
    pub pix_per_cell: usize,
    pub cell_per_block: usize,
    pub hog_channel: HogChannel,
    /// Side of the square crop the classifier was trained on
    pub crop_size: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Rgb,
            spatial_size: 32,
            hist_bins: 64,
            hist_range: (0.0, 256.0),
            orientations: 12,
            pix_per_cell: 16,
            cell_per_block: 4,
            hog_channel: HogChannel::Channel(0),
            crop_size: 64,
        }
    }
}

/// Spatial bins + color histogram + HOG, concatenated in that order
pub struct HogColorFeatures {
    config: FeatureConfig,
    converter: Box<dyn ColorConversion>,
}

impl HogColorFeatures {
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureError> {
        if let HogChannel::Channel(index) = config.hog_channel {
            if index > 2 {
                return Err(FeatureError::InvalidChannel(index));
            }
        }
        let converter = config.color_space.converter();
        Ok(Self { config, converter })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    fn hog_channels(&self) -> Vec<usize> {
        match self.config.hog_channel {
            HogChannel::Channel(index) => vec![index],
            HogChannel::All => vec![0, 1, 2],
        }
    }
}

impl FeatureExtractor for HogColorFeatures {
    fn feature_len(&self) -> usize {
        let c = &self.config;
        let spatial = (c.spatial_size * c.spatial_size * 3) as usize;
        let hist = c.hist_bins * 3;
        let hog = descriptors::hog_len(c.crop_size, c.orientations, c.pix_per_cell, c.cell_per_block);
        spatial + hist + hog * self.hog_channels().len()
    }

    fn extract(&self, crop: &RgbImage) -> Result<Vec<f32>, FeatureError> {
        let c = &self.config;
        let converted = self.converter.convert(crop);

        let mut features = descriptors::bin_spatial(&converted, c.spatial_size);
        features.extend(descriptors::color_hist(&converted, c.hist_bins, c.hist_range));
        for index in self.hog_channels() {
            let gray = descriptors::channel(&converted, index);
            features.extend(descriptors::hog_features(
                &gray,
                c.orientations,
                c.pix_per_cell,
                c.cell_per_block,
            )?);
        }
        Ok(features)
    }
}
