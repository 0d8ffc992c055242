use carscan::detection::heatmap::HeatmapConfig;
use carscan::detection::windows::{SearchConfig, WindowScale};
use carscan::{
    Classifier, DetectionError, DetectorConfig, FeatureError, FeatureExtractor, Prediction,
    Rectangle,
};
use image::{Rgb, RgbImage};

/// Single feature: mean intensity of the crop in `[0, 1]`
pub struct MeanBrightness;

impl FeatureExtractor for MeanBrightness {
    fn feature_len(&self) -> usize {
        1
    }

    fn extract(&self, crop: &RgbImage) -> Result<Vec<f32>, FeatureError> {
        let total: u64 = crop.as_raw().iter().map(|&v| v as u64).sum();
        let count = crop.as_raw().len().max(1) as f32;
        Ok(vec![total as f32 / count / 255.0])
    }
}

/// Car when the single feature exceeds `threshold`
pub struct BrightIsCar {
    pub threshold: f32,
}

impl Classifier for BrightIsCar {
    fn dimension(&self) -> usize {
        1
    }

    fn predict(&self, features: &[f32]) -> Result<Prediction, DetectionError> {
        Ok(if features[0] > self.threshold {
            Prediction::Car
        } else {
            Prediction::NotCar
        })
    }
}

pub struct NeverCar;

impl Classifier for NeverCar {
    fn dimension(&self) -> usize {
        1
    }

    fn predict(&self, _features: &[f32]) -> Result<Prediction, DetectionError> {
        Ok(Prediction::NotCar)
    }
}

/// Claims a feature length no test extractor produces
pub struct WrongDimension;

impl Classifier for WrongDimension {
    fn dimension(&self) -> usize {
        2
    }

    fn predict(&self, _features: &[f32]) -> Result<Prediction, DetectionError> {
        Ok(Prediction::Car)
    }
}

/// Black image with each rectangle filled white
pub fn image_with_blocks(width: u32, height: u32, blocks: &[Rectangle]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let inside = blocks
            .iter()
            .any(|b| x >= b.x1 && x < b.x2 && y >= b.y1 && y < b.y2);
        if inside {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// 32 px windows at half overlap over the whole image, no right-edge extension
pub fn small_search() -> SearchConfig {
    SearchConfig {
        scales: vec![WindowScale {
            size: 32,
            overlap: 0.5,
            y_start_fraction: 0.0,
            rows: 4,
        }],
        max_y_fraction: 1.0,
        extend_past_right_edge: false,
    }
}

pub fn small_config() -> DetectorConfig {
    let mut config = DetectorConfig {
        search: small_search(),
        heatmap: HeatmapConfig::default(),
        ..DetectorConfig::default()
    };
    config.features.crop_size = 16;
    config
}
