mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from carscan for tests
pub use carscan::detection::heatmap::HeatmapConfig;
pub use carscan::detection::windows::{SearchConfig, WindowScale};
pub use carscan::{
    Classifier, DetectionError, DetectorConfig, FeatureError, FeatureExtractor, Prediction,
    Rectangle,
};
