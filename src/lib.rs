pub mod classifier;
pub mod config;
pub mod detection;
pub mod error;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod render;

pub use classifier::{Classifier, LinearSvm, ModelBundle, StandardScaler, TrainedModel};
pub use config::DetectorConfig;
pub use detection::{Aggregation, DetectionReport, VehicleDetector, aggregate};
pub use error::{DetectionError, FeatureError, ModelError};
pub use features::{FeatureConfig, FeatureExtractor, HogColorFeatures};
pub use models::{BoundingBox, Point, Prediction, Rectangle};
pub use pipeline::{DebugConfig, PipelineContext, RunStage};
