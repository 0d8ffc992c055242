use std::path::PathBuf;

/// Failures while loading or saving the persisted scaler/classifier bundle.
/// These are initialization errors: nothing can be scanned without a model.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("failed to access model bundle {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model bundle entry {entry} is malformed")]
    Format {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model bundle is missing entry {0}")]
    MissingEntry(&'static str),

    #[error("scaler expects {scaler} features but the classifier has {classifier} weights")]
    Inconsistent { scaler: usize, classifier: usize },

    #[error("scaler has {mean} means but {scale} scales")]
    ScalerShape { mean: usize, scale: usize },

    #[error("scaler column {index} has scale {value}, expected a finite positive number")]
    InvalidScale { index: usize, value: f32 },

    #[error("{0} contains a non-finite value")]
    NonFinite(&'static str),

    #[error("training sample {row} has {actual} features, expected {expected}")]
    RaggedSamples {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("linear SVM solver failed: {0}")]
    Solver(String),

    #[error("cannot fit a model without training samples")]
    EmptyTrainingSet,
}

#[derive(thiserror::Error, Debug)]
pub enum FeatureError {
    #[error("HOG parameters rejected for a {width}x{height} crop: {reason}")]
    Hog {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("HOG channel {0} does not exist, crops have 3 channels")]
    InvalidChannel(usize),
}

/// Per-frame failures of the detection run.
#[derive(thiserror::Error, Debug)]
pub enum DetectionError {
    #[error("feature vector has {actual} values but the model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}
