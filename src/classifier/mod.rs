pub mod bundle;
pub mod train;

use serde::{Deserialize, Serialize};

use crate::error::{DetectionError, ModelError};
use crate::models::Prediction;

pub use bundle::ModelBundle;

/// Binary car / not-car decision over a raw (unscaled) feature vector.
/// Implementations own whatever normalization they were trained with.
pub trait Classifier: Send + Sync {
    /// Feature vector length the model was fitted on
    fn dimension(&self) -> usize;

    fn predict(&self, features: &[f32]) -> Result<Prediction, DetectionError>;
}

/// Per-column standardization: `(x - mean) / std`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl StandardScaler {
    /// Fit on row-major samples. Columns with zero variance get a scale of one.
    /// Every row must have the length of the first.
    pub fn fit(samples: &[Vec<f32>]) -> Result<Self, ModelError> {
        let first = samples.first().ok_or(ModelError::EmptyTrainingSet)?;
        let dim = first.len();
        if let Some((row, sample)) = samples.iter().enumerate().find(|(_, s)| s.len() != dim) {
            return Err(ModelError::RaggedSamples {
                row,
                expected: dim,
                actual: sample.len(),
            });
        }
        let n = samples.len() as f64;

        let mut mean = vec![0.0f64; dim];
        for row in samples {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0f64; dim];
        for row in samples {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                let d = v as f64 - m;
                *s += d * d;
            }
        }

        let scale = var
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > 0.0 { std as f32 } else { 1.0 }
            })
            .collect();

        Ok(Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            scale,
        })
    }

    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// One finite positive scale per mean, no NaN or infinite means
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::ScalerShape {
                mean: self.mean.len(),
                scale: self.scale.len(),
            });
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(ModelError::NonFinite("scaler mean"));
        }
        if let Some((index, &value)) = self
            .scale
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || **s <= 0.0)
        {
            return Err(ModelError::InvalidScale { index, value });
        }
        Ok(())
    }

    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, DetectionError> {
        if self.scale.len() != self.dimension() {
            return Err(DetectionError::DimensionMismatch {
                expected: self.dimension(),
                actual: self.scale.len(),
            });
        }
        if features.len() != self.dimension() {
            return Err(DetectionError::DimensionMismatch {
                expected: self.dimension(),
                actual: features.len(),
            });
        }
        Ok(features
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((&x, &m), &s)| (x - m) / s)
            .collect())
    }
}

/// Linear maximum-margin classifier; positive decision values mean "car"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LinearSvm {
    pub fn decision(&self, scaled: &[f32]) -> f32 {
        self.weights
            .iter()
            .zip(scaled)
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }
}

/// A fitted scaler and SVM used together. Immutable once built, so one
/// instance is shared by reference across every scan worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    scaler: StandardScaler,
    svm: LinearSvm,
}

impl TrainedModel {
    /// Rejects scalers and SVMs that could not have come out of one fit
    pub fn new(scaler: StandardScaler, svm: LinearSvm) -> Result<Self, ModelError> {
        scaler.validate()?;
        if svm.weights.iter().any(|w| !w.is_finite()) || !svm.bias.is_finite() {
            return Err(ModelError::NonFinite("classifier"));
        }
        if scaler.dimension() != svm.dimension() {
            return Err(ModelError::Inconsistent {
                scaler: scaler.dimension(),
                classifier: svm.dimension(),
            });
        }
        Ok(Self { scaler, svm })
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn svm(&self) -> &LinearSvm {
        &self.svm
    }

    pub fn decision(&self, features: &[f32]) -> Result<f32, DetectionError> {
        let scaled = self.scaler.transform(features)?;
        Ok(self.svm.decision(&scaled))
    }
}

impl Classifier for TrainedModel {
    fn dimension(&self) -> usize {
        self.scaler.dimension()
    }

    fn predict(&self, features: &[f32]) -> Result<Prediction, DetectionError> {
        if self.decision(features)? > 0.0 {
            Ok(Prediction::Car)
        } else {
            Ok(Prediction::NotCar)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_standardizes_columns() {
        let samples = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&samples).unwrap();
        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 5.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn scaler_rejects_wrong_length() {
        let scaler = StandardScaler::fit(&[vec![0.0, 1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(DetectionError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn scaler_rejects_ragged_samples() {
        assert!(matches!(
            StandardScaler::fit(&[vec![1.0, 2.0], vec![3.0]]),
            Err(ModelError::RaggedSamples { row: 1, expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn scaler_shape_is_validated() {
        let short = StandardScaler { mean: vec![0.0; 3], scale: vec![1.0; 2] };
        assert!(matches!(short.validate(), Err(ModelError::ScalerShape { mean: 3, scale: 2 })));
        assert!(short.transform(&[0.0, 0.0, 5.0]).is_err());

        let zero = StandardScaler { mean: vec![0.0; 2], scale: vec![1.0, 0.0] };
        assert!(matches!(zero.validate(), Err(ModelError::InvalidScale { index: 1, .. })));

        let nan = StandardScaler { mean: vec![f32::NAN], scale: vec![1.0] };
        assert!(matches!(nan.validate(), Err(ModelError::NonFinite(_))));
    }

    #[test]
    fn model_rejects_non_finite_weights() {
        let scaler = StandardScaler { mean: vec![0.0; 2], scale: vec![1.0; 2] };
        let svm = LinearSvm { weights: vec![f32::INFINITY, 0.0], bias: 0.0 };
        assert!(matches!(TrainedModel::new(scaler, svm), Err(ModelError::NonFinite(_))));
    }

    #[test]
    fn model_requires_matching_dimensions() {
        let scaler = StandardScaler { mean: vec![0.0; 3], scale: vec![1.0; 3] };
        let svm = LinearSvm { weights: vec![1.0; 2], bias: 0.0 };
        assert!(matches!(
            TrainedModel::new(scaler, svm),
            Err(ModelError::Inconsistent { scaler: 3, classifier: 2 })
        ));
    }

    #[test]
    fn predicts_by_sign_of_decision() {
        let scaler = StandardScaler { mean: vec![1.0, 1.0], scale: vec![2.0, 2.0] };
        let svm = LinearSvm { weights: vec![1.0, -1.0], bias: 0.5 };
        let model = TrainedModel::new(scaler, svm).unwrap();
        assert_eq!(model.predict(&[5.0, 1.0]).unwrap(), Prediction::Car);
        assert_eq!(model.predict(&[1.0, 5.0]).unwrap(), Prediction::NotCar);
    }
}
