use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use linfa::traits::Fit;
use linfa_svm::Svm;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{LinearSvm, StandardScaler, TrainedModel};
use crate::error::ModelError;
use crate::features::FeatureExtractor;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Options for fitting the scaler + linear SVM
#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Share of the shuffled samples held back to measure accuracy
    pub test_fraction: f32,
    /// Soft-margin penalty, applied to both classes
    pub c: f32,
    pub seed: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            c: 1.0,
            seed: 42,
        }
    }
}

/// Labelled feature vectors; `true` marks a vehicle
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<bool>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn push(&mut self, features: Vec<f32>, label: bool) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

/// Recursively collect training images below `dir`, sorted for reproducibility
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_image = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_image {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load each image, bring it to the classifier crop size and extract features
pub fn extract_all(
    paths: &[PathBuf],
    extractor: &dyn FeatureExtractor,
    crop_size: u32,
) -> Result<Vec<Vec<f32>>> {
    paths
        .par_iter()
        .map(|path| {
            let img = image::open(path)
                .with_context(|| format!("Failed to open training image {:?}", path))?
                .into_rgb8();
            let img = if img.dimensions() == (crop_size, crop_size) {
                img
            } else {
                imageops::resize(&img, crop_size, crop_size, FilterType::Triangle)
            };
            extractor
                .extract(&img)
                .with_context(|| format!("Failed to extract features from {:?}", path))
        })
        .collect()
}

pub fn load_dataset(
    vehicles: &Path,
    non_vehicles: &Path,
    extractor: &dyn FeatureExtractor,
    crop_size: u32,
) -> Result<Dataset> {
    let cars = collect_images(vehicles)?;
    let notcars = collect_images(non_vehicles)?;
    info!(cars = cars.len(), notcars = notcars.len(), "collected training images");

    let mut dataset = Dataset::default();
    for features in extract_all(&cars, extractor, crop_size)? {
        dataset.push(features, true);
    }
    debug!("car features extracted");
    for features in extract_all(&notcars, extractor, crop_size)? {
        dataset.push(features, false);
    }
    debug!("non-car features extracted");
    Ok(dataset)
}

/// Outcome of `fit`: the model plus its accuracy on both splits
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: TrainedModel,
    pub train_accuracy: f32,
    pub test_accuracy: Option<f32>,
    pub train_len: usize,
    pub test_len: usize,
}

/// Fit a linear-kernel SVM on already standardized samples and read the
/// separating hyperplane back out as weights and bias.
pub fn fit_linear_svm(
    samples: &[Vec<f32>],
    labels: &[bool],
    c: f32,
) -> Result<LinearSvm, ModelError> {
    let dim = samples.first().ok_or(ModelError::EmptyTrainingSet)?.len();
    if let Some((row, sample)) = samples.iter().enumerate().find(|(_, s)| s.len() != dim) {
        return Err(ModelError::RaggedSamples {
            row,
            expected: dim,
            actual: sample.len(),
        });
    }

    let records = Array2::from_shape_fn((samples.len(), dim), |(i, j)| samples[i][j] as f64);
    let targets = Array1::from_vec(labels.to_vec());
    let dataset = linfa::Dataset::new(records, targets);

    let c = c.max(f32::EPSILON) as f64;
    let svm = Svm::<f64, bool>::params()
        .pos_neg_weights(c, c)
        .linear_kernel()
        .fit(&dataset)
        .map_err(|e| ModelError::Solver(e.to_string()))?;
    debug!(rho = svm.rho, "linear SVM solved");

    // decision(x) = w . x - rho, so each unit vector yields one weight
    let basis = Array2::<f64>::eye(dim);
    let weights = basis
        .rows()
        .into_iter()
        .map(|unit| svm.weighted_sum(&unit) as f32)
        .collect();

    Ok(LinearSvm {
        weights,
        bias: -svm.rho as f32,
    })
}

fn accuracy(svm: &LinearSvm, scaled: &[Vec<f32>], labels: &[bool]) -> f32 {
    if scaled.is_empty() {
        return 0.0;
    }
    let correct = scaled
        .iter()
        .zip(labels)
        .filter(|(x, label)| (svm.decision(x) > 0.0) == **label)
        .count();
    correct as f32 / scaled.len() as f32
}

/// Shuffle, split, fit the scaler on every sample and the SVM on the training split
pub fn fit(dataset: &Dataset, options: &TrainingOptions) -> Result<TrainingReport, ModelError> {
    if dataset.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    let mut rng = StdRng::seed_from_u64(options.seed);

    let scaler = StandardScaler::fit(&dataset.features)?;
    let scaled: Vec<Vec<f32>> = dataset
        .features
        .iter()
        .enumerate()
        .map(|(i, row)| {
            scaler.transform(row).map_err(|_| ModelError::RaggedSamples {
                row: i,
                expected: scaler.dimension(),
                actual: row.len(),
            })
        })
        .collect::<Result<_, _>>()?;

    let mut order: Vec<usize> = (0..dataset.len()).collect();
    order.shuffle(&mut rng);
    let test_len = ((dataset.len() as f32) * options.test_fraction.clamp(0.0, 0.9)) as usize;
    let (test_idx, train_idx) = order.split_at(test_len);

    let pick = |idx: &[usize]| -> (Vec<Vec<f32>>, Vec<bool>) {
        idx.iter()
            .map(|&i| (scaled[i].clone(), dataset.labels[i]))
            .unzip()
    };
    let (train_x, train_y) = pick(train_idx);
    let (test_x, test_y) = pick(test_idx);

    let svm = fit_linear_svm(&train_x, &train_y, options.c)?;
    let train_accuracy = accuracy(&svm, &train_x, &train_y);
    let test_accuracy = if test_x.is_empty() {
        None
    } else {
        Some(accuracy(&svm, &test_x, &test_y))
    };
    let model = TrainedModel::new(scaler, svm)?;

    info!(
        train = train_idx.len(),
        test = test_idx.len(),
        train_accuracy,
        ?test_accuracy,
        "fitted linear SVM"
    );

    Ok(TrainingReport {
        model,
        train_accuracy,
        test_accuracy,
        train_len: train_idx.len(),
        test_len: test_idx.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::models::Prediction;

    fn separable() -> Dataset {
        let mut dataset = Dataset::default();
        for i in 0..40 {
            let jitter = (i % 5) as f32 * 0.1;
            dataset.push(vec![3.0 + jitter, 1.0 - jitter], true);
            dataset.push(vec![-3.0 - jitter, -1.0 + jitter], false);
        }
        dataset
    }

    #[test]
    fn linear_svm_separates_linearly_separable_data() {
        let options = TrainingOptions { test_fraction: 0.25, ..TrainingOptions::default() };
        let report = fit(&separable(), &options).unwrap();
        assert_eq!(report.train_accuracy, 1.0);
        assert_eq!(report.test_accuracy, Some(1.0));
        assert_eq!(report.train_len + report.test_len, 80);
        assert_eq!(report.model.predict(&[4.0, 0.5]).unwrap(), Prediction::Car);
        assert_eq!(report.model.predict(&[-4.0, -0.5]).unwrap(), Prediction::NotCar);
    }

    #[test]
    fn hyperplane_is_read_back_as_weights() {
        let samples = vec![vec![2.0], vec![1.5], vec![-2.0], vec![-1.5]];
        let labels = vec![true, true, false, false];
        let svm = fit_linear_svm(&samples, &labels, 1.0).unwrap();
        assert_eq!(svm.dimension(), 1);
        assert!(svm.weights[0] > 0.0);
        assert!(svm.decision(&[2.0]) > 0.0);
        assert!(svm.decision(&[-2.0]) < 0.0);
    }

    #[test]
    fn ragged_training_rows_are_rejected() {
        let samples = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            fit_linear_svm(&samples, &[true, false], 1.0),
            Err(ModelError::RaggedSamples { row: 1, expected: 2, actual: 1 })
        ));

        let mut dataset = separable();
        dataset.push(vec![0.0], true);
        assert!(matches!(
            fit(&dataset, &TrainingOptions::default()),
            Err(ModelError::RaggedSamples { row: 80, .. })
        ));
    }

    #[test]
    fn fitting_is_reproducible_for_a_seed() {
        let options = TrainingOptions::default();
        let a = fit(&separable(), &options).unwrap();
        let b = fit(&separable(), &options).unwrap();
        assert_eq!(a.model, b.model);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert!(matches!(
            fit(&Dataset::default(), &TrainingOptions::default()),
            Err(ModelError::EmptyTrainingSet)
        ));
    }
}
