mod common;

use std::fs::File;

use carscan::{
    FeatureConfig, HogColorFeatures, LinearSvm, ModelBundle, ModelError, StandardScaler,
    TrainedModel, VehicleDetector,
};
use common::*;
use image::{Rgb, RgbImage};

/// Model over the default feature vector with zero weights, so `bias`
/// alone decides every window.
fn constant_bundle(bias: f32) -> anyhow::Result<ModelBundle> {
    let features = FeatureConfig::default();
    let dim = HogColorFeatures::new(features.clone())?.feature_len();
    let scaler = StandardScaler {
        mean: vec![0.0; dim],
        scale: vec![1.0; dim],
    };
    let svm = LinearSvm {
        weights: vec![0.0; dim],
        bias,
    };
    Ok(ModelBundle {
        features,
        model: TrainedModel::new(scaler, svm)?,
    })
}

fn road(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 120]))
}

#[test]
fn test_bundle_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("models").join("svc.tar.zst");
    let bundle = ModelBundle {
        features: FeatureConfig {
            orientations: 9,
            ..FeatureConfig::default()
        },
        model: TrainedModel::new(
            StandardScaler {
                mean: vec![0.25, -1.5, 3.0],
                scale: vec![1.0, 0.5, 2.0],
            },
            LinearSvm {
                weights: vec![0.1, -0.2, 0.3],
                bias: -0.05,
            },
        )?,
    };

    bundle.save(&path)?;
    let loaded = ModelBundle::load(&path)?;
    assert_eq!(loaded, bundle);
    Ok(())
}

#[test]
fn test_missing_bundle_is_an_io_error() {
    let result = ModelBundle::load(std::path::Path::new("/nonexistent/svc.tar.zst"));
    assert!(matches!(result, Err(ModelError::Io { .. })));
}

#[test]
fn test_corrupt_bundle_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("broken.tar.zst");
    std::fs::write(&path, b"definitely not a model")?;
    assert!(ModelBundle::load(&path).is_err());
    Ok(())
}

/// Write a bundle archive by hand, entry by entry
fn write_entries(path: &std::path::Path, entries: &[(&str, Vec<u8>)]) -> anyhow::Result<()> {
    let encoder = zstd::stream::write::Encoder::new(File::create(path)?, 3)?;
    let mut tar = tar::Builder::new(encoder);
    for (name, bytes) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, name, bytes.as_slice())?;
    }
    tar.into_inner()?.finish()?;
    Ok(())
}

#[test]
fn test_bundle_without_classifier_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("partial.tar.zst");
    let scaler = serde_json::to_vec(&StandardScaler {
        mean: vec![0.0],
        scale: vec![1.0],
    })?;
    write_entries(&path, &[("scaler.json", scaler)])?;

    assert!(matches!(
        ModelBundle::load(&path),
        Err(ModelError::MissingEntry("classifier.json"))
    ));
    Ok(())
}

#[test]
fn test_scaler_with_short_scale_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("short.tar.zst");
    let scaler = serde_json::to_vec(&StandardScaler {
        mean: vec![0.0, 0.0, 0.0],
        scale: vec![1.0, 1.0],
    })?;
    let classifier = serde_json::to_vec(&LinearSvm {
        weights: vec![0.0, 0.0, 100.0],
        bias: -1.0,
    })?;
    let features = serde_json::to_vec(&FeatureConfig::default())?;
    write_entries(
        &path,
        &[
            ("scaler.json", scaler),
            ("classifier.json", classifier),
            ("features.json", features),
        ],
    )?;

    assert!(matches!(
        ModelBundle::load(&path),
        Err(ModelError::ScalerShape { mean: 3, scale: 2 })
    ));
    Ok(())
}

#[test]
fn test_scaler_with_zero_scale_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("zero.tar.zst");
    let scaler = serde_json::to_vec(&StandardScaler {
        mean: vec![0.0, 0.0],
        scale: vec![1.0, 0.0],
    })?;
    let classifier = serde_json::to_vec(&LinearSvm {
        weights: vec![1.0, 1.0],
        bias: 0.0,
    })?;
    let features = serde_json::to_vec(&FeatureConfig::default())?;
    write_entries(
        &path,
        &[
            ("scaler.json", scaler),
            ("classifier.json", classifier),
            ("features.json", features),
        ],
    )?;

    assert!(matches!(
        ModelBundle::load(&path),
        Err(ModelError::InvalidScale { index: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_inconsistent_model_is_rejected() {
    let result = TrainedModel::new(
        StandardScaler {
            mean: vec![0.0; 3],
            scale: vec![1.0; 3],
        },
        LinearSvm {
            weights: vec![0.0; 2],
            bias: 0.0,
        },
    );
    assert!(matches!(
        result,
        Err(ModelError::Inconsistent {
            scaler: 3,
            classifier: 2
        })
    ));
}

#[test]
fn test_detector_from_bundle_uses_stored_features() -> anyhow::Result<()> {
    let img = road(640, 360);

    let negative = VehicleDetector::from_bundle(constant_bundle(-1.0)?, DetectorConfig::default())?;
    let report = negative.detect(&img, "negative")?;
    assert!(!report.candidates.is_empty());
    assert!(report.positives.is_empty());
    assert!(report.boxes.is_empty());

    let positive = VehicleDetector::from_bundle(constant_bundle(1.0)?, DetectorConfig::default())?;
    let report = positive.detect(&img, "positive")?;
    // windows starting at the right edge have no pixels and are skipped
    assert!(!report.positives.is_empty());
    assert!(report.positives.len() < report.candidates.len());
    assert!(report.positives.iter().all(|r| r.x2 <= 640 && r.y2 <= 360));
    assert!(!report.boxes.is_empty());
    Ok(())
}

#[test]
fn test_bundle_features_must_match_model() -> anyhow::Result<()> {
    let mut bundle = constant_bundle(0.0)?;
    bundle.features.hist_bins = 32;
    assert!(VehicleDetector::from_bundle(bundle, DetectorConfig::default()).is_err());
    Ok(())
}
