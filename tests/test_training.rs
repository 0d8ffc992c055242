mod common;

use std::path::Path;

use carscan::classifier::train::{self, Dataset, TrainingOptions};
use common::*;
use image::{Rgb, RgbImage};

fn write_crops(dir: &Path, levels: &[u8]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    for (i, &level) in levels.iter().enumerate() {
        let img = RgbImage::from_pixel(20, 20, Rgb([level, level, level]));
        img.save(dir.join(format!("crop_{:02}.png", i)))?;
    }
    Ok(())
}

#[test]
fn test_collect_images_recurses_and_filters() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    write_crops(&dir.path().join("b"), &[10])?;
    write_crops(&dir.path().join("a").join("nested"), &[20, 30])?;
    std::fs::write(dir.path().join("notes.txt"), "not an image")?;

    let images = train::collect_images(dir.path())?;
    assert_eq!(images.len(), 3);
    assert!(images.windows(2).all(|pair| pair[0] < pair[1]));
    Ok(())
}

#[test]
fn test_brightness_dataset_is_learned() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let vehicles = dir.path().join("vehicles");
    let non_vehicles = dir.path().join("non-vehicles");
    write_crops(&vehicles, &[200, 210, 220, 230, 240, 250, 205, 215])?;
    write_crops(&non_vehicles, &[10, 20, 30, 40, 50, 60, 15, 25])?;

    let dataset = train::load_dataset(&vehicles, &non_vehicles, &MeanBrightness, 16)?;
    assert_eq!(dataset.len(), 16);
    assert_eq!(dataset.positives(), 8);

    let options = TrainingOptions {
        test_fraction: 0.0,
        ..TrainingOptions::default()
    };
    let report = train::fit(&dataset, &options)?;
    assert_eq!(report.train_accuracy, 1.0);
    assert_eq!(report.test_accuracy, None);

    assert_eq!(report.model.predict(&[0.9])?, Prediction::Car);
    assert_eq!(report.model.predict(&[0.1])?, Prediction::NotCar);
    Ok(())
}

#[test]
fn test_training_needs_samples() {
    let result = train::fit(&Dataset::default(), &TrainingOptions::default());
    assert!(result.is_err());
}
