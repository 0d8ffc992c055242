use image::RgbImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;
use tracing::debug;

use crate::classifier::Classifier;
use crate::error::DetectionError;
use crate::features::FeatureExtractor;
use crate::models::Rectangle;

/// Crop a window out of the image and bring it to the classifier input size.
/// The aspect ratio is not preserved. `None` when the window lies outside the image.
pub fn crop_window(image: &RgbImage, window: &Rectangle, crop_size: u32) -> Option<RgbImage> {
    let (width, height) = image.dimensions();
    let clamped = window.clamp_to(width, height)?;
    let crop = imageops::crop_imm(
        image,
        clamped.x1,
        clamped.y1,
        clamped.width(),
        clamped.height(),
    )
    .to_image();
    if crop.dimensions() == (crop_size, crop_size) {
        Some(crop)
    } else {
        Some(imageops::resize(&crop, crop_size, crop_size, FilterType::Triangle))
    }
}

enum WindowOutcome {
    Positive(Rectangle),
    Negative,
    Skipped,
}

fn classify_window(
    image: &RgbImage,
    window: &Rectangle,
    extractor: &dyn FeatureExtractor,
    classifier: &dyn Classifier,
    crop_size: u32,
) -> Result<WindowOutcome, DetectionError> {
    let (width, height) = image.dimensions();
    let (Some(clamped), Some(crop)) = (
        window.clamp_to(width, height),
        crop_window(image, window, crop_size),
    ) else {
        debug!(%window, "skipping window with no pixels inside the image");
        return Ok(WindowOutcome::Skipped);
    };
    let features = extractor.extract(&crop)?;
    if features.len() != classifier.dimension() {
        return Err(DetectionError::DimensionMismatch {
            expected: classifier.dimension(),
            actual: features.len(),
        });
    }
    if classifier.predict(&features)?.is_car() {
        Ok(WindowOutcome::Positive(clamped))
    } else {
        Ok(WindowOutcome::Negative)
    }
}

/// Classify every candidate window and return the positive ones, clamped to
/// the image, in candidate order.
///
/// Windows are evaluated in parallel; the extractor and classifier are only
/// read. Windows without pixels inside the image are skipped and counted. A feature
/// length the classifier was not fitted on aborts the scan.
pub fn scan(
    image: &RgbImage,
    candidates: &[Rectangle],
    extractor: &dyn FeatureExtractor,
    classifier: &dyn Classifier,
    crop_size: u32,
) -> Result<Vec<Rectangle>, DetectionError> {
    let outcomes: Vec<WindowOutcome> = candidates
        .par_iter()
        .map(|window| classify_window(image, window, extractor, classifier, crop_size))
        .collect::<Result<_, _>>()?;

    let mut positives = Vec::new();
    let mut skipped = 0usize;
    for outcome in outcomes {
        match outcome {
            WindowOutcome::Positive(window) => positives.push(window),
            WindowOutcome::Negative => {}
            WindowOutcome::Skipped => skipped += 1,
        }
    }
    debug!(
        candidates = candidates.len(),
        positives = positives.len(),
        skipped,
        "scan complete"
    );
    Ok(positives)
}
