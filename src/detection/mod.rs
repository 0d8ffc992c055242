pub mod heatmap;
pub mod regions;
pub mod scanner;
pub mod windows;

use std::sync::Arc;

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, info, info_span};

use crate::classifier::{Classifier, ModelBundle};
use crate::config::DetectorConfig;
use crate::error::DetectionError;
use crate::features::{FeatureExtractor, HogColorFeatures};
use crate::models::{BoundingBox, Rectangle};
use crate::pipeline::{DebugConfig, PipelineContext, RunStage};
use crate::render;

use heatmap::{Heatmap, HeatmapConfig};

/// Result of heatmap aggregation for one image
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub heatmap: Heatmap,
    /// `None` when no detection contributed any heat
    pub mask: Option<GrayImage>,
    pub boxes: Vec<BoundingBox>,
}

/// Build a fresh heatmap from the positives, threshold it and extract one
/// box per surviving connected region.
pub fn aggregate(
    width: u32,
    height: u32,
    positives: &[Rectangle],
    config: &HeatmapConfig,
) -> Aggregation {
    let heatmap = Heatmap::from_detections(width, height, positives, config.weight);
    let mask = heatmap.threshold(config.threshold_fraction);
    let boxes = match &mask {
        Some(mask) => regions::extract_regions(mask, config.connectivity, config.min_area),
        None => Vec::new(),
    };
    Aggregation {
        heatmap,
        mask,
        boxes,
    }
}

/// Everything one image run produced
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub candidates: Vec<Rectangle>,
    pub positives: Vec<Rectangle>,
    pub heatmap: Heatmap,
    pub mask: Option<GrayImage>,
    pub boxes: Vec<BoundingBox>,
}

/// Per-image orchestrator: windows → scan → heatmap → threshold → boxes.
///
/// The extractor and classifier are shared read-only; every call to
/// `detect` owns its own candidate list and heatmap.
pub struct VehicleDetector {
    extractor: Arc<dyn FeatureExtractor>,
    classifier: Arc<dyn Classifier>,
    config: DetectorConfig,
    context: PipelineContext,
}

impl VehicleDetector {
    /// Fails when the extractor's vector length differs from what the
    /// classifier was fitted on.
    pub fn new(
        extractor: Arc<dyn FeatureExtractor>,
        classifier: Arc<dyn Classifier>,
        config: DetectorConfig,
    ) -> Result<Self, DetectionError> {
        if extractor.feature_len() != classifier.dimension() {
            return Err(DetectionError::DimensionMismatch {
                expected: classifier.dimension(),
                actual: extractor.feature_len(),
            });
        }
        Ok(Self {
            extractor,
            classifier,
            config,
            context: PipelineContext::default(),
        })
    }

    /// Detector using the feature parameters stored with the model
    pub fn from_bundle(bundle: ModelBundle, mut config: DetectorConfig) -> Result<Self> {
        config.features = bundle.features.clone();
        let extractor = HogColorFeatures::new(bundle.features)?;
        Ok(Self::new(Arc::new(extractor), Arc::new(bundle.model), config)?)
    }

    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.context.debug = Some(debug);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run the whole pipeline on one image
    pub fn detect(&self, image: &RgbImage, image_name: &str) -> Result<DetectionReport> {
        let span = info_span!("detect", image = image_name);
        let _guard = span.enter();
        let (width, height) = image.dimensions();

        let mut stage = RunStage::Idle;
        if self.context.debug_enabled() {
            self.context
                .save_debug(stage, image_name, &DynamicImage::ImageRgb8(image.clone()))?;
        }

        let candidates = windows::generate_candidates(width, height, &self.config.search);
        stage = self.advance(stage, candidates.len());
        if self.context.debug_enabled() {
            let overlay = render::draw_rectangles(image, &candidates, render::WHITE, 1);
            self.context
                .save_debug(stage, image_name, &DynamicImage::ImageRgb8(overlay))?;
        }

        // all windows are scanned before any heat is accumulated
        let positives = scanner::scan(
            image,
            &candidates,
            self.extractor.as_ref(),
            self.classifier.as_ref(),
            self.config.features.crop_size,
        )
        .with_context(|| format!("Failed to scan {}", image_name))?;
        stage = self.advance(stage, positives.len());
        if self.context.debug_enabled() {
            let overlay = render::draw_rectangles(image, &positives, render::WHITE, 4);
            self.context
                .save_debug(stage, image_name, &DynamicImage::ImageRgb8(overlay))?;
        }

        let Aggregation {
            heatmap,
            mask,
            boxes,
        } = aggregate(width, height, &positives, &self.config.heatmap);
        stage = self.advance(stage, positives.len());
        if self.context.debug_enabled() {
            let heat = render::heatmap_image(&heatmap);
            self.context
                .save_debug(stage, image_name, &DynamicImage::ImageLuma8(heat))?;
        }

        stage = self.advance(stage, mask.is_some() as usize);
        if let (true, Some(mask)) = (self.context.debug_enabled(), &mask) {
            let overlay = render::mask_overlay(image, mask);
            self.context
                .save_debug(stage, image_name, &DynamicImage::ImageRgb8(overlay))?;
        }

        stage = self.advance(stage, boxes.len());
        if self.context.debug_enabled() {
            let rects: Vec<Rectangle> = boxes.iter().map(|b| b.rect).collect();
            let overlay = render::draw_rectangles(image, &rects, render::GREEN, 4);
            self.context
                .save_debug(stage, image_name, &DynamicImage::ImageRgb8(overlay))?;
        }

        info!(
            candidates = candidates.len(),
            positives = positives.len(),
            vehicles = boxes.len(),
            "detection finished"
        );
        self.advance(stage, 0);

        Ok(DetectionReport {
            candidates,
            positives,
            heatmap,
            mask,
            boxes,
        })
    }

    fn advance(&self, stage: RunStage, items: usize) -> RunStage {
        let next = stage.next();
        debug!(from = %stage, to = %next, items, "stage transition");
        next
    }
}
