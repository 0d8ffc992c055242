use image::{GrayImage, Luma};
use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};

use crate::models::Rectangle;

/// Pixel neighbourhood used when grouping thresholded heat into regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl From<Connectivity> for imageproc::region_labelling::Connectivity {
    fn from(c: Connectivity) -> Self {
        match c {
            Connectivity::Four => imageproc::region_labelling::Connectivity::Four,
            Connectivity::Eight => imageproc::region_labelling::Connectivity::Eight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Heat added to every pixel of a positive window
    pub weight: f32,
    /// Pixels at or above `max * threshold_fraction` survive
    pub threshold_fraction: f32,
    /// Regions with fewer pixels are dropped as noise
    pub min_area: u32,
    pub connectivity: Connectivity,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            weight: 20.0,
            threshold_fraction: 0.5,
            min_area: 20,
            connectivity: Connectivity::Eight,
        }
    }
}

/// Accumulated detection heat for one image, indexed `[row, column]`
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    values: Array2<f32>,
}

impl Heatmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            values: Array2::zeros((height as usize, width as usize)),
        }
    }

    pub fn from_detections(width: u32, height: u32, detections: &[Rectangle], weight: f32) -> Self {
        let mut heatmap = Self::new(width, height);
        for rect in detections {
            heatmap.add(rect, weight);
        }
        heatmap
    }

    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    /// Add `weight` to every cell inside `rect`; the part outside the map is ignored
    pub fn add(&mut self, rect: &Rectangle, weight: f32) {
        let Some(r) = rect.clamp_to(self.width(), self.height()) else {
            return;
        };
        let mut region = self.values.slice_mut(s![
            r.y1 as usize..r.y2 as usize,
            r.x1 as usize..r.x2 as usize
        ]);
        region += weight;
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[[y as usize, x as usize]]
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Binary mask (255 = hot) of cells at or above `max * fraction`.
    /// `None` when the map holds no heat at all.
    pub fn threshold(&self, fraction: f32) -> Option<GrayImage> {
        let max = self.max();
        if max <= 0.0 {
            return None;
        }
        let threshold = max * fraction;
        Some(GrayImage::from_fn(self.width(), self.height(), |x, y| {
            if self.get(x, y) >= threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        }))
    }
}
