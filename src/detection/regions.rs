use image::{GrayImage, Luma};
use imageproc::region_labelling::connected_components;

use super::heatmap::Connectivity;
use crate::models::{BoundingBox, Point, Rectangle};

/// Running extent of one labelled region
#[derive(Debug, Clone)]
struct RegionStats {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    pixel_count: u32,
    sum_x: u64,
    sum_y: u64,
}

impl RegionStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixel_count: 0,
            sum_x: 0,
            sum_y: 0,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.pixel_count += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
    }

    fn into_bounding_box(self) -> BoundingBox {
        let n = self.pixel_count as f64;
        BoundingBox {
            rect: Rectangle::new(self.min_x, self.min_y, self.max_x + 1, self.max_y + 1),
            // pixel centres sit half a pixel inside the integer grid
            centroid: Point {
                x: (self.sum_x as f64 / n + 0.5) as f32,
                y: (self.sum_y as f64 / n + 0.5) as f32,
            },
            pixel_count: self.pixel_count,
        }
    }
}

/// Connected foreground regions of a binary mask with at least `min_area` pixels.
///
/// Regions come out in the order a top-to-bottom, left-to-right raster scan
/// first reaches them.
pub fn extract_regions(
    mask: &GrayImage,
    connectivity: Connectivity,
    min_area: u32,
) -> Vec<BoundingBox> {
    let labeled = connected_components(mask, connectivity.into(), Luma([0u8]));

    // slot per label, in discovery order
    let mut slots: Vec<Option<usize>> = Vec::new();
    let mut regions: Vec<RegionStats> = Vec::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue; // Skip background
        }
        if label >= slots.len() {
            slots.resize(label + 1, None);
        }
        let index = *slots[label].get_or_insert_with(|| {
            regions.push(RegionStats::new(x, y));
            regions.len() - 1
        });
        regions[index].include(x, y);
    }

    regions
        .into_iter()
        .filter(|r| r.pixel_count >= min_area)
        .map(RegionStats::into_bounding_box)
        .collect()
}
