use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::hog::{HogOptions, hog};

use crate::error::FeatureError;

/// Downsample the crop and flatten every channel into one vector
pub fn bin_spatial(img: &RgbImage, size: u32) -> Vec<f32> {
    let small = imageops::resize(img, size, size, FilterType::Triangle);
    small.as_raw().iter().map(|&v| v as f32).collect()
}

/// Per-channel histogram over `[range.0, range.1)`, channels concatenated.
/// The top edge of the last bin is inclusive; values outside the range are dropped.
pub fn color_hist(img: &RgbImage, bins: usize, range: (f32, f32)) -> Vec<f32> {
    let mut hist = vec![0.0f32; bins * 3];
    let (lo, hi) = range;
    let span = hi - lo;
    if bins == 0 || span <= 0.0 {
        return hist;
    }

    for pixel in img.pixels() {
        for (channel, &value) in pixel.0.iter().enumerate() {
            let v = value as f32;
            if v < lo || v > hi {
                continue;
            }
            let bin = (((v - lo) / span) * bins as f32) as usize;
            hist[channel * bins + bin.min(bins - 1)] += 1.0;
        }
    }
    hist
}

pub fn channel(img: &RgbImage, index: usize) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        image::Luma([img.get_pixel(x, y)[index]])
    })
}

/// Unsigned-gradient HOG descriptor of one channel; blocks advance one cell at a time
pub fn hog_features(
    gray: &GrayImage,
    orientations: usize,
    pix_per_cell: usize,
    cell_per_block: usize,
) -> Result<Vec<f32>, FeatureError> {
    let options = HogOptions::new(orientations, false, pix_per_cell, cell_per_block, 1);
    hog(gray, options).map_err(|reason| FeatureError::Hog {
        width: gray.width(),
        height: gray.height(),
        reason,
    })
}

/// Length `hog_features` will produce, without computing it
pub fn hog_len(
    crop_size: u32,
    orientations: usize,
    pix_per_cell: usize,
    cell_per_block: usize,
) -> usize {
    if pix_per_cell == 0 || cell_per_block == 0 {
        return 0;
    }
    let cells = crop_size as usize / pix_per_cell;
    if cells < cell_per_block {
        return 0;
    }
    let blocks = cells - cell_per_block + 1;
    blocks * blocks * cell_per_block * cell_per_block * orientations
}
