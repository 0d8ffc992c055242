use serde::{Deserialize, Serialize};

use crate::models::Rectangle;

/// One sliding-window pass over a sub-range of the image
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSearch {
    pub x_start: u32,
    pub x_stop: u32,
    pub y_start: u32,
    pub y_stop: u32,
    pub size: u32,
    pub overlap: f32,
    /// Lowest row windows may reach; the image height when unset
    pub max_y: Option<u32>,
}

impl WindowSearch {
    /// Distance between neighbouring windows, `None` for unusable parameters
    pub fn stride(&self) -> Option<u32> {
        if self.size == 0 || !(0.0..1.0).contains(&self.overlap) {
            return None;
        }
        let stride = (self.size as f32 * (1.0 - self.overlap)).round() as u32;
        (stride > 0).then_some(stride)
    }
}

/// Square windows of `search.size`, row-major, covering the search range.
/// Windows that would cross `x_stop` or the vertical limit are dropped.
/// Degenerate parameters give an empty list.
pub fn slide_window(height: u32, search: &WindowSearch) -> Vec<Rectangle> {
    let Some(stride) = search.stride() else {
        return Vec::new();
    };
    let y_limit = search.y_stop.min(search.max_y.unwrap_or(height));
    if search.x_stop <= search.x_start || y_limit <= search.y_start {
        return Vec::new();
    }

    // sums that overflow u32 end the row or column
    let fits = |start: u32, stop: u32| {
        start
            .checked_add(search.size)
            .is_some_and(|end| end <= stop)
    };

    let mut windows = Vec::new();
    let mut y = search.y_start;
    while fits(y, y_limit) {
        let mut x = search.x_start;
        while fits(x, search.x_stop) {
            windows.push(Rectangle::square(x, y, search.size));
            match x.checked_add(stride) {
                Some(next) => x = next,
                None => break,
            }
        }
        match y.checked_add(stride) {
            Some(next) => y = next,
            None => break,
        }
    }
    windows
}

/// One perspective-tuned scale of the multi-scale search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowScale {
    pub size: u32,
    pub overlap: f32,
    /// First row searched, as a fraction of the image height
    pub y_start_fraction: f32,
    /// Rows covered below `y_start`, in window sizes
    pub rows: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub scales: Vec<WindowScale>,
    /// Vertical cutoff as a fraction of the image height
    pub max_y_fraction: f32,
    /// Let windows run past the right edge by one window size;
    /// the scanner clamps them to the image
    pub extend_past_right_edge: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let scale = |size, overlap| WindowScale {
            size,
            overlap,
            y_start_fraction: 9.0 / 16.0,
            rows: 4,
        };
        Self {
            scales: vec![
                scale(64, 0.0),
                scale(96, 0.5),
                scale(128, 0.65),
                scale(160, 0.8),
            ],
            max_y_fraction: 0.9,
            extend_past_right_edge: true,
        }
    }
}

impl SearchConfig {
    /// The per-scale searches for an image of the given size
    pub fn searches(&self, width: u32, height: u32) -> Vec<WindowSearch> {
        let max_y = (height as f32 * self.max_y_fraction).round() as u32;
        self.scales
            .iter()
            .map(|scale| {
                let y_start = (height as f32 * scale.y_start_fraction).round() as u32;
                let x_stop = if self.extend_past_right_edge {
                    width.saturating_add(scale.size)
                } else {
                    width
                };
                WindowSearch {
                    x_start: 0,
                    x_stop,
                    y_start,
                    y_stop: y_start.saturating_add(scale.rows.saturating_mul(scale.size)),
                    size: scale.size,
                    overlap: scale.overlap,
                    max_y: Some(max_y),
                }
            })
            .collect()
    }
}

/// Every scale's windows concatenated into one candidate list
pub fn generate_candidates(width: u32, height: u32, config: &SearchConfig) -> Vec<Rectangle> {
    config
        .searches(width, height)
        .iter()
        .flat_map(|search| slide_window(height, search))
        .collect()
}
