use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned pixel rectangle. The top-left corner is inclusive, the
/// bottom-right corner exclusive, so `x2 - x1` is the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rectangle {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Square window of side `size` anchored at `(x, y)`, cut off at `u32::MAX`
    pub fn square(x: u32, y: u32, size: u32) -> Self {
        Self::new(x, y, x.saturating_add(size), y.saturating_add(size))
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_degenerate(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// Clamp the bottom-right corner to an image of the given size.
    /// Returns `None` when nothing of the rectangle is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rectangle> {
        let clamped = Rectangle {
            x1: self.x1.min(width),
            y1: self.y1.min(height),
            x2: self.x2.min(width),
            y2: self.y2.min(height),
        };
        if clamped.is_degenerate() {
            None
        } else {
            Some(clamped)
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.x1 as f32 + self.x2 as f32) / 2.0,
            y: (self.y1 as f32 + self.y2 as f32) / 2.0,
        }
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})-({}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Final detection for one vehicle: the rectangle enclosing a connected
/// heatmap region plus the centroid of that region's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub rect: Rectangle,
    pub centroid: Point,
    pub pixel_count: u32,
}

/// Binary classifier output for one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Car,
    NotCar,
}

impl Prediction {
    pub fn is_car(self) -> bool {
        matches!(self, Prediction::Car)
    }
}
