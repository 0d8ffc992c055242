use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::heatmap::Heatmap;
use crate::models::Rectangle;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Copy of `img` with every rectangle outlined `thickness` pixels wide
pub fn draw_rectangles(
    img: &RgbImage,
    rects: &[Rectangle],
    color: Rgb<u8>,
    thickness: u32,
) -> RgbImage {
    let mut labeled = img.clone();
    for r in rects.iter().filter(|r| !r.is_degenerate()) {
        for inset in 0..thickness {
            let w = r.width().saturating_sub(2 * inset);
            let h = r.height().saturating_sub(2 * inset);
            if w == 0 || h == 0 {
                break;
            }
            let outline = Rect::at((r.x1 + inset) as i32, (r.y1 + inset) as i32).of_size(w, h);
            draw_hollow_rect_mut(&mut labeled, outline, color);
        }
    }
    labeled
}

/// Heat scaled so the hottest pixel is white
pub fn heatmap_image(heatmap: &Heatmap) -> GrayImage {
    let max = heatmap.max();
    GrayImage::from_fn(heatmap.width(), heatmap.height(), |x, y| {
        if max > 0.0 {
            Luma([(heatmap.get(x, y) / max * 255.0).round() as u8])
        } else {
            Luma([0])
        }
    })
}

/// Half-and-half blend of the image with the mask painted into the red channel
pub fn mask_overlay(img: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgb([r, g, b]) = *img.get_pixel(x, y);
        let hot = mask
            .get_pixel_checked(x, y)
            .map(|p| p[0] as u16)
            .unwrap_or(0);
        Rgb([
            ((r as u16 + hot) / 2) as u8,
            g / 2,
            b / 2,
        ])
    })
}
