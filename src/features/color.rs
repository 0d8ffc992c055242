use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Color space the crop is converted to before features are taken.
///
/// Every alternative is encoded back into three 8-bit channels so the
/// histogram range stays `[0, 256)` whatever space is selected: hue is
/// halved into `[0, 180)`, the remaining channels are rescaled to `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Hsv,
    Luv,
    Hls,
    Yuv,
    YCrCb,
}

impl ColorSpace {
    /// Resolve the conversion once, at extractor construction.
    pub fn converter(self) -> Box<dyn ColorConversion> {
        match self {
            ColorSpace::Rgb => Box::new(Identity),
            ColorSpace::Hsv => Box::new(ToHsv),
            ColorSpace::Luv => Box::new(ToLuv),
            ColorSpace::Hls => Box::new(ToHls),
            ColorSpace::Yuv => Box::new(ToYuv),
            ColorSpace::YCrCb => Box::new(ToYCrCb),
        }
    }
}

pub trait ColorConversion: Send + Sync {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3];

    fn convert(&self, img: &RgbImage) -> RgbImage {
        let mut out = img.clone();
        for pixel in out.pixels_mut() {
            *pixel = Rgb(self.convert_pixel(pixel.0));
        }
        out
    }
}

struct Identity;

impl ColorConversion for Identity {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        rgb
    }

    fn convert(&self, img: &RgbImage) -> RgbImage {
        img.clone()
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn unit(rgb: [u8; 3]) -> (f32, f32, f32) {
    (
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    )
}

/// Hue in degrees `[0, 360)` shared by HSV and HLS
fn hue(r: f32, g: f32, b: f32, max: f32, delta: f32) -> f32 {
    if delta == 0.0 {
        return 0.0;
    }
    let h = if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 { h + 360.0 } else { h }
}

struct ToHsv;

impl ColorConversion for ToHsv {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        let (r, g, b) = unit(rgb);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let s = if max > 0.0 { delta / max } else { 0.0 };
        [
            to_u8(hue(r, g, b, max, delta) / 2.0).min(179),
            to_u8(s * 255.0),
            to_u8(max * 255.0),
        ]
    }
}

struct ToHls;

impl ColorConversion for ToHls {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        let (r, g, b) = unit(rgb);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = (max + min) / 2.0;
        let s = if delta == 0.0 {
            0.0
        } else if l < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        [
            to_u8(hue(r, g, b, max, delta) / 2.0).min(179),
            to_u8(l * 255.0),
            to_u8(s * 255.0),
        ]
    }
}

struct ToLuv;

impl ToLuv {
    // D65 white point chromaticity
    const UN: f32 = 0.197_839_8;
    const VN: f32 = 0.468_336_3;

    fn linearize(c: f32) -> f32 {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
}

impl ColorConversion for ToLuv {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        let (r, g, b) = unit(rgb);
        let (r, g, b) = (Self::linearize(r), Self::linearize(g), Self::linearize(b));
        let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
        let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
        let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

        let l = if y > 0.008856 {
            116.0 * y.cbrt() - 16.0
        } else {
            903.3 * y
        };
        let denom = x + 15.0 * y + 3.0 * z;
        let (u, v) = if denom > 0.0 {
            let u_prime = 4.0 * x / denom;
            let v_prime = 9.0 * y / denom;
            (13.0 * l * (u_prime - Self::UN), 13.0 * l * (v_prime - Self::VN))
        } else {
            (0.0, 0.0)
        };

        [
            to_u8(l * 255.0 / 100.0),
            to_u8((u + 134.0) * 255.0 / 354.0),
            to_u8((v + 140.0) * 255.0 / 262.0),
        ]
    }
}

fn luma(rgb: [u8; 3]) -> f32 {
    0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32
}

struct ToYuv;

impl ColorConversion for ToYuv {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        let y = luma(rgb);
        [
            to_u8(y),
            to_u8((rgb[2] as f32 - y) * 0.492 + 128.0),
            to_u8((rgb[0] as f32 - y) * 0.877 + 128.0),
        ]
    }
}

struct ToYCrCb;

impl ColorConversion for ToYCrCb {
    fn convert_pixel(&self, rgb: [u8; 3]) -> [u8; 3] {
        let y = luma(rgb);
        [
            to_u8(y),
            to_u8((rgb[0] as f32 - y) * 0.713 + 128.0),
            to_u8((rgb[2] as f32 - y) * 0.564 + 128.0),
        ]
    }
}
