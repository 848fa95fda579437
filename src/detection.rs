use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

/// Luminance at or above which a pixel is treated as scan background
pub const DEFAULT_BACKGROUND_LEVEL: u8 = 240;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Decides whether a luminance value belongs to a photo (foreground) or the scan bed
pub trait Threshold {
    fn is_foreground(&self, luma: u8) -> bool;
}

/// Inverse global threshold: everything darker than `background_level` is foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedThreshold {
    pub background_level: u8,
}

impl FixedThreshold {
    pub fn new(background_level: u8) -> Self {
        Self { background_level }
    }
}

impl Default for FixedThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_BACKGROUND_LEVEL)
    }
}

impl Threshold for FixedThreshold {
    fn is_foreground(&self, luma: u8) -> bool {
        luma < self.background_level
    }
}

impl<F> Threshold for F
where
    F: Fn(u8) -> bool,
{
    fn is_foreground(&self, luma: u8) -> bool {
        self(luma)
    }
}

/// Outer outline of one connected foreground region, in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub points: Vec<Point<i32>>,
}

impl Boundary {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Area enclosed by the outline (shoelace formula over pixel centers).
    ///
    /// A filled `w x h` block therefore reports `(w - 1) * (h - 1)`.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let twice_area: i64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
            })
            .sum();

        (twice_area as f64 / 2.0).abs()
    }
}

/// Collapse RGB to single-channel luminance (ITU-R BT.601 weights)
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let luma = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }

    gray
}

/// Map every pixel to 255 (foreground) or 0 (background)
pub fn binarize(gray: &GrayImage, threshold: &dyn Threshold) -> GrayImage {
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if threshold.is_foreground(gray.get_pixel(x, y)[0]) {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Outer boundaries of top-level foreground regions.
///
/// Holes and regions nested inside holes of another region are dropped.
pub fn find_external_boundaries(binary: &GrayImage) -> Vec<Boundary> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|contour| {
            matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
        })
        .map(|contour| Boundary::new(contour.points))
        .collect()
}
