use image::{imageops, Rgb, RgbImage};
use nalgebra::Matrix3;

use crate::geometry::{compute_output_bounds, transform_point, OrientedBox};

/// Fill for pixels whose pre-image falls outside the source
const BORDER: [f64; 3] = [0.0, 0.0, 0.0];

/// Axis-aligned window inside an image, already clamped to its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Sample with constant-border handling: taps outside the image read as `BORDER`
fn tap(img: &RgbImage, x: i64, y: i64) -> [f64; 3] {
    let (width, height) = img.dimensions();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return BORDER;
    }
    let pixel = img.get_pixel(x as u32, y as u32);
    [pixel[0] as f64, pixel[1] as f64, pixel[2] as f64]
}

/// Bilinear interpolation at a given position
fn bilinear_interpolate(img: &RgbImage, x: f64, y: f64) -> [f64; 3] {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x_frac = x - x.floor();
    let y_frac = y - y.floor();

    let p00 = tap(img, x0, y0);
    let p10 = tap(img, x0 + 1, y0);
    let p01 = tap(img, x0, y0 + 1);
    let p11 = tap(img, x0 + 1, y0 + 1);

    let mut result = [0.0; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - x_frac) + p10[c] * x_frac;
        let bottom = p01[c] * (1.0 - x_frac) + p11[c] * x_frac;
        result[c] = top * (1.0 - y_frac) + bottom * y_frac;
    }

    result
}

/// Warped canvas plus the transformed-space position of its top-left pixel
#[derive(Debug, Clone)]
pub struct WarpedFrame {
    pub image: RgbImage,
    pub origin: (f64, f64),
}

impl WarpedFrame {
    /// Convert a point in transformed coordinates to canvas pixel coordinates
    pub fn to_canvas(&self, point: (f64, f64)) -> (f64, f64) {
        (point.0 - self.origin.0, point.1 - self.origin.1)
    }
}

/// Apply an affine transformation to the whole frame using inverse mapping.
///
/// The canvas grows to the transformed frame's bounds so nothing is cut off;
/// uncovered pixels are black.
pub fn warp_affine(img: &RgbImage, forward_matrix: &Matrix3<f64>) -> WarpedFrame {
    let (width, height) = img.dimensions();

    let inverse_matrix = match forward_matrix.try_inverse() {
        Some(inv) => inv,
        None => {
            log::warn!("Could not invert transform matrix, keeping frame unrotated");
            return WarpedFrame {
                image: img.clone(),
                origin: (0.0, 0.0),
            };
        }
    };

    let (new_width, new_height, min_x, min_y) =
        compute_output_bounds(forward_matrix, width, height);
    let mut output = RgbImage::new(new_width, new_height);

    for (out_x, out_y, pixel) in output.enumerate_pixels_mut() {
        let (src_x, src_y) =
            transform_point(&inverse_matrix, out_x as f64 + min_x, out_y as f64 + min_y);

        // Entirely outside, including the one-pixel blend band
        if src_x <= -1.0 || src_y <= -1.0 || src_x >= width as f64 || src_y >= height as f64 {
            continue;
        }

        let sample = bilinear_interpolate(img, src_x, src_y);
        *pixel = Rgb([
            sample[0].round().clamp(0.0, 255.0) as u8,
            sample[1].round().clamp(0.0, 255.0) as u8,
            sample[2].round().clamp(0.0, 255.0) as u8,
        ]);
    }

    WarpedFrame {
        image: output,
        origin: (min_x, min_y),
    }
}

/// Window of the fitted size centered on the box, clamped to a `frame_width x frame_height` image.
///
/// Sizes and origin are truncated toward zero; any overshoot past an edge
/// shrinks the window instead of failing, so the result may be empty.
pub fn crop_window(rect: &OrientedBox, frame_width: u32, frame_height: u32) -> CropWindow {
    let (cx, cy) = rect.center;
    let width = rect.width().max(0.0) as i64;
    let height = rect.height().max(0.0) as i64;

    let (x, width) = clamp_span((cx - width as f64 / 2.0) as i64, width, frame_width as i64);
    let (y, height) = clamp_span((cy - height as f64 / 2.0) as i64, height, frame_height as i64);

    CropWindow {
        x,
        y,
        width,
        height,
    }
}

fn clamp_span(start: i64, length: i64, limit: i64) -> (u32, u32) {
    let end = (start + length).min(limit);
    let start = start.clamp(0, limit);
    let length = (end - start).max(0);
    (start as u32, length as u32)
}

/// Copy the window out of the frame
pub fn crop(img: &RgbImage, window: CropWindow) -> RgbImage {
    imageops::crop_imm(img, window.x, window.y, window.width, window.height).to_image()
}

/// Quarter turn, clockwise
pub fn rotate_clockwise(img: &RgbImage) -> RgbImage {
    imageops::rotate90(img)
}
