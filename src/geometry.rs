use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use nalgebra::{Matrix3, Vector2, Vector3};

use crate::detection::Boundary;

/// Range the fitted angle is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleConvention {
    /// Angles in [-90, 0); an axis-aligned box reports -90
    #[default]
    Legacy,
    /// Angles in (0, 90]; an axis-aligned box reports 90
    Modern,
}

/// Minimum-area rectangle around a boundary.
///
/// `angle_degrees` is the direction of the `width` side, measured in image
/// coordinates (y pointing down). Width and height are not ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: (f64, f64),
    pub size: (f64, f64),
    pub angle_degrees: f64,
}

impl OrientedBox {
    pub fn width(&self) -> f64 {
        self.size.0
    }

    pub fn height(&self) -> f64 {
        self.size.1
    }

    pub fn area(&self) -> f64 {
        self.size.0 * self.size.1
    }

    /// Build a box from one side direction and the extents along / across it
    fn from_side(
        center: (f64, f64),
        side_degrees: f64,
        along: f64,
        across: f64,
        convention: AngleConvention,
    ) -> Self {
        // A side and its reverse describe the same box
        let mut phi = side_degrees;
        while phi >= 90.0 {
            phi -= 180.0;
        }
        while phi < -90.0 {
            phi += 180.0;
        }

        let (angle_degrees, size) = match convention {
            AngleConvention::Legacy => {
                if phi < 0.0 {
                    (phi, (along, across))
                } else {
                    (phi - 90.0, (across, along))
                }
            }
            AngleConvention::Modern => {
                if phi == -90.0 {
                    (90.0, (along, across))
                } else if phi > 0.0 {
                    (phi, (along, across))
                } else {
                    (phi + 90.0, (across, along))
                }
            }
        };

        Self {
            center,
            size,
            angle_degrees,
        }
    }
}

/// Fit the minimum-area enclosing rectangle (rotating calipers over the convex hull)
pub fn min_area_rect(boundary: &Boundary, convention: AngleConvention) -> OrientedBox {
    if boundary.points.is_empty() {
        return OrientedBox::from_side((0.0, 0.0), 0.0, 0.0, 0.0, convention);
    }

    let hull: Vec<Vector2<f64>> = convex_hull(boundary.points.as_slice())
        .iter()
        .map(|p: &Point<i32>| Vector2::new(p.x as f64, p.y as f64))
        .collect();

    if hull.len() < 3 {
        return axis_aligned_box(&boundary.points, convention);
    }

    let n = hull.len();
    let mut best: Option<(f64, OrientedBox)> = None;

    for i in 0..n {
        let origin = hull[i];
        let edge = hull[(i + 1) % n] - origin;
        let length = edge.norm();
        if length < f64::EPSILON {
            continue;
        }

        let along = edge / length;
        let across = Vector2::new(-along.y, along.x);

        let mut min_a = f64::INFINITY;
        let mut max_a = f64::NEG_INFINITY;
        let mut min_c = f64::INFINITY;
        let mut max_c = f64::NEG_INFINITY;
        for point in &hull {
            let rel = point - origin;
            let a = rel.dot(&along);
            let c = rel.dot(&across);
            min_a = min_a.min(a);
            max_a = max_a.max(a);
            min_c = min_c.min(c);
            max_c = max_c.max(c);
        }

        let extent_along = max_a - min_a;
        let extent_across = max_c - min_c;
        let area = extent_along * extent_across;

        if best.as_ref().map_or(true, |(best_area, _)| area < *best_area) {
            let center = origin
                + along * ((min_a + max_a) / 2.0)
                + across * ((min_c + max_c) / 2.0);
            let side_degrees = along.y.atan2(along.x).to_degrees();
            let rect = OrientedBox::from_side(
                (center.x, center.y),
                side_degrees,
                extent_along,
                extent_across,
                convention,
            );
            best = Some((area, rect));
        }
    }

    match best {
        Some((_, rect)) => rect,
        None => axis_aligned_box(&boundary.points, convention),
    }
}

/// Fallback for collinear or single-point outlines
fn axis_aligned_box(points: &[Point<i32>], convention: AngleConvention) -> OrientedBox {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0) as f64;
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0) as f64;
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0) as f64;
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0) as f64;

    OrientedBox::from_side(
        ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
        0.0,
        max_x - min_x,
        max_y - min_y,
        convention,
    )
}

/// Rotation about `center` that brings a side at `angle_degrees` onto the x axis.
///
/// Same layout as the classic 2x3 rotation matrix, extended to 3x3:
/// `[cos, sin, (1-cos)*cx - sin*cy; -sin, cos, sin*cx + (1-cos)*cy]`.
pub fn rotation_matrix(center: (f64, f64), angle_degrees: f64) -> Matrix3<f64> {
    let (cx, cy) = center;
    let (sin, cos) = angle_degrees.to_radians().sin_cos();

    let translate_to_origin = Matrix3::new(
        1.0, 0.0, -cx,
        0.0, 1.0, -cy,
        0.0, 0.0, 1.0,
    );

    let rotate = Matrix3::new(
        cos, sin, 0.0,
        -sin, cos, 0.0,
        0.0, 0.0, 1.0,
    );

    let translate_back = Matrix3::new(
        1.0, 0.0, cx,
        0.0, 1.0, cy,
        0.0, 0.0, 1.0,
    );

    translate_back * rotate * translate_to_origin
}

/// Transform a point using the affine matrix
pub fn transform_point(matrix: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let p = Vector3::new(x, y, 1.0);
    let result = matrix * p;
    (result.x / result.z, result.y / result.z)
}

/// Integer bounds of the transformed `width x height` frame: `(new_width, new_height, min_x, min_y)`.
///
/// Coordinates within 1e-9 of an integer are snapped first, so exact
/// quarter turns do not grow the canvas by a pixel of rounding noise.
pub fn compute_output_bounds(
    matrix: &Matrix3<f64>,
    width: u32,
    height: u32,
) -> (u32, u32, f64, f64) {
    const SNAP: f64 = 1e-9;

    let corners = [
        (0.0, 0.0),
        (width as f64, 0.0),
        (0.0, height as f64),
        (width as f64, height as f64),
    ];

    let transformed: Vec<(f64, f64)> = corners
        .iter()
        .map(|&(x, y)| transform_point(matrix, x, y))
        .collect();

    let min_x = transformed.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = transformed.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = transformed.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = transformed.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let min_x = (min_x + SNAP).floor();
    let min_y = (min_y + SNAP).floor();
    let new_width = ((max_x - SNAP).ceil() - min_x).max(1.0) as u32;
    let new_height = ((max_y - SNAP).ceil() - min_y).max(1.0) as u32;

    (new_width, new_height, min_x, min_y)
}
