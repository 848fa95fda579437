use crate::geometry::OrientedBox;

/// Fitted angle beyond which a crop is assumed to lie on its side
pub const LANDSCAPE_ANGLE_LIMIT: f64 = 45.0;

/// Decides whether a deskewed crop gets a final quarter turn clockwise
pub trait OrientationPolicy {
    fn should_rotate_for_landscape(&self, rect: &OrientedBox) -> bool;
}

/// Treat every sub-photo as nominally landscape.
///
/// Rotates when the fitted box is taller than wide, or when its angle
/// exceeds [`LANDSCAPE_ANGLE_LIMIT`]. Genuinely portrait photos end up
/// lying on their side; this is a known limitation of the heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandscapeHeuristic;

impl OrientationPolicy for LandscapeHeuristic {
    fn should_rotate_for_landscape(&self, rect: &OrientedBox) -> bool {
        rect.width() < rect.height() || rect.angle_degrees > LANDSCAPE_ANGLE_LIMIT
    }
}

/// Leave every crop as it comes out of the deskew
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepOrientation;

impl OrientationPolicy for KeepOrientation {
    fn should_rotate_for_landscape(&self, _rect: &OrientedBox) -> bool {
        false
    }
}
