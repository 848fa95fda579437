use image::{DynamicImage, RgbImage};

use crate::detection::{binarize, find_external_boundaries, to_grayscale, FixedThreshold, Threshold};
use crate::geometry::{min_area_rect, rotation_matrix, AngleConvention, OrientedBox};
use crate::naming::{IdGenerator, SubphotoId};
use crate::orientation::{LandscapeHeuristic, OrientationPolicy};
use crate::transform::{crop, crop_window, rotate_clockwise, warp_affine};

/// One upright sub-photo cut out of a scan
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub id: SubphotoId,
    pub image: RgbImage,
    /// Fitted box in source coordinates
    pub region: OrientedBox,
    /// Whether the landscape quarter turn was applied
    pub rotated: bool,
}

/// Detects, deskews and crops the sub-photos of a scanned sheet.
///
/// Holds no per-image state; `extract` is a pure transform apart from
/// drawing identifiers from the supplied generator.
pub struct SubphotoExtractor {
    threshold: Box<dyn Threshold>,
    orientation: Box<dyn OrientationPolicy>,
    convention: AngleConvention,
}

impl Default for SubphotoExtractor {
    fn default() -> Self {
        Self {
            threshold: Box::new(FixedThreshold::default()),
            orientation: Box::new(LandscapeHeuristic),
            convention: AngleConvention::default(),
        }
    }
}

impl SubphotoExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: impl Threshold + 'static) -> Self {
        self.threshold = Box::new(threshold);
        self
    }

    pub fn with_orientation(mut self, orientation: impl OrientationPolicy + 'static) -> Self {
        self.orientation = Box::new(orientation);
        self
    }

    pub fn with_angle_convention(mut self, convention: AngleConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Boxes of all regions whose enclosed area is at least `min_area` (pixel²)
    pub fn detect(&self, image: &RgbImage, min_area: f64) -> Vec<OrientedBox> {
        let gray = to_grayscale(image);
        let binary = binarize(&gray, &*self.threshold);

        let boundaries = find_external_boundaries(&binary);
        log::debug!("Found {} external boundaries", boundaries.len());

        boundaries
            .iter()
            .filter_map(|boundary| {
                let area = boundary.area();
                if area < min_area {
                    log::trace!("Dropping region of area {:.0} (< {:.0})", area, min_area);
                    return None;
                }

                let region = min_area_rect(boundary, self.convention);
                log::debug!(
                    "Region area {:.0}: center ({:.1}, {:.1}), size {:.1}x{:.1}, angle {:.2}°",
                    area,
                    region.center.0,
                    region.center.1,
                    region.width(),
                    region.height(),
                    region.angle_degrees
                );
                Some(region)
            })
            .collect()
    }

    pub fn extract(
        &self,
        image: &DynamicImage,
        min_area: f64,
        ids: &mut dyn IdGenerator,
    ) -> Vec<CroppedImage> {
        self.extract_rgb(&image.to_rgb8(), min_area, ids)
    }

    pub fn extract_rgb(
        &self,
        image: &RgbImage,
        min_area: f64,
        ids: &mut dyn IdGenerator,
    ) -> Vec<CroppedImage> {
        self.detect(image, min_area)
            .into_iter()
            .map(|region| self.cut(image, region, ids.next_id()))
            .collect()
    }

    /// Deskew the whole frame around the region, then cut it out axis-aligned
    fn cut(&self, image: &RgbImage, region: OrientedBox, id: SubphotoId) -> CroppedImage {
        let matrix = rotation_matrix(region.center, region.angle_degrees);
        let deskewed = warp_affine(image, &matrix);

        // The rotation fixes the region center; only the canvas offset moves it
        let upright = OrientedBox {
            center: deskewed.to_canvas(region.center),
            ..region
        };
        let (width, height) = deskewed.image.dimensions();
        let window = crop_window(&upright, width, height);
        let cropped = crop(&deskewed.image, window);

        let rotated = self.orientation.should_rotate_for_landscape(&region);
        let image = if rotated {
            rotate_clockwise(&cropped)
        } else {
            cropped
        };

        CroppedImage {
            id,
            image,
            region,
            rotated,
        }
    }
}
