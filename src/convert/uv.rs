//! Texture atlas placement for boxes.
//!
//! Each box gets a UV offset proportional to where its origin sits inside the
//! mesh bounds. This is a positional placeholder, not an unwrap: boxes that
//! are close together share atlas pixels and their faces overlap on the
//! texture.

use crate::types::BoundingBox;

/// Maps box origins to atlas pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct UvPlacer {
    bounds: BoundingBox,
    atlas: [u32; 2],
}

impl UvPlacer {
    /// `atlas` is the texture size in pixels; both sides must be non-zero.
    pub fn new(bounds: BoundingBox, atlas: [u32; 2]) -> Self {
        Self { bounds, atlas }
    }

    /// `u` follows the X axis across the mesh width, `v` the Y axis across its height.
    pub fn place(&self, origin: [f32; 3]) -> [u32; 2] {
        let [width, height, _] = self.bounds.dimensions();
        [
            atlas_coord(origin[0], self.bounds.min[0], width, self.atlas[0]),
            atlas_coord(origin[1], self.bounds.min[1], height, self.atlas[1]),
        ]
    }
}

fn atlas_coord(value: f32, min: f32, extent: f32, atlas: u32) -> u32 {
    if extent <= 0.0 || !extent.is_finite() {
        return 0;
    }
    let max = atlas.saturating_sub(1) as f32;
    let scaled = ((value - min) / extent * atlas as f32).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, max) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placer() -> UvPlacer {
        UvPlacer::new(BoundingBox::new([-1.0, 0.0, -1.0], [1.0, 2.0, 1.0]), [64, 64])
    }

    #[test]
    fn test_min_corner_maps_to_origin() {
        assert_eq!(placer().place([-1.0, 0.0, -1.0]), [0, 0]);
    }

    #[test]
    fn test_max_corner_is_clamped() {
        assert_eq!(placer().place([1.0, 2.0, 1.0]), [63, 63]);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(placer().place([0.0, 1.0, 0.0]), [32, 32]);
    }

    #[test]
    fn test_outside_bounds_is_clamped() {
        assert_eq!(placer().place([-5.0, 9.0, 0.0]), [0, 63]);
    }

    #[test]
    fn test_degenerate_bounds_map_to_zero() {
        let flat = UvPlacer::new(BoundingBox::new([0.0, 0.0, 0.0], [2.0, 0.0, 2.0]), [64, 32]);
        assert_eq!(flat.place([1.0, 0.0, 1.0]), [32, 0]);

        let point = UvPlacer::new(BoundingBox::empty(), [64, 64]);
        assert_eq!(point.place([3.0, 3.0, 3.0]), [0, 0]);
    }

    #[test]
    fn test_non_square_atlas() {
        let placer = UvPlacer::new(BoundingBox::new([0.0; 3], [1.0; 3]), [128, 16]);
        assert_eq!(placer.place([0.5, 0.5, 0.0]), [64, 8]);
        assert_eq!(placer.place([1.0, 1.0, 0.0]), [127, 15]);
    }
}
