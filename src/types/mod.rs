//! Shared types used throughout the library.

mod convention;
mod direction;

pub use convention::{Handedness, SourceConvention, UpAxis, UvOrigin};
pub use direction::{Axis, Direction};

/// A cell of the voxel grid.
///
/// Cell `(x, y, z)` covers `[x, x + 1) × [y, y + 1) × [z, z + 1)` in grid
/// units; one grid unit is `1 / resolution` world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the neighboring cell in the given direction.
    pub fn neighbor(&self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Offset this cell by `amount` cells along `axis`.
    pub fn offset_along(&self, axis: Axis, amount: i32) -> Self {
        let mut out = *self;
        match axis {
            Axis::X => out.x += amount,
            Axis::Y => out.y += amount,
            Axis::Z => out.z += amount,
        }
        out
    }

    /// Coordinate along an axis.
    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Key for the merger's visiting order: Y, then Z, then X.
    pub fn yzx(&self) -> (i32, i32, i32) {
        (self.y, self.z, self.x)
    }

    /// World-space position of this cell's minimal corner.
    pub fn min_corner(&self, cell_size: f32) -> [f32; 3] {
        [
            self.x as f32 * cell_size,
            self.y as f32 * cell_size,
            self.z as f32 * cell_size,
        ]
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// The degenerate box used for empty meshes (min = max = origin).
    pub fn empty() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }

    pub fn from_points(points: impl Iterator<Item = [f32; 3]>) -> Option<Self> {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        let mut has_points = false;

        for p in points {
            has_points = true;
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }

        if has_points {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn dimensions(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Check if all three dimensions are zero.
    pub fn is_degenerate(&self) -> bool {
        self.dimensions().iter().all(|d| *d == 0.0)
    }
}
