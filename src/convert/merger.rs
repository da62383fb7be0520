//! Greedy box merging.
//!
//! Coalesces occupied voxels into axis-aligned boxes. Seeds are visited in
//! (y, z, x) order and each box grows along X, then Y, then Z, taking a whole
//! slab at a time, so the output is deterministic for a given voxel set. The
//! result is not guaranteed to be the minimum number of boxes.

use super::voxelizer::VoxelSet;
use crate::types::{Axis, VoxelCoord};
use std::collections::HashSet;
use tracing::debug;

/// A box of grid cells produced by the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBox {
    /// Minimal cell (the seed).
    pub min: VoxelCoord,
    /// Number of cells along X, Y and Z.
    pub extent: [u32; 3],
}

impl CellBox {
    /// Number of cells covered.
    pub fn volume(&self) -> u64 {
        self.extent.iter().map(|&e| e as u64).product()
    }

    pub fn contains(&self, cell: &VoxelCoord) -> bool {
        Axis::ALL.into_iter().all(|axis| {
            let offset = cell.get(axis) - self.min.get(axis);
            offset >= 0 && (offset as u32) < self.extent[axis.index()]
        })
    }

    /// Iterate over every covered cell.
    pub fn cells(&self) -> impl Iterator<Item = VoxelCoord> + '_ {
        let [ex, ey, ez] = self.extent.map(|e| e as i32);
        let min = self.min;
        (0..ez).flat_map(move |dz| {
            (0..ey).flat_map(move |dy| {
                (0..ex).map(move |dx| VoxelCoord::new(min.x + dx, min.y + dy, min.z + dz))
            })
        })
    }

    /// The one-cell-thick slab just past this box along `axis`.
    fn next_slab(&self, axis: Axis) -> CellBox {
        let mut extent = self.extent;
        extent[axis.index()] = 1;
        CellBox {
            min: self.min.offset_along(axis, self.extent[axis.index()] as i32),
            extent,
        }
    }

    /// Convert to world units.
    pub fn to_cuboid(&self, cell_size: f32) -> Cuboid {
        Cuboid {
            origin: self.min.min_corner(cell_size),
            size: self.extent.map(|e| e as f32 * cell_size),
        }
    }
}

/// An axis-aligned box in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    /// Minimal corner.
    pub origin: [f32; 3],
    /// Edge lengths, all positive.
    pub size: [f32; 3],
}

impl Cuboid {
    /// The stand-in emitted when there is nothing to merge: one block resting on the origin.
    pub fn fallback() -> Self {
        Self {
            origin: [-0.5, 0.0, -0.5],
            size: [1.0, 1.0, 1.0],
        }
    }
}

/// Merges voxel sets into boxes.
#[derive(Debug, Clone)]
pub struct BoxMerger {
    cell_size: f32,
}

impl BoxMerger {
    /// Create a merger for a grid with `resolution` cells per world unit.
    pub fn new(resolution: u32) -> Self {
        Self {
            cell_size: 1.0 / resolution as f32,
        }
    }

    /// Merge voxels into world-space boxes.
    ///
    /// An empty set yields the single [`Cuboid::fallback`] box.
    pub fn merge(&self, voxels: VoxelSet) -> Vec<Cuboid> {
        if voxels.is_empty() {
            debug!("no voxels to merge, emitting fallback box");
            return vec![Cuboid::fallback()];
        }
        self.merge_cells(voxels)
            .iter()
            .map(|b| b.to_cuboid(self.cell_size))
            .collect()
    }

    /// Merge voxels into grid-space boxes.
    pub fn merge_cells(&self, voxels: VoxelSet) -> Vec<CellBox> {
        let voxel_count = voxels.len();
        let order = voxels.sorted_yzx();
        let mut remaining = voxels.into_cells();
        let mut boxes = Vec::new();

        for seed in order {
            if !remaining.contains(&seed) {
                continue;
            }

            let mut cell_box = CellBox {
                min: seed,
                extent: [1, 1, 1],
            };
            for axis in Axis::ALL {
                while slab_available(&remaining, &cell_box.next_slab(axis)) {
                    cell_box.extent[axis.index()] += 1;
                }
            }

            assert!(
                cell_box.extent.iter().all(|&e| e > 0),
                "box merger produced an empty box at {:?}",
                seed
            );

            for cell in cell_box.cells() {
                remaining.remove(&cell);
            }
            boxes.push(cell_box);
        }

        debug!(voxels = voxel_count, boxes = boxes.len(), "merged voxels");
        boxes
    }
}

fn slab_available(remaining: &HashSet<VoxelCoord>, slab: &CellBox) -> bool {
    slab.cells().all(|cell| remaining.contains(&cell))
}
