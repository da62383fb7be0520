//! Triangle mesh voxelization.
//!
//! Rasterizes a canonical mesh into a sparse [`VoxelSet`] on a grid with
//! `resolution` cells per world unit. A cell is occupied when its center is
//! close enough to a triangle; "close" is decided by the [`Occupancy`] test.

use crate::mesh::Mesh;
use crate::types::{Direction, VoxelCoord};
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Padded grids above this many cells skip interior filling.
const MAX_FILL_CELLS: usize = 64 * 1024 * 1024;

/// How a cell is judged to be near a triangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    /// Cell center within 1.5 cells of the triangle's centroid.
    ///
    /// Coarse: large triangles only mark cells around their centroid.
    #[default]
    CentroidDistance,
    /// Cell center within one cell of the closest point on the triangle.
    ///
    /// Produces a closed shell around watertight meshes.
    SurfaceDistance,
}

impl Occupancy {
    /// Proximity radius in grid cells.
    pub fn radius_cells(&self) -> f32 {
        match self {
            Occupancy::CentroidDistance => 1.5,
            Occupancy::SurfaceDistance => 1.0,
        }
    }
}

/// Whether the interior of a closed shell is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Only cells near the surface.
    #[default]
    Shell,
    /// Surface cells plus every cell enclosed by them.
    Solid,
}

/// A set of occupied grid cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoxelSet {
    cells: HashSet<VoxelCoord>,
}

impl VoxelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a cell occupied. Returns `false` if it already was.
    pub fn insert(&mut self, cell: VoxelCoord) -> bool {
        self.cells.insert(cell)
    }

    pub fn contains(&self, cell: &VoxelCoord) -> bool {
        self.cells.contains(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoxelCoord> {
        self.cells.iter()
    }

    /// Cells ordered by Y, then Z, then X.
    pub fn sorted_yzx(&self) -> Vec<VoxelCoord> {
        let mut cells: Vec<_> = self.cells.iter().copied().collect();
        cells.sort_unstable_by_key(VoxelCoord::yzx);
        cells
    }

    /// Inclusive cell bounds, or `None` for an empty set.
    pub fn bounds(&self) -> Option<(VoxelCoord, VoxelCoord)> {
        let mut iter = self.cells.iter();
        let first = *iter.next()?;
        let (mut min, mut max) = (first, first);
        for cell in iter {
            min = VoxelCoord::new(min.x.min(cell.x), min.y.min(cell.y), min.z.min(cell.z));
            max = VoxelCoord::new(max.x.max(cell.x), max.y.max(cell.y), max.z.max(cell.z));
        }
        Some((min, max))
    }

    pub(crate) fn into_cells(self) -> HashSet<VoxelCoord> {
        self.cells
    }
}

impl FromIterator<VoxelCoord> for VoxelSet {
    fn from_iter<I: IntoIterator<Item = VoxelCoord>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl Extend<VoxelCoord> for VoxelSet {
    fn extend<I: IntoIterator<Item = VoxelCoord>>(&mut self, iter: I) {
        self.cells.extend(iter);
    }
}

/// Rasterizes triangle meshes into voxel sets.
#[derive(Debug, Clone)]
pub struct Voxelizer {
    resolution: u32,
    occupancy: Occupancy,
    fill: FillMode,
}

impl Voxelizer {
    /// Create a voxelizer with `resolution` cells per world unit.
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            occupancy: Occupancy::default(),
            fill: FillMode::default(),
        }
    }

    pub fn with_occupancy(mut self, occupancy: Occupancy) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Edge length of one cell in world units.
    pub fn cell_size(&self) -> f32 {
        1.0 / self.resolution as f32
    }

    /// Rasterize every triangle of `mesh`.
    pub fn voxelize(&self, mesh: &Mesh) -> VoxelSet {
        let scale = self.resolution as f32;
        let mut voxels = VoxelSet::new();

        for [a, b, c] in mesh.triangle_positions() {
            self.mark_triangle([a * scale, b * scale, c * scale], &mut voxels);
        }

        let surface = voxels.len();
        if self.fill == FillMode::Solid {
            fill_interior(&mut voxels);
        }

        debug!(
            triangles = mesh.triangle_count(),
            resolution = self.resolution,
            surface,
            total = voxels.len(),
            "voxelized mesh"
        );
        voxels
    }

    /// Mark the cells near one triangle, given in grid units.
    fn mark_triangle(&self, [a, b, c]: [Vec3; 3], voxels: &mut VoxelSet) {
        let radius = self.occupancy.radius_cells();
        let radius_sq = radius * radius;
        let pad = Vec3::splat(radius);

        let (mut lo, mut hi) = (a.min(b).min(c) - pad, a.max(b).max(c) + pad);
        let centroid = (a + b + c) / 3.0;
        if self.occupancy == Occupancy::CentroidDistance {
            // Nothing outside the centroid's neighbourhood can pass the test.
            lo = lo.max(centroid - pad);
            hi = hi.min(centroid + pad);
        }

        let min = lo.floor().as_ivec3();
        let max = hi.floor().as_ivec3();

        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let center = IVec3::new(x, y, z).as_vec3() + Vec3::splat(0.5);
                    let distance_sq = match self.occupancy {
                        Occupancy::CentroidDistance => center.distance_squared(centroid),
                        Occupancy::SurfaceDistance => {
                            center.distance_squared(closest_point_on_triangle(center, a, b, c))
                        }
                    };
                    if distance_sq < radius_sq {
                        voxels.insert(VoxelCoord::new(x, y, z));
                    }
                }
            }
        }
    }
}

/// Closest point to `p` on triangle `abc`.
///
/// Walks the triangle's Voronoi regions (vertices, edges, face). Degenerate
/// triangles fall back to the closest point on their edges.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    if ab.cross(ac).length_squared() <= f32::EPSILON * ab.length_squared() * ac.length_squared()
    {
        return [
            closest_point_on_segment(p, a, b),
            closest_point_on_segment(p, b, c),
            closest_point_on_segment(p, c, a),
        ]
        .into_iter()
        .min_by(|l, r| l.distance_squared(p).total_cmp(&r.distance_squared(p)))
        .unwrap_or(a);
    }

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Mark every empty cell that cannot reach the outside of the shell.
///
/// Flood-fills the empty space from the corner of a grid padded by one cell;
/// whatever the flood never reaches is enclosed.
fn fill_interior(voxels: &mut VoxelSet) {
    let Some((min, max)) = voxels.bounds() else {
        return;
    };
    let origin = VoxelCoord::new(min.x - 1, min.y - 1, min.z - 1);
    let dims = [
        (max.x - min.x + 3) as usize,
        (max.y - min.y + 3) as usize,
        (max.z - min.z + 3) as usize,
    ];
    let total = dims[0].saturating_mul(dims[1]).saturating_mul(dims[2]);
    if total > MAX_FILL_CELLS {
        warn!(cells = total, "voxel grid too large for interior fill, keeping shell only");
        return;
    }

    let index = |cell: VoxelCoord| -> Option<usize> {
        let x = usize::try_from(cell.x - origin.x).ok()?;
        let y = usize::try_from(cell.y - origin.y).ok()?;
        let z = usize::try_from(cell.z - origin.z).ok()?;
        (x < dims[0] && y < dims[1] && z < dims[2]).then(|| x + dims[0] * (y + dims[1] * z))
    };

    const EMPTY: u8 = 0;
    const SHELL: u8 = 1;
    const OUTSIDE: u8 = 2;

    let mut grid = vec![EMPTY; total];
    for cell in voxels.iter() {
        if let Some(i) = index(*cell) {
            grid[i] = SHELL;
        }
    }

    let mut queue = VecDeque::from([origin]);
    grid[0] = OUTSIDE;
    while let Some(cell) = queue.pop_front() {
        for direction in Direction::ALL {
            let next = cell.neighbor(direction);
            if let Some(i) = index(next) {
                if grid[i] == EMPTY {
                    grid[i] = OUTSIDE;
                    queue.push_back(next);
                }
            }
        }
    }

    let before = voxels.len();
    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                if grid[x + dims[0] * (y + dims[1] * z)] == EMPTY {
                    voxels.insert(VoxelCoord::new(
                        origin.x + x as i32,
                        origin.y + y as i32,
                        origin.z + z as i32,
                    ));
                }
            }
        }
    }
    if voxels.len() == before {
        debug!("shell encloses no interior cells");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_small_triangle_marks_cells_near_centroid() {
        let mut mesh = Mesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_vertex([0.1, 0.0, 0.0]);
        mesh.add_vertex([0.0, 0.1, 0.0]);
        mesh.add_triangle(0, 1, 2);

        let voxels = Voxelizer::new(16).voxelize(&mesh);
        assert!(!voxels.is_empty());
        // Centroid at (0.533, 0.533, 0) cells: every marked center lies within 1.5 cells.
        let centroid = Vec3::new(1.6 / 3.0, 1.6 / 3.0, 0.0);
        for cell in voxels.iter() {
            let center = Vec3::new(cell.x as f32 + 0.5, cell.y as f32 + 0.5, cell.z as f32 + 0.5);
            assert!(center.distance(centroid) < 1.5);
        }
        assert!(voxels.contains(&VoxelCoord::new(0, 0, 0)));
        assert!(voxels.contains(&VoxelCoord::new(0, 0, -1)));
    }

    #[test]
    fn test_centroid_heuristic_misses_far_corners_of_large_triangles() {
        let mut mesh = Mesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_vertex([1.0, 0.0, 0.0]);
        mesh.add_vertex([0.0, 1.0, 0.0]);
        mesh.add_triangle(0, 1, 2);

        let coarse = Voxelizer::new(16).voxelize(&mesh);
        let exact = Voxelizer::new(16)
            .with_occupancy(Occupancy::SurfaceDistance)
            .voxelize(&mesh);

        assert!(!coarse.contains(&VoxelCoord::new(0, 0, 0)));
        assert!(exact.contains(&VoxelCoord::new(0, 0, 0)));
        assert!(exact.contains(&VoxelCoord::new(14, 0, 0)));
        assert!(coarse.len() < exact.len());
    }

    #[test]
    fn test_empty_mesh_yields_empty_set() {
        assert!(Voxelizer::new(16).voxelize(&Mesh::new()).is_empty());
    }

    #[test]
    fn test_voxelization_is_deterministic() {
        let mesh = Mesh::cuboid([-0.3, 0.0, -0.7], [0.45, 0.9, 0.2]);
        let voxelizer = Voxelizer::new(32).with_occupancy(Occupancy::SurfaceDistance);
        assert_eq!(voxelizer.voxelize(&mesh), voxelizer.voxelize(&mesh));
    }

    #[test]
    fn test_solid_unit_cube_is_a_filled_block() {
        let mesh = Mesh::cuboid([-0.5; 3], [0.5; 3]);
        let voxels = Voxelizer::new(16)
            .with_occupancy(Occupancy::SurfaceDistance)
            .with_fill(FillMode::Solid)
            .voxelize(&mesh);

        // One cell of shell on each side of the 16-cell cube.
        assert_eq!(voxels.len(), 18 * 18 * 18);
        assert_eq!(
            voxels.bounds(),
            Some((VoxelCoord::new(-9, -9, -9), VoxelCoord::new(8, 8, 8)))
        );
    }

    #[test]
    fn test_shell_mode_leaves_cube_hollow() {
        let mesh = Mesh::cuboid([-0.5; 3], [0.5; 3]);
        let voxels = Voxelizer::new(16)
            .with_occupancy(Occupancy::SurfaceDistance)
            .voxelize(&mesh);
        assert!(!voxels.contains(&VoxelCoord::new(0, 0, 0)));
        assert!(voxels.contains(&VoxelCoord::new(-8, 0, 0)));
    }

    #[test]
    fn test_fill_leaves_open_surfaces_alone() {
        let mut mesh = Mesh::new();
        mesh.add_vertex([0.0, 0.0, 0.0]);
        mesh.add_vertex([1.0, 0.0, 0.0]);
        mesh.add_vertex([0.0, 0.0, 1.0]);
        mesh.add_triangle(0, 1, 2);

        let voxelizer = Voxelizer::new(8).with_occupancy(Occupancy::SurfaceDistance);
        let shell = voxelizer.voxelize(&mesh);
        let solid = voxelizer.clone().with_fill(FillMode::Solid).voxelize(&mesh);
        assert_eq!(shell, solid);
    }

    #[test]
    fn test_closest_point_regions() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        let c = Vec3::Y;

        // Face region
        let p = closest_point_on_triangle(Vec3::new(0.25, 0.25, 1.0), a, b, c);
        assert!((p - Vec3::new(0.25, 0.25, 0.0)).length() < 1e-6);
        // Vertex region
        assert_eq!(closest_point_on_triangle(Vec3::new(-1.0, -1.0, 0.0), a, b, c), a);
        // Edge region
        let p = closest_point_on_triangle(Vec3::new(0.5, -1.0, 0.0), a, b, c);
        assert!((p - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
        // Hypotenuse
        let p = closest_point_on_triangle(Vec3::new(1.0, 1.0, 0.0), a, b, c);
        assert!((p - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_closest_point_on_degenerate_triangle() {
        let a = Vec3::ZERO;
        let b = Vec3::new(2.0, 0.0, 0.0);
        let c = Vec3::new(1.0, 0.0, 0.0);
        let p = closest_point_on_triangle(Vec3::new(1.5, 1.0, 0.0), a, b, c);
        assert!((p - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-6);

        let point = closest_point_on_triangle(Vec3::ONE, a, a, a);
        assert_eq!(point, a);
    }

    #[test]
    fn test_voxel_set_sorted_order() {
        let set: VoxelSet = [
            VoxelCoord::new(1, 0, 0),
            VoxelCoord::new(0, 1, 0),
            VoxelCoord::new(0, 0, 1),
            VoxelCoord::new(0, 0, 0),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            set.sorted_yzx(),
            vec![
                VoxelCoord::new(0, 0, 0),
                VoxelCoord::new(1, 0, 0),
                VoxelCoord::new(0, 0, 1),
                VoxelCoord::new(0, 1, 0),
            ]
        );
    }
}
