//! Intermediate mesh representation shared by importers and the converter.
//!
//! Every importer produces a [`Mesh`]; the conversion pipeline only ever sees
//! this type, which keeps the core independent of the source file format.

use crate::error::{ConvertError, Result};
use crate::types::{BoundingBox, UvOrigin};
use glam::{Mat3, Vec3};

/// A triangle mesh stored as flat attribute buffers.
///
/// `positions` holds three floats per vertex. `normals` is either empty or the
/// same length as `positions`; `uvs` is either empty or two floats per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z per vertex).
    pub positions: Vec<f32>,
    /// Vertex normals (x, y, z per vertex), or empty.
    pub normals: Vec<f32>,
    /// Texture coordinates (u, v per vertex), or empty.
    pub uvs: Vec<f32>,
    /// Triangle indices (3 per triangle).
    pub indices: Vec<u32>,
    /// Where UV (0, 0) sits on the source texture.
    pub uv_origin: UvOrigin,
    /// Base colour of the source material (linear RGBA), if any.
    pub base_color: Option<[f32; 4]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an axis-aligned box with outward-facing counter-clockwise triangles.
    pub fn cuboid(min: [f32; 3], max: [f32; 3]) -> Self {
        let mut mesh = Mesh::new();
        for i in 0..8 {
            mesh.add_vertex([
                if i & 1 == 0 { min[0] } else { max[0] },
                if i & 2 == 0 { min[1] } else { max[1] },
                if i & 4 == 0 { min[2] } else { max[2] },
            ]);
        }
        const FACES: [[u32; 3]; 12] = [
            [0, 4, 6], [0, 6, 2], // -X
            [1, 3, 7], [1, 7, 5], // +X
            [0, 1, 5], [0, 5, 4], // -Y
            [2, 6, 7], [2, 7, 3], // +Y
            [0, 2, 3], [0, 3, 1], // -Z
            [4, 5, 7], [4, 7, 6], // +Z
        ];
        for [a, b, c] in FACES {
            mesh.add_triangle(a, b, c);
        }
        mesh
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, position: [f32; 3]) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.extend_from_slice(&position);
        index
    }

    /// Add a triangle by vertex indices.
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get the number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    /// Position of a vertex.
    pub fn position(&self, index: usize) -> [f32; 3] {
        let i = index * 3;
        [self.positions[i], self.positions[i + 1], self.positions[i + 2]]
    }

    /// Iterate over triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Iterate over triangles as corner positions.
    pub fn triangle_positions(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.triangles().map(move |[a, b, c]| {
            [
                Vec3::from_array(self.position(a as usize)),
                Vec3::from_array(self.position(b as usize)),
                Vec3::from_array(self.position(c as usize)),
            ]
        })
    }

    /// Bounding box of all positions; degenerate at the origin for an empty mesh.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points((0..self.vertex_count()).map(|i| self.position(i)))
            .unwrap_or_else(BoundingBox::empty)
    }

    /// Signed volume enclosed by the triangles.
    ///
    /// Positive when a closed mesh has outward-facing counter-clockwise winding.
    pub fn signed_volume(&self) -> f32 {
        self.triangle_positions()
            .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
            .sum()
    }

    /// Check buffer lengths and index bounds.
    pub fn validate(&self) -> Result<()> {
        if self.positions.len() % 3 != 0 {
            return Err(ConvertError::InvalidMesh(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(ConvertError::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertices = self.vertex_count();
        if self.has_normals() && self.normals.len() != vertices * 3 {
            return Err(ConvertError::InvalidMesh(format!(
                "{} normal components for {} vertices",
                self.normals.len(),
                vertices
            )));
        }
        if self.has_uvs() && self.uvs.len() != vertices * 2 {
            return Err(ConvertError::InvalidMesh(format!(
                "{} UV components for {} vertices",
                self.uvs.len(),
                vertices
            )));
        }
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(ConvertError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad, vertices
            )));
        }
        if self.positions.iter().any(|p| !p.is_finite()) {
            return Err(ConvertError::InvalidMesh(
                "non-finite vertex position".to_string(),
            ));
        }
        Ok(())
    }

    /// Append another mesh, offsetting its indices.
    ///
    /// Attributes present on only one side are zero-filled on the other.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertex_count() as u32;
        let ours = self.vertex_count();
        let theirs = other.vertex_count();

        merge_attribute(&mut self.normals, ours, &other.normals, theirs, 3);
        merge_attribute(&mut self.uvs, ours, &other.uvs, theirs, 2);

        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + offset));

        if self.base_color.is_none() {
            self.base_color = other.base_color;
        }
    }

    /// Copy with every position multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Mesh {
        let mut out = self.clone();
        for p in &mut out.positions {
            *p *= factor;
        }
        out
    }

    /// Copy with every position moved by `offset`.
    pub fn translated(&self, offset: [f32; 3]) -> Mesh {
        let mut out = self.clone();
        for vertex in out.positions.chunks_exact_mut(3) {
            vertex[0] += offset[0];
            vertex[1] += offset[1];
            vertex[2] += offset[2];
        }
        out
    }

    /// Copy with positions and normals mapped by a linear transform.
    ///
    /// Normals are renormalized afterwards; zero normals stay zero. When the
    /// transform mirrors space the triangle winding is reversed so faces keep
    /// pointing outwards.
    pub fn transformed(&self, linear: Mat3) -> Mesh {
        let mut out = self.clone();
        for vertex in out.positions.chunks_exact_mut(3) {
            let p = linear * Vec3::new(vertex[0], vertex[1], vertex[2]);
            vertex.copy_from_slice(&p.to_array());
        }

        let normal_map = linear.inverse().transpose();
        for normal in out.normals.chunks_exact_mut(3) {
            let n = (normal_map * Vec3::new(normal[0], normal[1], normal[2])).normalize_or_zero();
            normal.copy_from_slice(&n.to_array());
        }

        if linear.determinant() < 0.0 {
            out.flip_winding();
        }
        out
    }

    /// Swap the second and third index of every triangle.
    pub fn flip_winding(&mut self) {
        for triangle in self.indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }

    /// Flip texture V coordinates (`v' = 1 - v`).
    pub fn flip_v(&mut self) {
        for uv in self.uvs.chunks_exact_mut(2) {
            uv[1] = 1.0 - uv[1];
        }
    }
}

fn merge_attribute(
    dst: &mut Vec<f32>,
    dst_vertices: usize,
    src: &[f32],
    src_vertices: usize,
    width: usize,
) {
    if dst.is_empty() && src.is_empty() {
        return;
    }
    if dst.is_empty() {
        dst.resize(dst_vertices * width, 0.0);
    }
    if src.is_empty() {
        dst.resize(dst.len() + src_vertices * width, 0.0);
    } else {
        dst.extend_from_slice(src);
    }
}
