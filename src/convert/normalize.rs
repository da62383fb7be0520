//! Coordinate and unit normalization.
//!
//! Maps a mesh from its source convention onto Bedrock's: Y-up,
//! right-handed, top-left UV origin, scaled into block units.

use crate::mesh::Mesh;
use crate::types::{Handedness, SourceConvention, UpAxis, UvOrigin};
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Where the canonical mesh is placed after remapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Keep the source coordinates.
    Preserve,
    /// Centre on X/Z and rest the lowest point on `y = 0`.
    #[default]
    Grounded,
}

/// Linear map from a source convention to Y-up right-handed.
///
/// Z-up sources are rotated (`y' = z`, `z' = -y`); left-handed sources then
/// have Z negated.
pub fn convention_matrix(convention: SourceConvention) -> Mat3 {
    let up = match convention.up_axis() {
        UpAxis::Y => Mat3::IDENTITY,
        UpAxis::Z => Mat3::from_cols(Vec3::X, Vec3::NEG_Z, Vec3::Y),
    };
    let hand = match convention.handedness() {
        Handedness::Right => Mat3::IDENTITY,
        Handedness::Left => Mat3::from_diagonal(Vec3::new(1.0, 1.0, -1.0)),
    };
    hand * up
}

/// Produce the canonical mesh for the converter.
///
/// `scale` must already be validated as positive and finite.
pub fn normalize(
    mesh: &Mesh,
    convention: SourceConvention,
    scale: f32,
    placement: Placement,
) -> Mesh {
    let mut out = mesh.transformed(convention_matrix(convention)).scaled(scale);

    if out.uv_origin == UvOrigin::BottomLeft {
        out.flip_v();
        out.uv_origin = UvOrigin::TopLeft;
    }

    if placement == Placement::Grounded && !out.is_empty() {
        let bounds = out.bounding_box();
        let center = bounds.center();
        out = out.translated([-center[0], -bounds.min[1], -center[2]]);
    }

    out
}
