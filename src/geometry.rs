//! Bedrock entity geometry document.
//!
//! These types serialize to the `minecraft:geometry` JSON schema. Field names
//! and nesting are fixed by the game; optional fields are omitted when absent.

use serde::{Deserialize, Serialize};

/// Geometry format version written to every document.
pub const FORMAT_VERSION: &str = "1.12.0";

/// Name of the single bone every conversion produces.
pub const ROOT_BONE: &str = "root";

/// Top-level geometry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDocument {
    pub format_version: String,
    #[serde(rename = "minecraft:geometry")]
    pub geometry: Vec<Geometry>,
}

impl GeometryDocument {
    /// Wrap a single geometry definition.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            geometry: vec![geometry],
        }
    }

    /// Total number of cubes across all geometries and bones.
    pub fn cube_count(&self) -> usize {
        self.geometry
            .iter()
            .flat_map(|g| &g.bones)
            .map(|b| b.cubes.len())
            .sum()
    }

    /// Find a bone by name in the first geometry.
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.geometry.first()?.bones.iter().find(|b| b.name == name)
    }
}

/// One geometry definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub description: Description,
    pub bones: Vec<Bone>,
}

/// Geometry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    /// Identifier such as `geometry.my_model`.
    pub identifier: String,
    pub texture_width: u32,
    pub texture_height: u32,
    /// Culling bounds width in blocks.
    pub visible_bounds_width: f32,
    /// Culling bounds height in blocks.
    pub visible_bounds_height: f32,
    /// Culling bounds center in blocks.
    pub visible_bounds_offset: [f32; 3],
}

/// A named part with a pivot and cubes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub pivot: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    #[serde(default)]
    pub cubes: Vec<Cube>,
}

impl Bone {
    /// A bone with no parent at the origin.
    pub fn root(cubes: Vec<Cube>) -> Self {
        Self {
            name: ROOT_BONE.to_string(),
            pivot: [0.0, 0.0, 0.0],
            parent: None,
            rotation: None,
            cubes,
        }
    }
}

/// A box in pixel units (16 per block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    /// Minimal corner.
    pub origin: [f32; 3],
    pub size: [f32; 3],
    /// Texture offset in pixels.
    pub uv: [u32; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<bool>,
}

impl Cube {
    pub fn new(origin: [f32; 3], size: [f32; 3], uv: [u32; 2]) -> Self {
        Self {
            origin,
            size,
            uv,
            pivot: None,
            rotation: None,
            inflate: None,
            mirror: None,
        }
    }
}
