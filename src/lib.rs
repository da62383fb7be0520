//! # Cube Forge
//!
//! Converts 3D models (glTF/GLB, OBJ, FBX) into cube geometry for Minecraft
//! Bedrock entities.
//!
//! ## Overview
//!
//! A model is imported into a triangle [`Mesh`], normalized to Bedrock's
//! Y-up right-handed convention, voxelized on a fixed grid and greedily
//! merged into axis-aligned boxes. The boxes become a [`GeometryDocument`],
//! which can be written as JSON or packaged with a texture and entity
//! definitions as a `.mcaddon`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cube_forge::{load_model, ConvertOptions, Converter, export_mcaddon};
//!
//! let model = load_model("robot.glb")?;
//! let converter = Converter::new(ConvertOptions::default().with_identifier("geometry.robot"))?;
//! let output = converter.convert_imported(&model)?;
//!
//! std::fs::write("robot.mcaddon", export_mcaddon(&output)?)?;
//! ```
//!
//! ## Working with meshes directly
//!
//! The converter only needs a [`Mesh`], so geometry from any source can be
//! converted:
//!
//! ```ignore
//! use cube_forge::{Mesh, ConvertOptions, Converter};
//!
//! let mesh = Mesh::cuboid([-0.5, 0.0, -0.5], [0.5, 1.0, 0.5]);
//! let output = Converter::new(ConvertOptions::default())?.convert(&mesh)?;
//! println!("{} cubes", output.stats.cubes);
//! ```

pub mod convert;
pub mod error;
pub mod export;
pub mod geometry;
pub mod import;
pub mod mesh;
pub mod types;

// Re-export main types for convenience
pub use convert::{
    ConversionOutput, ConversionStats, ConvertOptions, Converter, FillMode, Occupancy, Placement,
};
pub use error::{ConvertError, Result};
pub use export::{export_geometry_json, export_mcaddon, AddonBundle};
pub use geometry::{Bone, Cube, Description, Geometry, GeometryDocument};
pub use import::{ImportContext, ImportedModel, MeshImporter, ModelFormat};
pub use mesh::Mesh;
pub use types::{BoundingBox, SourceConvention, UvOrigin};

/// Load a model file, detecting its format from the extension or contents.
pub fn load_model<P: AsRef<std::path::Path>>(path: P) -> Result<ImportedModel> {
    import::load_from_path(path)
}

/// Load a model from bytes (for WASM compatibility).
pub fn load_model_from_bytes(data: &[u8], format: Option<ModelFormat>) -> Result<ImportedModel> {
    import::load_from_bytes(data, format)
}

/// Import and convert a model file in one step.
pub fn convert_file<P: AsRef<std::path::Path>>(
    path: P,
    options: ConvertOptions,
) -> Result<ConversionOutput> {
    let converter = Converter::new(options)?;
    let model = load_model(path)?;
    converter.convert_imported(&model)
}

#[cfg(feature = "wasm")]
pub mod wasm;
