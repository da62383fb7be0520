//! Mesh to cube geometry conversion.
//!
//! The pipeline runs [`normalize`] → [`Voxelizer`] → [`BoxMerger`] →
//! [`UvPlacer`] and assembles the result into a [`GeometryDocument`]. It is
//! synchronous, does no I/O and keeps no state between calls.

pub mod merger;
pub mod normalize;
pub mod uv;
pub mod voxelizer;

pub use merger::{BoxMerger, CellBox, Cuboid};
pub use normalize::{convention_matrix, normalize, Placement};
pub use uv::UvPlacer;
pub use voxelizer::{closest_point_on_triangle, FillMode, Occupancy, VoxelSet, Voxelizer};

use crate::error::{ConvertError, Result};
use crate::geometry::{Bone, Cube, Description, Geometry, GeometryDocument};
use crate::import::ImportedModel;
use crate::mesh::Mesh;
use crate::types::{BoundingBox, SourceConvention};
use serde::Deserialize;
use tracing::{debug, info};

/// Bedrock pixels per block.
pub const UNITS_PER_BLOCK: f32 = 16.0;

/// Padding added to the mesh size for the culling bounds, in blocks.
const VISIBLE_BOUNDS_PADDING: f32 = 1.0;

/// Largest accepted scale factor.
pub const MAX_SCALE: f32 = 10.0;

/// Largest accepted texture edge in pixels.
pub const MAX_TEXTURE_SIZE: u32 = 4096;

/// Conversion options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Grid cells per block.
    pub resolution: u32,
    /// Uniform scale applied after the convention remap.
    pub scale: f32,
    /// Source axis convention. `None` uses the importer's native convention.
    pub source_convention: Option<SourceConvention>,
    /// Geometry identifier, e.g. `geometry.my_model`.
    pub identifier: String,
    pub texture_width: u32,
    pub texture_height: u32,
    pub occupancy: Occupancy,
    pub fill: FillMode,
    pub placement: Placement,
    /// Smallest cube edge in pixels. Must not exceed one grid cell
    /// (`16 / resolution` pixels).
    pub min_cube_size: f32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConvertOptions {
    /// 16 cells per block, 0.1 pixel minimum cube edge.
    pub fn standard() -> Self {
        Self {
            resolution: 16,
            scale: 1.0,
            source_convention: None,
            identifier: "geometry.model".to_string(),
            texture_width: 64,
            texture_height: 64,
            occupancy: Occupancy::default(),
            fill: FillMode::default(),
            placement: Placement::default(),
            min_cube_size: 0.1,
        }
    }

    /// 32 cells per block, 0.05 pixel minimum cube edge.
    pub fn fine() -> Self {
        Self {
            resolution: 32,
            min_cube_size: 0.05,
            ..Self::standard()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "fine" => Some(Self::fine()),
            _ => None,
        }
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_source_convention(mut self, convention: SourceConvention) -> Self {
        self.source_convention = Some(convention);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_texture_size(mut self, width: u32, height: u32) -> Self {
        self.texture_width = width;
        self.texture_height = height;
        self
    }

    pub fn with_occupancy(mut self, occupancy: Occupancy) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_min_cube_size(mut self, min_cube_size: f32) -> Self {
        self.min_cube_size = min_cube_size;
        self
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(ConvertError::InvalidOption(
                "resolution must be greater than 0".to_string(),
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > MAX_SCALE {
            return Err(ConvertError::InvalidOption(format!(
                "scale must be in (0, {}], got {}",
                MAX_SCALE, self.scale
            )));
        }
        if self.texture_width == 0 || self.texture_height == 0 {
            return Err(ConvertError::InvalidOption(format!(
                "texture size must be non-zero, got {}x{}",
                self.texture_width, self.texture_height
            )));
        }
        if self.texture_width > MAX_TEXTURE_SIZE || self.texture_height > MAX_TEXTURE_SIZE {
            return Err(ConvertError::InvalidOption(format!(
                "texture size must be at most {}x{}, got {}x{}",
                MAX_TEXTURE_SIZE, MAX_TEXTURE_SIZE, self.texture_width, self.texture_height
            )));
        }
        if self.entity_name().is_empty() {
            return Err(ConvertError::InvalidOption(format!(
                "identifier {:?} has no usable name",
                self.identifier
            )));
        }
        if !self.min_cube_size.is_finite() || self.min_cube_size < 0.0 {
            return Err(ConvertError::InvalidOption(format!(
                "min_cube_size must be a non-negative number, got {}",
                self.min_cube_size
            )));
        }
        // Inflating cubes past one cell would push them into their neighbours.
        let cell_pixels = UNITS_PER_BLOCK / self.resolution as f32;
        if self.min_cube_size > cell_pixels {
            return Err(ConvertError::InvalidOption(format!(
                "min_cube_size {} exceeds one grid cell ({} px at resolution {})",
                self.min_cube_size, cell_pixels, self.resolution
            )));
        }
        Ok(())
    }

    /// Entity name derived from the identifier.
    pub fn entity_name(&self) -> String {
        entity_name(&self.identifier)
    }
}

/// The identifier without its `geometry.` prefix, reduced to `[a-z0-9_]`.
pub fn entity_name(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let name = trimmed.strip_prefix("geometry.").unwrap_or(trimmed);
    sanitize_name(name)
}

/// Lowercase `name` and replace anything outside `[a-z0-9_]` with `_`.
///
/// Leading and trailing underscores are dropped.
pub fn sanitize_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim_matches('_').to_string()
}

/// Counts reported by one conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub vertices: usize,
    pub triangles: usize,
    pub voxels: usize,
    pub cubes: usize,
}

/// Result of a conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub document: GeometryDocument,
    /// Bounds of the canonical mesh in blocks.
    pub bounds: BoundingBox,
    /// Base colour carried from the source material.
    pub base_color: Option<[f32; 4]>,
    pub stats: ConversionStats,
}

/// Runs the conversion pipeline with fixed options.
#[derive(Debug, Clone)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// Validate `options` and build a converter.
    pub fn new(options: ConvertOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert an imported model, using its native convention unless the
    /// options override it.
    pub fn convert_imported(&self, model: &ImportedModel) -> Result<ConversionOutput> {
        let convention = self
            .options
            .source_convention
            .unwrap_or(model.native_convention);
        let mut output = self.run(&model.mesh, convention)?;
        output.base_color = output.base_color.or(model.base_color);
        Ok(output)
    }

    /// Convert a mesh. Without an explicit convention the mesh is taken as Y-up right-handed.
    pub fn convert(&self, mesh: &Mesh) -> Result<ConversionOutput> {
        self.run(mesh, self.options.source_convention.unwrap_or_default())
    }

    fn run(&self, mesh: &Mesh, convention: SourceConvention) -> Result<ConversionOutput> {
        mesh.validate()?;
        let options = &self.options;

        let canonical = normalize(mesh, convention, options.scale, options.placement);
        let bounds = canonical.bounding_box();
        debug!(
            %convention,
            vertices = canonical.vertex_count(),
            min = ?bounds.min,
            max = ?bounds.max,
            "normalized mesh"
        );

        let (voxel_count, cuboids) = if canonical.triangle_count() == 0 {
            debug!("mesh has no triangles, emitting fallback box");
            (0, vec![Cuboid::fallback()])
        } else {
            let voxels = Voxelizer::new(options.resolution)
                .with_occupancy(options.occupancy)
                .with_fill(options.fill)
                .voxelize(&canonical);
            let count = voxels.len();
            (count, BoxMerger::new(options.resolution).merge(voxels))
        };

        let placer = UvPlacer::new(bounds, [options.texture_width, options.texture_height]);
        let cubes: Vec<Cube> = cuboids
            .iter()
            .map(|cuboid| self.to_cube(cuboid, &placer))
            .collect();

        let stats = ConversionStats {
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
            voxels: voxel_count,
            cubes: cubes.len(),
        };
        info!(
            identifier = %options.identifier,
            vertices = stats.vertices,
            triangles = stats.triangles,
            voxels = stats.voxels,
            cubes = stats.cubes,
            "converted mesh"
        );

        Ok(ConversionOutput {
            document: GeometryDocument::new(Geometry {
                description: self.describe(&bounds),
                bones: vec![Bone::root(cubes)],
            }),
            bounds,
            base_color: mesh.base_color,
            stats,
        })
    }

    fn to_cube(&self, cuboid: &Cuboid, placer: &UvPlacer) -> Cube {
        let min = self.options.min_cube_size;
        Cube::new(
            cuboid.origin.map(|v| v * UNITS_PER_BLOCK),
            cuboid.size.map(|v| (v * UNITS_PER_BLOCK).max(min)),
            placer.place(cuboid.origin),
        )
    }

    fn describe(&self, bounds: &BoundingBox) -> Description {
        let [dx, dy, dz] = bounds.dimensions();
        Description {
            identifier: self.options.identifier.trim().to_string(),
            texture_width: self.options.texture_width,
            texture_height: self.options.texture_height,
            visible_bounds_width: dx.max(dz) + VISIBLE_BOUNDS_PADDING,
            visible_bounds_height: dy + VISIBLE_BOUNDS_PADDING,
            visible_bounds_offset: bounds.center(),
        }
    }
}
