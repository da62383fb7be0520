//! Wavefront OBJ import via `tobj`.

use super::{ImportContext, ImportedModel, MeshImporter, ModelFormat};
use crate::error::Result;
use crate::mesh::Mesh;
use crate::types::{SourceConvention, UvOrigin};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Imports OBJ files, concatenating every object and group.
pub struct ObjImporter;

impl MeshImporter for ObjImporter {
    fn format(&self) -> ModelFormat {
        ModelFormat::Obj
    }

    fn import(&self, bytes: &[u8], ctx: &ImportContext) -> Result<ImportedModel> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, materials) = tobj::load_obj_buf(&mut Cursor::new(bytes), &options, |path| {
            load_material_library(path, ctx)
        })?;

        let materials = materials.unwrap_or_else(|e| {
            warn!(error = %e, "material library unavailable");
            Vec::new()
        });

        let mut mesh = Mesh::new();
        for model in &models {
            let source = &model.mesh;
            let part = Mesh {
                positions: source.positions.clone(),
                normals: source.normals.clone(),
                uvs: source.texcoords.clone(),
                indices: source.indices.clone(),
                ..Mesh::default()
            };
            part.validate()?;
            mesh.merge(&part);
        }
        mesh.uv_origin = UvOrigin::BottomLeft;

        let material = models
            .iter()
            .find_map(|m| m.mesh.material_id)
            .and_then(|id| materials.get(id))
            .or_else(|| materials.first());
        let base_color = material.and_then(|m| {
            m.diffuse
                .map(|[r, g, b]| [r, g, b, m.dissolve.unwrap_or(1.0)])
        });
        mesh.base_color = base_color;

        debug!(
            models = models.len(),
            materials = materials.len(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "imported OBJ"
        );
        Ok(ImportedModel {
            mesh,
            native_convention: SourceConvention::YUpRightHanded,
            base_color,
        })
    }
}

fn load_material_library(path: &Path, ctx: &ImportContext) -> tobj::MTLLoadResult {
    let relative = path.to_string_lossy();
    match ctx.read_relative(&relative) {
        Ok(bytes) => tobj::load_mtl_buf(&mut Cursor::new(bytes)),
        Err(e) => {
            debug!(error = %e, "skipping material library");
            Err(tobj::LoadError::OpenFileFailed)
        }
    }
}
