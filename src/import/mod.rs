//! Model importers.
//!
//! Each supported file format has a [`MeshImporter`] that turns raw bytes into
//! the shared [`Mesh`] plus the coordinate convention the format is authored
//! in. The converter never sees format-specific data.

pub mod fbx;
pub mod gltf;
pub mod obj;

use crate::error::{ConvertError, Result};
use crate::mesh::Mesh;
use crate::types::SourceConvention;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported model file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    /// glTF 2.0, binary (`.glb`) or JSON (`.gltf`).
    Gltf,
    /// Wavefront OBJ.
    Obj,
    /// Autodesk FBX, binary or ASCII.
    Fbx,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 3] = [ModelFormat::Gltf, ModelFormat::Obj, ModelFormat::Fbx];

    /// Match a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "glb" | "gltf" => Some(ModelFormat::Gltf),
            "obj" => Some(ModelFormat::Obj),
            "fbx" => Some(ModelFormat::Fbx),
            _ => None,
        }
    }

    /// Match a format name as given on a command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gltf" | "glb" => Some(ModelFormat::Gltf),
            "obj" => Some(ModelFormat::Obj),
            "fbx" => Some(ModelFormat::Fbx),
            _ => None,
        }
    }

    /// Guess the format from the file contents.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"glTF") {
            return Some(ModelFormat::Gltf);
        }
        if bytes.starts_with(fbx::BINARY_MAGIC) {
            return Some(ModelFormat::Fbx);
        }

        let head = &bytes[..bytes.len().min(4096)];
        let text = String::from_utf8_lossy(head);
        let trimmed = text.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with("; FBX") || trimmed.contains("FBXHeaderExtension:") {
            return Some(ModelFormat::Fbx);
        }
        if trimmed.starts_with('{') && trimmed.contains("\"asset\"") {
            return Some(ModelFormat::Gltf);
        }
        let looks_like_obj = trimmed.lines().any(|line| {
            let line = line.trim_start();
            line.starts_with("v ") || line.starts_with("f ") || line.starts_with("mtllib ")
        });
        if looks_like_obj {
            return Some(ModelFormat::Obj);
        }
        None
    }

    /// Detect from a path's extension, falling back to the contents.
    pub fn detect(path: Option<&Path>, bytes: &[u8]) -> Result<Self> {
        let from_ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension);
        from_ext.or_else(|| Self::from_magic(bytes)).ok_or_else(|| {
            ConvertError::UnsupportedFormat(match path {
                Some(p) => p.display().to_string(),
                None => "unrecognized file contents".to_string(),
            })
        })
    }

    /// The importer for this format.
    pub fn importer(&self) -> Box<dyn MeshImporter> {
        match self {
            ModelFormat::Gltf => Box::new(gltf::GltfImporter),
            ModelFormat::Obj => Box::new(obj::ObjImporter),
            ModelFormat::Fbx => Box::new(fbx::FbxImporter),
        }
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelFormat::Gltf => "gltf",
            ModelFormat::Obj => "obj",
            ModelFormat::Fbx => "fbx",
        };
        write!(f, "{}", name)
    }
}

/// Where an importer may look for external resources.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    /// Directory of the source file, for `.bin` buffers and `.mtl` libraries.
    pub base_dir: Option<PathBuf>,
}

impl ImportContext {
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    /// Read a file relative to the base directory.
    pub(crate) fn read_relative(&self, relative: &str) -> Result<Vec<u8>> {
        let dir = self.base_dir.as_ref().ok_or_else(|| {
            ConvertError::Import(format!(
                "external resource {} needs a source directory",
                relative
            ))
        })?;
        std::fs::read(dir.join(relative)).map_err(|e| {
            ConvertError::Import(format!("failed to read {}: {}", relative, e))
        })
    }
}

/// A mesh with the facts the converter needs about its source.
#[derive(Debug, Clone)]
pub struct ImportedModel {
    pub mesh: Mesh,
    /// Axis convention the format is authored in.
    pub native_convention: SourceConvention,
    /// Material colour to paint the texture with.
    pub base_color: Option<[f32; 4]>,
}

/// Turns file bytes into a [`Mesh`].
pub trait MeshImporter {
    fn format(&self) -> ModelFormat;

    fn import(&self, bytes: &[u8], ctx: &ImportContext) -> Result<ImportedModel>;
}

/// Load a model file, detecting its format.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<ImportedModel> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let format = ModelFormat::detect(Some(path), &bytes)?;
    let ctx = ImportContext {
        base_dir: path.parent().map(Path::to_path_buf),
    };
    debug!(path = %path.display(), %format, bytes = bytes.len(), "loading model");
    format.importer().import(&bytes, &ctx)
}

/// Load a model from memory. External resources are unavailable.
pub fn load_from_bytes(bytes: &[u8], format: Option<ModelFormat>) -> Result<ImportedModel> {
    let format = match format {
        Some(format) => format,
        None => ModelFormat::detect(None, bytes)?,
    };
    format.importer().import(bytes, &ImportContext::default())
}
