//! glTF 2.0 import (`.gltf` and `.glb`).

use super::{ImportContext, ImportedModel, MeshImporter, ModelFormat};
use crate::error::{ConvertError, Result};
use crate::mesh::Mesh;
use crate::types::{SourceConvention, UvOrigin};
use base64::Engine;
use glam::{Mat3, Mat4, Quat, Vec3};
use gltf_json as json;
use json::accessor::{ComponentType, Type};
use json::validation::Checked::Valid;
use tracing::{debug, warn};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// Node hierarchies deeper than this are treated as cyclic.
const MAX_NODE_DEPTH: usize = 64;

/// Imports glTF documents, walking the default scene.
pub struct GltfImporter;

impl MeshImporter for GltfImporter {
    fn format(&self) -> ModelFormat {
        ModelFormat::Gltf
    }

    fn import(&self, bytes: &[u8], ctx: &ImportContext) -> Result<ImportedModel> {
        let (json_bytes, bin) = if bytes.starts_with(GLB_MAGIC) {
            split_glb(bytes)?
        } else {
            (bytes, None)
        };

        let root: json::Root = serde_json::from_slice(json_bytes)
            .map_err(|e| ConvertError::Import(format!("invalid glTF JSON: {}", e)))?;
        let buffers = load_buffers(&root, bin, ctx)?;

        let reader = DocumentReader {
            root: &root,
            buffers: &buffers,
        };
        let mut mesh = Mesh::new();
        reader.collect_meshes(&mut mesh)?;

        let base_color = root
            .materials
            .first()
            .map(|m| m.pbr_metallic_roughness.base_color_factor.0);
        mesh.uv_origin = UvOrigin::TopLeft;
        mesh.base_color = base_color;

        debug!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "imported glTF"
        );
        Ok(ImportedModel {
            mesh,
            native_convention: SourceConvention::YUpRightHanded,
            base_color,
        })
    }
}

/// Split a GLB container into its JSON chunk and optional BIN chunk.
fn split_glb(bytes: &[u8]) -> Result<(&[u8], Option<&[u8]>)> {
    if bytes.len() < 12 {
        return Err(ConvertError::Import("GLB header is truncated".to_string()));
    }
    let version = read_u32(bytes, 4)?;
    if version != 2 {
        return Err(ConvertError::Import(format!(
            "unsupported GLB version {}",
            version
        )));
    }
    let total = (read_u32(bytes, 8)? as usize).min(bytes.len());

    let mut json_chunk = None;
    let mut bin_chunk = None;
    let mut offset = 12;
    while offset + 8 <= total {
        let length = read_u32(bytes, offset)? as usize;
        let kind = read_u32(bytes, offset + 4)?;
        let start = offset + 8;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= total)
            .ok_or_else(|| ConvertError::Import("GLB chunk overruns the file".to_string()))?;
        match kind {
            CHUNK_JSON if json_chunk.is_none() => json_chunk = Some(&bytes[start..end]),
            CHUNK_BIN if bin_chunk.is_none() => bin_chunk = Some(&bytes[start..end]),
            _ => {}
        }
        offset = end;
    }

    let json_chunk =
        json_chunk.ok_or_else(|| ConvertError::Import("GLB has no JSON chunk".to_string()))?;
    Ok((json_chunk, bin_chunk))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| ConvertError::Import(format!("unexpected end of data at {}", offset)))
}

fn load_buffers(root: &json::Root, bin: Option<&[u8]>, ctx: &ImportContext) -> Result<Vec<Vec<u8>>> {
    root.buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| match buffer.uri.as_deref() {
            None => bin.map(<[u8]>::to_vec).ok_or_else(|| {
                ConvertError::Import(format!("buffer {} refers to a missing GLB chunk", index))
            }),
            Some(uri) if uri.starts_with("data:") => decode_data_uri(uri),
            Some(uri) => ctx.read_relative(uri),
        })
        .collect()
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, data) = uri
        .split_once(',')
        .ok_or_else(|| ConvertError::Import("malformed data URI".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(ConvertError::Import(format!(
            "unsupported data URI encoding: {}",
            header
        )));
    }
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ConvertError::Import(format!("invalid base64 buffer: {}", e)))
}

struct DocumentReader<'a> {
    root: &'a json::Root,
    buffers: &'a [Vec<u8>],
}

impl DocumentReader<'_> {
    fn collect_meshes(&self, out: &mut Mesh) -> Result<()> {
        let scene = self
            .root
            .scene
            .map(|s| s.value())
            .or(if self.root.scenes.is_empty() { None } else { Some(0) });

        match scene.and_then(|i| self.root.scenes.get(i)) {
            Some(scene) => {
                for node in &scene.nodes {
                    self.visit_node(node.value(), Mat4::IDENTITY, 0, out)?;
                }
            }
            None => {
                // No scene graph: take every mesh untransformed.
                for index in 0..self.root.meshes.len() {
                    self.append_mesh(index, Mat4::IDENTITY, out)?;
                }
            }
        }
        Ok(())
    }

    fn visit_node(&self, index: usize, parent: Mat4, depth: usize, out: &mut Mesh) -> Result<()> {
        if depth > MAX_NODE_DEPTH {
            return Err(ConvertError::Import("node hierarchy is cyclic".to_string()));
        }
        let node = self
            .root
            .nodes
            .get(index)
            .ok_or_else(|| ConvertError::Import(format!("node {} does not exist", index)))?;

        let world = parent * local_transform(node);
        if let Some(mesh) = node.mesh {
            self.append_mesh(mesh.value(), world, out)?;
        }
        for child in node.children.iter().flatten() {
            self.visit_node(child.value(), world, depth + 1, out)?;
        }
        Ok(())
    }

    fn append_mesh(&self, index: usize, transform: Mat4, out: &mut Mesh) -> Result<()> {
        let mesh = self
            .root
            .meshes
            .get(index)
            .ok_or_else(|| ConvertError::Import(format!("mesh {} does not exist", index)))?;

        for (p, primitive) in mesh.primitives.iter().enumerate() {
            match primitive.mode {
                Valid(json::mesh::Mode::Triangles) => {}
                _ => {
                    warn!(mesh = index, primitive = p, "skipping non-triangle primitive");
                    continue;
                }
            }
            let part = self.read_primitive(primitive)?;
            out.merge(&apply_transform(part, transform));
        }
        Ok(())
    }

    fn read_primitive(&self, primitive: &json::mesh::Primitive) -> Result<Mesh> {
        let attribute = |semantic: json::mesh::Semantic| {
            primitive.attributes.get(&Valid(semantic)).map(|i| i.value())
        };

        let positions_index = attribute(json::mesh::Semantic::Positions)
            .ok_or_else(|| ConvertError::Import("primitive has no POSITION".to_string()))?;
        let positions = self.read_floats(positions_index, Type::Vec3)?;
        let vertex_count = positions.len() / 3;

        let mut mesh = Mesh::new();
        mesh.positions = positions;
        if let Some(i) = attribute(json::mesh::Semantic::Normals) {
            mesh.normals = self.read_floats(i, Type::Vec3)?;
        }
        if let Some(i) = attribute(json::mesh::Semantic::TexCoords(0)) {
            mesh.uvs = self.read_floats(i, Type::Vec2)?;
        }
        mesh.indices = match primitive.indices {
            Some(i) => self.read_indices(i.value())?,
            None => (0..vertex_count as u32).collect(),
        };
        if mesh.indices.len() % 3 != 0 {
            warn!(indices = mesh.indices.len(), "dropping trailing partial triangle");
            mesh.indices.truncate(mesh.indices.len() / 3 * 3);
        }
        mesh.validate()?;
        Ok(mesh)
    }

    fn accessor(&self, index: usize) -> Result<&json::Accessor> {
        self.root
            .accessors
            .get(index)
            .ok_or_else(|| ConvertError::Import(format!("accessor {} does not exist", index)))
    }

    /// Raw element bytes of an accessor, honouring the view's stride.
    fn elements(&self, accessor: &json::Accessor, element_size: usize) -> Result<Vec<&[u8]>> {
        let count = accessor.count.0 as usize;
        let view_index = accessor.buffer_view.ok_or_else(|| {
            ConvertError::Import("accessors without a buffer view are not supported".to_string())
        })?;
        let view = self
            .root
            .buffer_views
            .get(view_index.value())
            .ok_or_else(|| ConvertError::Import("buffer view does not exist".to_string()))?;
        let buffer = self
            .buffers
            .get(view.buffer.value())
            .ok_or_else(|| ConvertError::Import("buffer does not exist".to_string()))?;

        let view_start = view.byte_offset.map(|o| o.0 as usize).unwrap_or(0);
        let data = view_start
            .checked_add(view.byte_length.0 as usize)
            .and_then(|view_end| buffer.get(view_start..view_end))
            .ok_or_else(|| ConvertError::Import("buffer view overruns its buffer".to_string()))?;
        let start = accessor.byte_offset.map(|o| o.0 as usize).unwrap_or(0);
        let stride = view.byte_stride.map(|s| s.0).unwrap_or(element_size);

        let overrun = || {
            ConvertError::Import(format!(
                "accessor with {} elements overruns its {}-byte buffer view",
                count,
                data.len()
            ))
        };
        // The last element must fit before anything is read or allocated.
        if count > 0 {
            let last_end = (count - 1)
                .checked_mul(stride)
                .and_then(|o| o.checked_add(start))
                .and_then(|o| o.checked_add(element_size))
                .ok_or_else(overrun)?;
            if last_end > data.len() {
                return Err(overrun());
            }
        }

        (0..count)
            .map(|i| {
                let offset = start + i * stride;
                data.get(offset..offset + element_size).ok_or_else(overrun)
            })
            .collect()
    }

    fn read_floats(&self, index: usize, expected: Type) -> Result<Vec<f32>> {
        let accessor = self.accessor(index)?;
        let components = match (&accessor.type_, expected) {
            (Valid(Type::Vec2), Type::Vec2) => 2,
            (Valid(Type::Vec3), Type::Vec3) => 3,
            _ => {
                return Err(ConvertError::Import(format!(
                    "accessor {} has an unexpected element type",
                    index
                )))
            }
        };
        let component_type = match &accessor.component_type {
            Valid(t) => t.0,
            _ => return Err(ConvertError::Import("invalid component type".to_string())),
        };

        let (size, decode): (usize, fn(&[u8], bool) -> f32) = match component_type {
            ComponentType::F32 => (4, |b, _| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ComponentType::U8 => (1, |b, norm| scale_int(b[0] as f32, u8::MAX as f32, norm)),
            ComponentType::U16 => (2, |b, norm| {
                scale_int(u16::from_le_bytes([b[0], b[1]]) as f32, u16::MAX as f32, norm)
            }),
            other => {
                return Err(ConvertError::Import(format!(
                    "unsupported attribute component type {:?}",
                    other
                )))
            }
        };

        let normalized = accessor.normalized;
        let elements = self.elements(accessor, size * components)?;
        let mut values = Vec::with_capacity(elements.len() * components);
        for element in elements {
            for c in 0..components {
                values.push(decode(&element[c * size..], normalized));
            }
        }
        Ok(values)
    }

    fn read_indices(&self, index: usize) -> Result<Vec<u32>> {
        let accessor = self.accessor(index)?;
        let size = match &accessor.component_type {
            Valid(t) => match t.0 {
                ComponentType::U8 => 1,
                ComponentType::U16 => 2,
                ComponentType::U32 => 4,
                other => {
                    return Err(ConvertError::Import(format!(
                        "unsupported index component type {:?}",
                        other
                    )))
                }
            },
            _ => return Err(ConvertError::Import("invalid component type".to_string())),
        };
        Ok(self
            .elements(accessor, size)?
            .into_iter()
            .map(|b| match size {
                1 => b[0] as u32,
                2 => u16::from_le_bytes([b[0], b[1]]) as u32,
                _ => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            })
            .collect())
    }
}

fn scale_int(value: f32, max: f32, normalized: bool) -> f32 {
    if normalized {
        value / max
    } else {
        value
    }
}

fn local_transform(node: &json::Node) -> Mat4 {
    if let Some(matrix) = node.matrix {
        return Mat4::from_cols_array(&matrix);
    }
    let translation = node.translation.map(Vec3::from).unwrap_or(Vec3::ZERO);
    let rotation = node
        .rotation
        .map(|r| Quat::from_array(r.0))
        .unwrap_or(Quat::IDENTITY);
    let scale = node.scale.map(Vec3::from).unwrap_or(Vec3::ONE);
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Bake a node transform into a primitive.
fn apply_transform(mesh: Mesh, transform: Mat4) -> Mesh {
    if transform == Mat4::IDENTITY {
        return mesh;
    }
    let linear = Mat3::from_mat4(transform);
    let mut out = mesh.transformed(linear);
    let translation = transform.w_axis.truncate();
    if translation != Vec3::ZERO {
        out = out.translated(translation.to_array());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A buffer with one triangle: three f32 positions then three u16 indices.
    fn triangle_buffer() -> Vec<u8> {
        let mut bytes = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for i in [0u16, 1, 2] {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);
        bytes
    }

    fn document(buffer_uri: Option<&str>, node: &str) -> String {
        let uri = buffer_uri
            .map(|u| format!(r#""uri": "{}", "#, u))
            .unwrap_or_default();
        format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "scene": 0,
                "scenes": [{{ "nodes": [0] }}],
                "nodes": [{node}],
                "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}],
                "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [0.5, 0.25, 1.0, 1.0] }} }}],
                "accessors": [
                    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" }},
                    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
                ],
                "bufferViews": [
                    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
                    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
                ],
                "buffers": [{{ {uri}"byteLength": 44 }}]
            }}"#,
            node = node,
            uri = uri
        )
    }

    fn data_uri_document(node: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(triangle_buffer());
        document(
            Some(&format!("data:application/octet-stream;base64,{}", encoded)),
            node,
        )
    }

    fn glb(json_text: &str, bin: &[u8]) -> Vec<u8> {
        let mut json_chunk = json_text.as_bytes().to_vec();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let total = 12 + 8 + json_chunk.len() + 8 + bin.len();
        let mut out = Vec::new();
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json_chunk);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out
    }

    fn import(bytes: &[u8]) -> ImportedModel {
        GltfImporter
            .import(bytes, &ImportContext::default())
            .unwrap()
    }

    #[test]
    fn test_embedded_buffer() {
        let model = import(data_uri_document(r#"{ "mesh": 0 }"#).as_bytes());
        assert_eq!(model.mesh.vertex_count(), 3);
        assert_eq!(model.mesh.indices, vec![0, 1, 2]);
        assert_eq!(model.mesh.position(1), [1.0, 0.0, 0.0]);
        assert_eq!(model.native_convention, SourceConvention::YUpRightHanded);
        assert_eq!(model.base_color, Some([0.5, 0.25, 1.0, 1.0]));
    }

    #[test]
    fn test_glb_container() {
        let bytes = glb(&document(None, r#"{ "mesh": 0 }"#), &triangle_buffer());
        let model = import(&bytes);
        assert_eq!(model.mesh.triangle_count(), 1);
        assert_eq!(model.mesh.position(2), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_node_translation_and_scale() {
        let node = r#"{ "mesh": 0, "translation": [0.0, 5.0, 0.0], "scale": [2.0, 2.0, 2.0] }"#;
        let model = import(data_uri_document(node).as_bytes());
        assert_eq!(model.mesh.position(0), [0.0, 5.0, 0.0]);
        assert_eq!(model.mesh.position(1), [2.0, 5.0, 0.0]);
        assert_eq!(model.mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_mirroring_node_flips_winding() {
        let node = r#"{ "mesh": 0, "scale": [-1.0, 1.0, 1.0] }"#;
        let model = import(data_uri_document(node).as_bytes());
        assert_eq!(model.mesh.position(1), [-1.0, 0.0, 0.0]);
        assert_eq!(model.mesh.indices, vec![0, 2, 1]);
    }

    #[test]
    fn test_child_nodes_inherit_transform() {
        let text = data_uri_document(r#"{ "translation": [1.0, 0.0, 0.0], "children": [1] }, { "mesh": 0 }"#);
        let model = import(text.as_bytes());
        assert_eq!(model.mesh.position(0), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_external_buffer_needs_directory() {
        let text = document(Some("mesh.bin"), r#"{ "mesh": 0 }"#);
        let err = GltfImporter
            .import(text.as_bytes(), &ImportContext::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mesh.bin"), triangle_buffer()).unwrap();
        let model = GltfImporter
            .import(text.as_bytes(), &ImportContext::with_base_dir(dir.path()))
            .unwrap();
        assert_eq!(model.mesh.triangle_count(), 1);
    }

    #[test]
    fn test_truncated_glb_is_rejected() {
        let err = GltfImporter
            .import(b"glTF\x02\0\0", &ImportContext::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)));
    }

    #[test]
    fn test_oversized_accessor_count_is_rejected() {
        let text = data_uri_document(r#"{ "mesh": 0 }"#).replacen(
            r#""count": 3, "type": "VEC3""#,
            r#""count": 1099511627776, "type": "VEC3""#,
            1,
        );
        assert!(text.contains("1099511627776"));
        let err = GltfImporter
            .import(text.as_bytes(), &ImportContext::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)), "{:?}", err);
    }

    #[test]
    fn test_strided_accessor_past_view_end_is_rejected() {
        let text = data_uri_document(r#"{ "mesh": 0 }"#).replacen(
            r#""byteOffset": 0, "byteLength": 36 }"#,
            r#""byteOffset": 0, "byteLength": 36, "byteStride": 16 }"#,
            1,
        );
        assert!(text.contains("byteStride"));
        let err = GltfImporter
            .import(text.as_bytes(), &ImportContext::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)), "{:?}", err);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = GltfImporter
            .import(b"{ not json", &ImportContext::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)));
    }
}
