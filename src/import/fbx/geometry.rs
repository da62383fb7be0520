//! Mesh extraction from a parsed FBX tree.

use super::{Document, Node, Property};
use crate::error::{ConvertError, Result};
use crate::import::ImportedModel;
use crate::mesh::Mesh;
use crate::types::{Handedness, SourceConvention, UpAxis, UvOrigin};
use tracing::{debug, warn};

pub(super) fn extract(document: &Document) -> Result<ImportedModel> {
    let objects = document
        .node("Objects")
        .ok_or_else(|| ConvertError::Import("FBX has no Objects section".to_string()))?;

    let mut mesh = Mesh::new();
    let mut geometries = 0;
    // Version 7 stores meshes as Geometry objects; version 6 inlines them in Model.
    for node in objects
        .children
        .iter()
        .filter(|n| matches!(n.name.as_str(), "Geometry" | "Model"))
        .filter(|n| n.child("Vertices").is_some())
    {
        mesh.merge(&read_geometry(node)?);
        geometries += 1;
    }

    let up = up_axis(document);
    mesh.uv_origin = UvOrigin::BottomLeft;
    let base_color = objects
        .children_named("Material")
        .find_map(diffuse_color);
    mesh.base_color = base_color;

    debug!(
        geometries,
        ?up,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "extracted FBX geometry"
    );
    Ok(ImportedModel {
        mesh,
        native_convention: SourceConvention::new(up, Handedness::Right),
        base_color,
    })
}

/// `GlobalSettings` `UpAxis`: 1 is Y, 2 is Z.
fn up_axis(document: &Document) -> UpAxis {
    let value = document
        .node("GlobalSettings")
        .and_then(|s| s.property_entry("UpAxis"))
        .and_then(|p| p.properties.last())
        .and_then(Property::as_i64);
    match value {
        None | Some(1) => UpAxis::Y,
        Some(2) => UpAxis::Z,
        Some(other) => {
            warn!(axis = other, "unsupported FBX up axis, assuming Y");
            UpAxis::Y
        }
    }
}

fn diffuse_color(material: &Node) -> Option<[f32; 4]> {
    let entry = material
        .property_entry("DiffuseColor")
        .or_else(|| material.property_entry("Diffuse"))?;
    let numbers: Vec<f64> = entry
        .properties
        .iter()
        .skip(1)
        .filter_map(Property::as_f64)
        .collect();
    match numbers.as_slice() {
        [.., r, g, b] => Some([*r as f32, *g as f32, *b as f32, 1.0]),
        _ => None,
    }
}

/// How layer values map onto the polygon structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mapping {
    PolygonVertex,
    ControlPoint,
    Polygon,
    AllSame,
}

/// A normal or UV layer, already resolved to per-polygon-vertex lookups.
struct Layer {
    mapping: Mapping,
    values: Vec<f64>,
    indices: Option<Vec<i64>>,
    width: usize,
}

impl Layer {
    fn read(element: &Node, values_name: &str, index_name: &str, width: usize) -> Option<Layer> {
        let mapping = match element.child("MappingInformationType")?.first_str()? {
            "ByPolygonVertex" => Mapping::PolygonVertex,
            "ByVertice" | "ByVertex" | "ByControlPoint" => Mapping::ControlPoint,
            "ByPolygon" => Mapping::Polygon,
            "AllSame" => Mapping::AllSame,
            other => {
                warn!(layer = %element.name, mapping = other, "unsupported layer mapping");
                return None;
            }
        };
        let indexed = match element
            .child("ReferenceInformationType")
            .and_then(Node::first_str)
            .unwrap_or("Direct")
        {
            "Direct" => false,
            "IndexToDirect" | "Index" => true,
            other => {
                warn!(layer = %element.name, reference = other, "unsupported layer reference");
                return None;
            }
        };
        let values = element.child(values_name)?.f64_values();
        let indices = if indexed {
            Some(element.child(index_name)?.i64_values())
        } else {
            None
        };
        Some(Layer {
            mapping,
            values,
            indices,
            width,
        })
    }

    /// Value for one polygon corner.
    fn value(&self, polygon_vertex: usize, control_point: usize, polygon: usize) -> Option<&[f64]> {
        let slot = match self.mapping {
            Mapping::PolygonVertex => polygon_vertex,
            Mapping::ControlPoint => control_point,
            Mapping::Polygon => polygon,
            Mapping::AllSame => 0,
        };
        let index = match &self.indices {
            Some(indices) => usize::try_from(*indices.get(slot)?).ok()?,
            None => slot,
        };
        self.values.get(index * self.width..(index + 1) * self.width)
    }
}

/// One polygon: its corner positions in the polygon-vertex stream.
struct Polygon {
    start: usize,
    len: usize,
}

fn read_geometry(node: &Node) -> Result<Mesh> {
    let control_points = node
        .child("Vertices")
        .map(Node::f64_values)
        .unwrap_or_default();
    if control_points.len() % 3 != 0 {
        return Err(ConvertError::Import(format!(
            "{} vertex components is not a multiple of 3",
            control_points.len()
        )));
    }
    let control_count = control_points.len() / 3;

    let raw_indices = node
        .child("PolygonVertexIndex")
        .map(Node::i64_values)
        .unwrap_or_default();
    // A negative index `i` ends a polygon and stands for `!i`.
    let polygon_vertices: Vec<usize> = raw_indices
        .iter()
        .map(|&i| if i < 0 { !i } else { i })
        .map(|i| {
            usize::try_from(i)
                .ok()
                .filter(|&i| i < control_count)
                .ok_or_else(|| ConvertError::Import(format!("polygon vertex {} out of range", i)))
        })
        .collect::<Result<_>>()?;

    let mut polygons = Vec::new();
    let mut start = 0;
    for (i, &raw) in raw_indices.iter().enumerate() {
        if raw < 0 {
            polygons.push(Polygon {
                start,
                len: i + 1 - start,
            });
            start = i + 1;
        }
    }
    if start < raw_indices.len() {
        warn!("unterminated FBX polygon dropped");
    }

    let normals = node
        .child("LayerElementNormal")
        .and_then(|e| Layer::read(e, "Normals", "NormalsIndex", 3));
    let uvs = node
        .child("LayerElementUV")
        .and_then(|e| Layer::read(e, "UV", "UVIndex", 2));

    let mut mesh = Mesh::new();
    let mut normal_data = normals.as_ref().map(|_| Vec::new());
    let mut uv_data = uvs.as_ref().map(|_| Vec::new());

    for (polygon_index, polygon) in polygons.iter().enumerate() {
        if polygon.len < 3 {
            continue;
        }
        let base = mesh.vertex_count() as u32;
        for corner in polygon.start..polygon.start + polygon.len {
            let cp = polygon_vertices[corner];
            mesh.add_vertex([
                control_points[cp * 3] as f32,
                control_points[cp * 3 + 1] as f32,
                control_points[cp * 3 + 2] as f32,
            ]);
            push_layer_value(&mut normal_data, normals.as_ref(), corner, cp, polygon_index);
            push_layer_value(&mut uv_data, uvs.as_ref(), corner, cp, polygon_index);
        }
        for k in 1..polygon.len as u32 - 1 {
            mesh.add_triangle(base, base + k, base + k + 1);
        }
    }

    if let Some(data) = normal_data {
        mesh.normals = data;
    } else if normals.is_some() {
        warn!("FBX normal layer does not cover every corner, dropping normals");
    }
    if let Some(data) = uv_data {
        mesh.uvs = data;
    } else if uvs.is_some() {
        warn!("FBX UV layer does not cover every corner, dropping UVs");
    }

    mesh.validate()?;
    Ok(mesh)
}

/// Append one corner's layer value; a missing value discards the whole layer.
fn push_layer_value(
    data: &mut Option<Vec<f32>>,
    layer: Option<&Layer>,
    polygon_vertex: usize,
    control_point: usize,
    polygon: usize,
) {
    let (Some(out), Some(layer)) = (data.as_mut(), layer) else {
        return;
    };
    match layer.value(polygon_vertex, control_point, polygon) {
        Some(values) => out.extend(values.iter().map(|&v| v as f32)),
        None => *data = None,
    }
}
