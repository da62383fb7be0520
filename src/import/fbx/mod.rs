//! FBX import.
//!
//! Both encodings parse into the same [`Node`] tree, which [`geometry`]
//! walks to build the mesh. Only static geometry is read: no deformers,
//! animation or node transforms.

mod ascii;
mod binary;
mod geometry;

use super::{ImportContext, ImportedModel, MeshImporter, ModelFormat};
use crate::error::{ConvertError, Result};
use tracing::debug;

/// Leading bytes of a binary FBX file.
pub const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \0";

/// A property value attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl Property {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Property::Bool(v) => Some(v as u8 as f64),
            Property::I16(v) => Some(v as f64),
            Property::I32(v) => Some(v as f64),
            Property::I64(v) => Some(v as f64),
            Property::F32(v) => Some(v as f64),
            Property::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Property::Bool(v) => Some(v as i64),
            Property::I16(v) => Some(v as i64),
            Property::I32(v) => Some(v as i64),
            Property::I64(v) => Some(v),
            Property::F32(v) if v.fract() == 0.0 => Some(v as i64),
            Property::F64(v) if v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One record of the FBX tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First child with `name`.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// String value of the first property.
    pub fn first_str(&self) -> Option<&str> {
        self.properties.first().and_then(Property::as_str)
    }

    /// All numeric values, whether stored as one array or as scalar properties.
    pub fn f64_values(&self) -> Vec<f64> {
        let mut values = Vec::new();
        for property in &self.properties {
            match property {
                Property::F64Array(a) => values.extend_from_slice(a),
                Property::F32Array(a) => values.extend(a.iter().map(|&v| v as f64)),
                Property::I32Array(a) => values.extend(a.iter().map(|&v| v as f64)),
                Property::I64Array(a) => values.extend(a.iter().map(|&v| v as f64)),
                other => values.extend(other.as_f64()),
            }
        }
        values
    }

    /// All integer values, whether stored as one array or as scalar properties.
    pub fn i64_values(&self) -> Vec<i64> {
        let mut values = Vec::new();
        for property in &self.properties {
            match property {
                Property::I32Array(a) => values.extend(a.iter().map(|&v| v as i64)),
                Property::I64Array(a) => values.extend_from_slice(a),
                Property::F64Array(a) => values.extend(a.iter().map(|&v| v as i64)),
                Property::F32Array(a) => values.extend(a.iter().map(|&v| v as i64)),
                other => values.extend(other.as_i64()),
            }
        }
        values
    }

    /// Look up a `Properties70` (or legacy `Properties60`) entry by name.
    pub fn property_entry(&self, key: &str) -> Option<&Node> {
        ["Properties70", "Properties60"]
            .iter()
            .filter_map(|block| self.child(block))
            .flat_map(|block| block.children.iter())
            .find(|p| p.first_str() == Some(key))
    }
}

/// A parsed FBX file.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Version number, e.g. `7400`, when the file states it.
    pub version: Option<u32>,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Parse either encoding.
pub fn parse(bytes: &[u8]) -> Result<Document> {
    if bytes.starts_with(BINARY_MAGIC) {
        binary::parse(bytes)
    } else {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ConvertError::Import("FBX file is neither binary nor UTF-8 text".to_string()))?;
        ascii::parse(text)
    }
}

/// Imports binary and ASCII FBX files.
pub struct FbxImporter;

impl MeshImporter for FbxImporter {
    fn format(&self) -> ModelFormat {
        ModelFormat::Fbx
    }

    fn import(&self, bytes: &[u8], _ctx: &ImportContext) -> Result<ImportedModel> {
        let document = parse(bytes)?;
        debug!(
            version = ?document.version,
            top_level = document.nodes.len(),
            "parsed FBX"
        );
        geometry::extract(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_conversions() {
        assert_eq!(Property::I32(-3).as_f64(), Some(-3.0));
        assert_eq!(Property::F64(2.0).as_i64(), Some(2));
        assert_eq!(Property::F64(2.5).as_i64(), None);
        assert_eq!(Property::String("x".into()).as_str(), Some("x"));
        assert_eq!(Property::Raw(vec![1]).as_f64(), None);
    }

    #[test]
    fn test_values_flatten_arrays_and_scalars() {
        let mut node = Node::new("Vertices");
        node.properties = vec![Property::F64Array(vec![1.0, 2.0]), Property::I32(3)];
        assert_eq!(node.f64_values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(node.i64_values(), vec![1, 2, 3]);
    }

    #[test]
    fn test_property_entry_lookup() {
        let mut entry = Node::new("P");
        entry.properties = vec![
            Property::String("UpAxis".into()),
            Property::String("int".into()),
            Property::String("Integer".into()),
            Property::String(String::new()),
            Property::I32(2),
        ];
        let mut block = Node::new("Properties70");
        block.children.push(entry);
        let mut settings = Node::new("GlobalSettings");
        settings.children.push(block);

        let found = settings.property_entry("UpAxis").unwrap();
        assert_eq!(found.properties.last().and_then(Property::as_i64), Some(2));
        assert!(settings.property_entry("FrontAxis").is_none());
    }

    #[test]
    fn test_non_utf8_text_is_rejected() {
        let err = parse(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)));
    }
}
