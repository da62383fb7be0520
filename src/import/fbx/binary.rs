//! Binary FBX node reader.
//!
//! Files from version 7500 on store record offsets as 64-bit integers;
//! older files use 32-bit. Array properties may be zlib-compressed.

use super::{Document, Node, Property, BINARY_MAGIC};
use crate::error::{ConvertError, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Magic, two marker bytes and the version.
const HEADER_LEN: usize = BINARY_MAGIC.len() + 2 + 4;

/// First version with 64-bit record headers.
const WIDE_OFFSETS_VERSION: u32 = 7500;

const MAX_DEPTH: usize = 128;

pub(super) fn parse(bytes: &[u8]) -> Result<Document> {
    if bytes.len() < HEADER_LEN {
        return Err(error("header is truncated"));
    }
    let mut reader = Reader {
        data: bytes,
        pos: BINARY_MAGIC.len() + 2,
        wide: false,
    };
    let version = reader.u32()?;
    reader.wide = version >= WIDE_OFFSETS_VERSION;

    let mut nodes = Vec::new();
    while reader.pos < bytes.len() {
        match reader.node(0)? {
            Some(node) => nodes.push(node),
            None => break,
        }
    }

    Ok(Document {
        version: Some(version),
        nodes,
    })
}

fn error(message: impl std::fmt::Display) -> ConvertError {
    ConvertError::Import(format!("FBX: {}", message))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    wide: bool,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| error(format!("unexpected end of file at byte {}", self.pos)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// A record header field: 32 or 64 bits depending on the version.
    fn offset(&mut self) -> Result<u64> {
        if self.wide {
            Ok(u64::from_le_bytes(self.array()?))
        } else {
            Ok(self.u32()? as u64)
        }
    }

    /// Read one node record. `None` marks the end of a node list.
    fn node(&mut self, depth: usize) -> Result<Option<Node>> {
        if depth > MAX_DEPTH {
            return Err(error("nodes are nested too deeply"));
        }
        let start = self.pos;
        let end_offset = self.offset()?;
        let property_count = self.offset()?;
        let _property_list_len = self.offset()?;
        let name_len = self.u8()? as usize;

        if end_offset == 0 {
            return Ok(None);
        }
        let end = usize::try_from(end_offset)
            .ok()
            .filter(|&end| end > start && end <= self.data.len())
            .ok_or_else(|| error(format!("record at byte {} has a bad end offset", start)))?;

        let name = String::from_utf8_lossy(self.take(name_len)?).into_owned();
        let mut node = Node::new(name);

        for _ in 0..property_count {
            if self.pos >= end {
                return Err(error(format!("{} declares more properties than it holds", node.name)));
            }
            node.properties.push(self.property()?);
        }

        while self.pos < end {
            match self.node(depth + 1)? {
                Some(child) => node.children.push(child),
                None => break,
            }
        }
        self.pos = end;
        Ok(Some(node))
    }

    fn property(&mut self) -> Result<Property> {
        let code = self.u8()?;
        let property = match code {
            b'C' => Property::Bool(self.u8()? != 0),
            b'Y' => Property::I16(i16::from_le_bytes(self.array()?)),
            b'I' => Property::I32(i32::from_le_bytes(self.array()?)),
            b'L' => Property::I64(i64::from_le_bytes(self.array()?)),
            b'F' => Property::F32(f32::from_le_bytes(self.array()?)),
            b'D' => Property::F64(f64::from_le_bytes(self.array()?)),
            b'S' => {
                let len = self.u32()? as usize;
                Property::String(String::from_utf8_lossy(self.take(len)?).into_owned())
            }
            b'R' => {
                let len = self.u32()? as usize;
                Property::Raw(self.take(len)?.to_vec())
            }
            b'b' => Property::BoolArray(self.array_property(1, |b| b[0] != 0)?),
            b'i' => Property::I32Array(self.array_property(4, |b| {
                i32::from_le_bytes([b[0], b[1], b[2], b[3]])
            })?),
            b'l' => Property::I64Array(self.array_property(8, |b| {
                i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            })?),
            b'f' => Property::F32Array(self.array_property(4, |b| {
                f32::from_le_bytes([b[0], b[1], b[2], b[3]])
            })?),
            b'd' => Property::F64Array(self.array_property(8, |b| {
                f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            })?),
            other => {
                return Err(error(format!(
                    "unknown property type {:?} at byte {}",
                    other as char,
                    self.pos - 1
                )))
            }
        };
        Ok(property)
    }

    fn array_property<T>(&mut self, element_size: usize, decode: impl Fn(&[u8]) -> T) -> Result<Vec<T>> {
        let count = self.u32()? as usize;
        let encoding = self.u32()?;
        let stored_len = self.u32()? as usize;
        let stored = self.take(stored_len)?;
        let expected = count
            .checked_mul(element_size)
            .ok_or_else(|| error("array length overflows"))?;

        let raw = match encoding {
            0 => {
                if stored_len != expected {
                    return Err(error(format!(
                        "array holds {} bytes, expected {}",
                        stored_len, expected
                    )));
                }
                std::borrow::Cow::Borrowed(stored)
            }
            1 => {
                let mut inflated = Vec::new();
                ZlibDecoder::new(stored)
                    .take(expected as u64)
                    .read_to_end(&mut inflated)
                    .map_err(|e| error(format!("corrupt compressed array: {}", e)))?;
                if inflated.len() != expected {
                    return Err(error(format!(
                        "compressed array inflated to {} bytes, expected {}",
                        inflated.len(),
                        expected
                    )));
                }
                std::borrow::Cow::Owned(inflated)
            }
            other => return Err(error(format!("unknown array encoding {}", other))),
        };

        Ok(raw.chunks_exact(element_size).map(decode).collect())
    }
}


#[cfg(test)]
mod tests {
    use super::writer::{record, Value, Writer};
    use super::*;

    fn sample(version: u32, compress: bool) -> Vec<u8> {
        Writer::write(
            version,
            &[
                record("Header", vec![Value::I32(7)], vec![]),
                record(
                    "Objects",
                    vec![],
                    vec![record(
                        "Geometry",
                        vec![Value::Str("Geometry::Cube"), Value::Str("Mesh")],
                        vec![
                            record("Vertices", vec![Value::F64Array(vec![0.0, 1.5, -2.0], compress)], vec![]),
                            record("PolygonVertexIndex", vec![Value::I32Array(vec![0, 1, -3], compress)], vec![]),
                        ],
                    )],
                ),
            ],
        )
    }

    fn check(document: &Document, version: u32) {
        assert_eq!(document.version, Some(version));
        assert_eq!(document.nodes.len(), 2);
        assert_eq!(document.nodes[0].properties, vec![Property::I32(7)]);

        let geometry = document.node("Objects").unwrap().child("Geometry").unwrap();
        assert_eq!(geometry.first_str(), Some("Geometry::Cube"));
        assert_eq!(
            geometry.child("Vertices").unwrap().properties,
            vec![Property::F64Array(vec![0.0, 1.5, -2.0])]
        );
        assert_eq!(
            geometry.child("PolygonVertexIndex").unwrap().i64_values(),
            vec![0, 1, -3]
        );
    }

    #[test]
    fn test_32_bit_offsets() {
        check(&parse(&sample(7400, false)).unwrap(), 7400);
    }

    #[test]
    fn test_64_bit_offsets() {
        check(&parse(&sample(7500, false)).unwrap(), 7500);
    }

    #[test]
    fn test_compressed_arrays() {
        check(&parse(&sample(7400, true)).unwrap(), 7400);
        check(&parse(&sample(7700, true)).unwrap(), 7700);
    }

    #[test]
    fn test_truncated_file_is_an_error() {
        let bytes = sample(7400, false);
        let err = parse(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ConvertError::Import(_)));
        assert!(parse(&bytes[..10]).is_err());
    }

    #[test]
    fn test_corrupt_compressed_array() {
        let mut bytes = sample(7400, true);
        // Break the zlib header of the first array.
        let pos = bytes.windows(2).position(|w| w == [0x78, 0x9c]).unwrap();
        bytes[pos + 1] = 0x00;
        assert!(parse(&bytes).is_err());
    }

    #[test]
    fn test_unknown_property_type() {
        let mut bytes = sample(7400, false);
        let pos = bytes.windows(5).position(|w| w == [b'I', 7, 0, 0, 0]).unwrap();
        bytes[pos] = b'?';
        assert!(parse(&bytes).is_err());
    }
}
