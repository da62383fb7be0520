//! Output writers.
//!
//! Geometry JSON, the placeholder texture and the add-on bundle that packages
//! both.

pub mod json;
pub mod pack;
pub mod texture;

pub use json::{to_json_bytes, to_json_string, DecimalFormatter};
pub use pack::AddonBundle;
pub use texture::{build_texture, to_png};

use crate::convert::ConversionOutput;
use crate::error::Result;

/// Serialize the geometry document alone.
pub fn export_geometry_json(output: &ConversionOutput) -> Result<Vec<u8>> {
    to_json_bytes(&output.document)
}

/// Package a conversion as `.mcaddon` bytes.
pub fn export_mcaddon(output: &ConversionOutput) -> Result<Vec<u8>> {
    AddonBundle::build(output)?.to_mcaddon()
}
