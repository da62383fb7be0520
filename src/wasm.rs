//! WASM bindings for cube-forge.
//!
//! This module provides JavaScript-friendly APIs for use in the browser.

use crate::{ConvertOptions, Converter, ModelFormat};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the browser console
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// Conversion options.
#[wasm_bindgen]
pub struct ConvertSettings {
    inner: ConvertOptions,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl ConvertSettings {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ConvertSettings {
        ConvertSettings {
            inner: ConvertOptions::standard(),
        }
    }

    /// Parse options from a JSON string; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<ConvertSettings, JsError> {
        let inner: ConvertOptions = serde_json::from_str(json).map_err(js_error)?;
        Ok(ConvertSettings { inner })
    }

    #[wasm_bindgen(setter)]
    pub fn set_resolution(&mut self, value: u32) {
        self.inner.resolution = value;
    }

    #[wasm_bindgen(setter)]
    pub fn set_scale(&mut self, value: f32) {
        self.inner.scale = value;
    }

    #[wasm_bindgen(setter)]
    pub fn set_identifier(&mut self, value: String) {
        self.inner.identifier = value;
    }

    /// Source convention such as `"z-up-rh"`.
    pub fn set_convention(&mut self, value: &str) -> Result<(), JsError> {
        let convention = crate::SourceConvention::from_str(value)
            .ok_or_else(|| JsError::new(&format!("unknown convention: {}", value)))?;
        self.inner.source_convention = Some(convention);
        Ok(())
    }

    #[wasm_bindgen(setter)]
    pub fn set_solid(&mut self, value: bool) {
        self.inner.fill = if value {
            crate::FillMode::Solid
        } else {
            crate::FillMode::Shell
        };
    }

    #[wasm_bindgen(setter)]
    pub fn set_surface_distance(&mut self, value: bool) {
        self.inner.occupancy = if value {
            crate::Occupancy::SurfaceDistance
        } else {
            crate::Occupancy::CentroidDistance
        };
    }
}

/// Conversion result containing the add-on bytes.
#[wasm_bindgen]
pub struct ConvertResult {
    mcaddon: Vec<u8>,
    geometry_json: String,
    cube_count: usize,
    voxel_count: usize,
}

#[wasm_bindgen]
impl ConvertResult {
    /// Get the `.mcaddon` archive bytes.
    #[wasm_bindgen(getter)]
    pub fn mcaddon(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.mcaddon.as_slice())
    }

    /// Get the geometry document as JSON.
    #[wasm_bindgen(getter)]
    pub fn geometry_json(&self) -> String {
        self.geometry_json.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn cube_count(&self) -> usize {
        self.cube_count
    }

    #[wasm_bindgen(getter)]
    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }
}

/// Convert model bytes. `format` is `"gltf"`, `"glb"`, `"obj"` or `"fbx"`,
/// or empty to detect from the contents.
#[wasm_bindgen]
pub fn convert_model(
    data: &[u8],
    format: &str,
    settings: Option<ConvertSettings>,
) -> Result<ConvertResult, JsError> {
    let options = settings.unwrap_or_default().inner;
    let format = if format.is_empty() {
        None
    } else {
        Some(
            ModelFormat::from_name(format)
                .ok_or_else(|| JsError::new(&format!("unknown format: {}", format)))?,
        )
    };

    let converter = Converter::new(options).map_err(js_error)?;
    let model = crate::load_model_from_bytes(data, format).map_err(js_error)?;
    let output = converter.convert_imported(&model).map_err(js_error)?;

    Ok(ConvertResult {
        mcaddon: crate::export_mcaddon(&output).map_err(js_error)?,
        geometry_json: crate::export::to_json_string(&output.document).map_err(js_error)?,
        cube_count: output.stats.cubes,
        voxel_count: output.stats.voxels,
    })
}
