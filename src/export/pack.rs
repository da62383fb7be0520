//! Bedrock add-on packaging.
//!
//! An [`AddonBundle`] holds the files of a resource pack and a behaviour pack
//! for one converted model. It can be written as a `.mcaddon` archive or as
//! a directory tree.

use super::json::to_json_bytes;
use super::texture::{build_texture, to_png};
use crate::convert::{entity_name, ConversionOutput};
use crate::error::{ConvertError, Result};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Namespace for entity identifiers.
pub const ENTITY_NAMESPACE: &str = "cubeforge";

const PACK_VERSION: [u32; 3] = [1, 0, 0];
const MIN_ENGINE_VERSION: [u32; 3] = [1, 16, 0];

/// Deterministic UUID for one role of one entity's packs.
fn pack_uuid(name: &str, role: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{}:{}/{}", ENTITY_NAMESPACE, name, role).as_bytes(),
    )
}

/// Files of a resource pack and behaviour pack, keyed by relative path.
#[derive(Debug, Clone)]
pub struct AddonBundle {
    name: String,
    files: Vec<(String, Vec<u8>)>,
}

impl AddonBundle {
    /// Assemble both packs for a conversion result.
    pub fn build(output: &ConversionOutput) -> Result<Self> {
        let description = output
            .document
            .geometry
            .first()
            .map(|g| &g.description)
            .ok_or_else(|| ConvertError::Export("document has no geometry".to_string()))?;
        let name = entity_name(&description.identifier);
        if name.is_empty() {
            return Err(ConvertError::Export(format!(
                "identifier {:?} has no usable name",
                description.identifier
            )));
        }

        let entity_id = format!("{}:{}", ENTITY_NAMESPACE, name);
        let rp = format!("{}_RP", name);
        let bp = format!("{}_BP", name);
        let rp_header = pack_uuid(&name, "resource/header");
        let bp_header = pack_uuid(&name, "behavior/header");

        let rp_manifest = json!({
            "format_version": 2,
            "header": {
                "name": format!("{} Resources", name),
                "description": format!("Cube model for {}", entity_id),
                "uuid": rp_header.to_string(),
                "version": PACK_VERSION,
                "min_engine_version": MIN_ENGINE_VERSION,
            },
            "modules": [{
                "type": "resources",
                "uuid": pack_uuid(&name, "resource/module").to_string(),
                "version": PACK_VERSION,
            }],
        });

        let bp_manifest = json!({
            "format_version": 2,
            "header": {
                "name": format!("{} Behavior", name),
                "description": format!("Entity definition for {}", entity_id),
                "uuid": bp_header.to_string(),
                "version": PACK_VERSION,
                "min_engine_version": MIN_ENGINE_VERSION,
            },
            "modules": [{
                "type": "data",
                "uuid": pack_uuid(&name, "behavior/module").to_string(),
                "version": PACK_VERSION,
            }],
            "dependencies": [{
                "uuid": rp_header.to_string(),
                "version": PACK_VERSION,
            }],
        });

        let client_entity = json!({
            "format_version": "1.10.0",
            "minecraft:client_entity": {
                "description": {
                    "identifier": entity_id,
                    "materials": { "default": "entity_alphatest" },
                    "textures": { "default": format!("textures/entity/{}", name) },
                    "geometry": { "default": description.identifier },
                    "render_controllers": ["controller.render.default"],
                },
            },
        });

        let [dx, dy, dz] = output.bounds.dimensions();
        let server_entity = json!({
            "format_version": "1.16.0",
            "minecraft:entity": {
                "description": {
                    "identifier": entity_id,
                    "is_spawnable": true,
                    "is_summonable": true,
                    "is_experimental": false,
                },
                "components": {
                    "minecraft:physics": {},
                    "minecraft:collision_box": {
                        "width": dx.max(dz).max(0.1),
                        "height": dy.max(0.1),
                    },
                    "minecraft:health": { "value": 10, "max": 10 },
                },
            },
        });

        let texture = to_png(&build_texture(&output.document, output.base_color))?;

        let files = vec![
            (format!("{}/manifest.json", rp), to_json_bytes(&rp_manifest)?),
            (
                format!("{}/models/entity/{}.geo.json", rp, name),
                to_json_bytes(&output.document)?,
            ),
            (format!("{}/textures/entity/{}.png", rp, name), texture),
            (
                format!("{}/entity/{}.entity.json", rp, name),
                to_json_bytes(&client_entity)?,
            ),
            (format!("{}/manifest.json", bp), to_json_bytes(&bp_manifest)?),
            (
                format!("{}/entities/{}.json", bp, name),
                to_json_bytes(&server_entity)?,
            ),
        ];

        debug!(name = %name, files = files.len(), "assembled add-on bundle");
        Ok(Self { name, files })
    }

    /// Entity name used in file names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative paths and contents, in archive order.
    pub fn files(&self) -> &[(String, Vec<u8>)] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Encode as a `.mcaddon` (ZIP) archive.
    ///
    /// Entry timestamps are fixed so identical input gives identical bytes.
    pub fn to_mcaddon(&self) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for (path, bytes) in &self.files {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Write both packs under `dir`, returning the written paths.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut written = Vec::with_capacity(self.files.len());
        for (path, bytes) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, bytes)?;
            written.push(target);
        }
        debug!(dir = %dir.display(), files = written.len(), "wrote pack directory");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConvertOptions, Converter};
    use crate::mesh::Mesh;
    use std::io::Read;

    fn bundle(identifier: &str) -> AddonBundle {
        let output = Converter::new(ConvertOptions::default().with_identifier(identifier))
            .unwrap()
            .convert(&Mesh::cuboid([0.0; 3], [1.0, 2.0, 1.0]))
            .unwrap();
        AddonBundle::build(&output).unwrap()
    }

    #[test]
    fn test_bundle_layout() {
        let bundle = bundle("geometry.robot");
        assert_eq!(bundle.name(), "robot");
        let paths: Vec<&str> = bundle.files().iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "robot_RP/manifest.json",
                "robot_RP/models/entity/robot.geo.json",
                "robot_RP/textures/entity/robot.png",
                "robot_RP/entity/robot.entity.json",
                "robot_BP/manifest.json",
                "robot_BP/entities/robot.json",
            ]
        );
    }

    #[test]
    fn test_manifests_link_packs() {
        let bundle = bundle("geometry.robot");
        let rp: serde_json::Value =
            serde_json::from_slice(bundle.file("robot_RP/manifest.json").unwrap()).unwrap();
        let bp: serde_json::Value =
            serde_json::from_slice(bundle.file("robot_BP/manifest.json").unwrap()).unwrap();

        assert_eq!(rp["modules"][0]["type"], "resources");
        assert_eq!(bp["modules"][0]["type"], "data");
        assert_eq!(bp["dependencies"][0]["uuid"], rp["header"]["uuid"]);
        assert_ne!(rp["header"]["uuid"], bp["header"]["uuid"]);
        assert_ne!(rp["header"]["uuid"], rp["modules"][0]["uuid"]);
    }

    #[test]
    fn test_uuids_are_deterministic_per_name() {
        assert_eq!(pack_uuid("robot", "resource/header"), pack_uuid("robot", "resource/header"));
        assert_ne!(pack_uuid("robot", "resource/header"), pack_uuid("robot2", "resource/header"));
        assert_eq!(pack_uuid("robot", "resource/header").get_version_num(), 5);
    }

    #[test]
    fn test_entity_files_reference_geometry() {
        let bundle = bundle("geometry.robot");
        let client: serde_json::Value =
            serde_json::from_slice(bundle.file("robot_RP/entity/robot.entity.json").unwrap())
                .unwrap();
        let description = &client["minecraft:client_entity"]["description"];
        assert_eq!(description["identifier"], "cubeforge:robot");
        assert_eq!(description["geometry"]["default"], "geometry.robot");
        assert_eq!(description["textures"]["default"], "textures/entity/robot");

        let server: serde_json::Value =
            serde_json::from_slice(bundle.file("robot_BP/entities/robot.json").unwrap()).unwrap();
        let components = &server["minecraft:entity"]["components"];
        assert_eq!(components["minecraft:collision_box"]["height"], 2.0);
        assert_eq!(components["minecraft:collision_box"]["width"], 1.0);
    }

    #[test]
    fn test_mcaddon_archive_contents() {
        let bundle = bundle("geometry.robot");
        let bytes = bundle.to_mcaddon().unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 6);

        let mut geo = String::new();
        archive
            .by_name("robot_RP/models/entity/robot.geo.json")
            .unwrap()
            .read_to_string(&mut geo)
            .unwrap();
        assert!(geo.contains("\"minecraft:geometry\""));
        assert!(geo.contains("\"geometry.robot\""));
    }

    #[test]
    fn test_mcaddon_is_byte_identical() {
        assert_eq!(
            bundle("geometry.robot").to_mcaddon().unwrap(),
            bundle("geometry.robot").to_mcaddon().unwrap()
        );
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle("geometry.robot");
        let written = bundle.write_to_dir(dir.path()).unwrap();
        assert_eq!(written.len(), 6);
        let png = std::fs::read(dir.path().join("robot_RP/textures/entity/robot.png")).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
