//! End-to-end conversion tests.

use cube_forge::convert::{BoxMerger, VoxelSet};
use cube_forge::types::VoxelCoord;
use cube_forge::{
    export_geometry_json, export_mcaddon, load_model_from_bytes, ConvertError, ConvertOptions,
    Converter, Cube, FillMode, Mesh, ModelFormat, Occupancy,
};
use std::io::{Cursor, Read};

fn solid_options() -> ConvertOptions {
    ConvertOptions::default()
        .with_occupancy(Occupancy::SurfaceDistance)
        .with_fill(FillMode::Solid)
}

fn unit_cube() -> Mesh {
    Mesh::cuboid([-0.5, -0.5, -0.5], [0.5, 0.5, 0.5])
}

fn single_cube(options: ConvertOptions) -> Cube {
    let output = Converter::new(options).unwrap().convert(&unit_cube()).unwrap();
    let cubes = &output.document.geometry[0].bones[0].cubes;
    assert_eq!(cubes.len(), 1);
    cubes[0].clone()
}

/// Whether two cubes share interior volume.
fn interiors_overlap(a: &Cube, b: &Cube) -> bool {
    (0..3).all(|axis| {
        a.origin[axis] < b.origin[axis] + b.size[axis] - 1e-4
            && b.origin[axis] < a.origin[axis] + a.size[axis] - 1e-4
    })
}

#[test]
fn test_conversion_is_deterministic() {
    let converter = Converter::new(ConvertOptions::default().with_identifier("geometry.box")).unwrap();
    let a = converter.convert(&unit_cube()).unwrap();
    let b = converter.convert(&unit_cube()).unwrap();

    assert_eq!(
        export_geometry_json(&a).unwrap(),
        export_geometry_json(&b).unwrap()
    );
    assert_eq!(export_mcaddon(&a).unwrap(), export_mcaddon(&b).unwrap());
}

#[test]
fn test_empty_mesh_falls_back_to_one_block() {
    let output = Converter::new(ConvertOptions::default())
        .unwrap()
        .convert(&Mesh::new())
        .unwrap();
    let json = String::from_utf8(export_geometry_json(&output).unwrap()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let cube = &value["minecraft:geometry"][0]["bones"][0]["cubes"][0];
    assert_eq!(cube["origin"], serde_json::json!([-8, 0, -8]));
    assert_eq!(cube["size"], serde_json::json!([16, 16, 16]));
}

#[test]
fn test_solid_unit_cube_is_one_box() {
    let output = Converter::new(solid_options())
        .unwrap()
        .convert(&unit_cube())
        .unwrap();

    let cubes = &output.document.geometry[0].bones[0].cubes;
    assert_eq!(cubes.len(), 1);
    let cube = &cubes[0];
    for axis in 0..3 {
        // One cell of padding per side at 16 cells per block.
        assert!((cube.size[axis] - 16.0).abs() <= 2.0 + 1e-4, "{:?}", cube.size);
    }
    assert!((cube.origin[0] + 8.0).abs() <= 1.0 + 1e-4);
    assert!((cube.origin[1] - 0.0).abs() <= 1.0 + 1e-4);
    assert!((cube.origin[2] + 8.0).abs() <= 1.0 + 1e-4);
    assert_eq!(cube.uv, [0, 0]);
}

#[test]
fn test_scale_doubles_box_size() {
    let output = Converter::new(solid_options().with_scale(2.0))
        .unwrap()
        .convert(&unit_cube())
        .unwrap();

    assert_eq!(output.bounds.dimensions(), [2.0, 2.0, 2.0]);
    let cubes = &output.document.geometry[0].bones[0].cubes;
    assert_eq!(cubes.len(), 1);
    for axis in 0..3 {
        assert!((cubes[0].size[axis] - 32.0).abs() <= 2.0 + 1e-4);
    }
    let description = &output.document.geometry[0].description;
    assert_eq!(description.visible_bounds_width, 3.0);
    assert_eq!(description.visible_bounds_height, 3.0);
}

#[test]
fn test_scale_relation_between_conversions() {
    let one = single_cube(solid_options());
    let two = single_cube(solid_options().with_scale(2.0));

    // One cell is 1 px at 16 cells per block; each side carries one cell of shell padding.
    for axis in 0..3 {
        assert!(
            (two.origin[axis] - 2.0 * one.origin[axis]).abs() <= 1.0 + 1e-4,
            "origin {:?} vs {:?}",
            two.origin,
            one.origin
        );
        assert!(
            (two.size[axis] - 2.0 * one.size[axis]).abs() <= 2.0 + 1e-4,
            "size {:?} vs {:?}",
            two.size,
            one.size
        );
    }
}

#[test]
fn test_cubes_do_not_overlap_at_high_resolution() {
    let mesh = Mesh::cuboid([0.0; 3], [1.0; 3]);
    for options in [
        ConvertOptions::default().with_resolution(160),
        ConvertOptions::default()
            .with_resolution(320)
            .with_min_cube_size(0.05),
    ] {
        let output = Converter::new(options).unwrap().convert(&mesh).unwrap();
        let cubes = &output.document.geometry[0].bones[0].cubes;
        assert!(cubes.len() > 1);
        for (i, a) in cubes.iter().enumerate() {
            for b in &cubes[i + 1..] {
                assert!(!interiors_overlap(a, b), "{:?} overlaps {:?}", a, b);
            }
        }
    }
}

#[test]
fn test_min_cube_size_larger_than_a_cell_is_rejected() {
    let err = Converter::new(ConvertOptions::default().with_resolution(320)).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidOption(_)));
}

#[test]
fn test_separated_cubes_stay_separate() {
    let mut mesh = Mesh::cuboid([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    mesh.merge(&Mesh::cuboid([3.0, 0.0, 0.0], [4.0, 1.0, 1.0]));

    let output = Converter::new(solid_options()).unwrap().convert(&mesh).unwrap();
    let cubes = &output.document.geometry[0].bones[0].cubes;
    assert_eq!(cubes.len(), 2);

    let (left, right) = if cubes[0].origin[0] < cubes[1].origin[0] {
        (&cubes[0], &cubes[1])
    } else {
        (&cubes[1], &cubes[0])
    };
    assert!(left.origin[0] + left.size[0] < right.origin[0]);
    assert!(left.uv[0] < right.uv[0]);
}

#[test]
fn test_merged_boxes_cover_voxels_exactly_once() {
    let mut voxels = VoxelSet::new();
    for x in 0..5 {
        for z in 0..3 {
            voxels.insert(VoxelCoord::new(x, 0, z));
        }
    }
    for y in 1..4 {
        voxels.insert(VoxelCoord::new(0, y, 0));
    }
    voxels.insert(VoxelCoord::new(4, 2, 2));
    let expected = voxels.clone();

    let boxes = BoxMerger::new(16).merge_cells(voxels);
    let total: u64 = boxes.iter().map(|b| b.volume()).sum();
    assert_eq!(total, expected.len() as u64);

    for cell in expected.iter() {
        let owners = boxes.iter().filter(|b| b.contains(cell)).count();
        assert_eq!(owners, 1, "{:?} covered {} times", cell, owners);
    }
    for b in &boxes {
        assert!(b.cells().all(|c| expected.contains(&c)));
    }
}

#[test]
fn test_obj_bytes_to_mcaddon() {
    let obj = b"o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let model = load_model_from_bytes(obj, Some(ModelFormat::Obj)).unwrap();
    assert_eq!(model.mesh.triangle_count(), 1);

    let output = Converter::new(ConvertOptions::default().with_identifier("geometry.tri"))
        .unwrap()
        .convert_imported(&model)
        .unwrap();
    let bytes = export_mcaddon(&output).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "tri_BP/entities/tri.json",
            "tri_BP/manifest.json",
            "tri_RP/entity/tri.entity.json",
            "tri_RP/manifest.json",
            "tri_RP/models/entity/tri.geo.json",
            "tri_RP/textures/entity/tri.png",
        ]
    );

    let mut geo = String::new();
    archive
        .by_name("tri_RP/models/entity/tri.geo.json")
        .unwrap()
        .read_to_string(&mut geo)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&geo).unwrap();
    assert_eq!(value["format_version"], "1.12.0");
    assert_eq!(
        value["minecraft:geometry"][0]["description"]["identifier"],
        "geometry.tri"
    );
    assert_eq!(
        value["minecraft:geometry"][0]["bones"][0]["cubes"]
            .as_array()
            .unwrap()
            .len(),
        output.stats.cubes
    );
}
