//! Placeholder entity texture.

use crate::error::{ConvertError, Result};
use crate::geometry::GeometryDocument;
use image::{ImageEncoder, Rgba, RgbaImage};

/// Fill colour when the source has no material colour.
pub const DEFAULT_COLOR: [u8; 4] = [200, 200, 200, 255];

/// Amount each channel is darkened on a cube's UV border.
const MARKER_SHADE: f32 = 0.75;

/// Convert a floating point RGBA colour to 8-bit channels.
pub fn color_to_rgba8(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| {
        if c.is_finite() {
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            0
        }
    })
}

/// Pixel rectangle `[u0, v0, u1, v1)` a box-UV cube reads from.
///
/// Bedrock unwraps a `w × h × d` cube into a `2(w + d) × (d + h)` strip
/// anchored at its UV. Sizes are rounded up to whole pixels.
fn uv_footprint(uv: [u32; 2], size: [f32; 3]) -> [u64; 4] {
    let [w, h, d] = size.map(|s| {
        if s.is_finite() {
            s.ceil().max(1.0) as u64
        } else {
            1
        }
    });
    let [u, v] = uv.map(u64::from);
    [u, v, u + 2 * (w + d), v + d + h]
}

/// Build the texture for a document: a flat fill with a darker outline around
/// every cube's UV footprint.
pub fn build_texture(document: &GeometryDocument, base_color: Option<[f32; 4]>) -> RgbaImage {
    let (width, height) = document
        .geometry
        .first()
        .map(|g| (g.description.texture_width, g.description.texture_height))
        .unwrap_or((16, 16));

    let fill = base_color.map(color_to_rgba8).unwrap_or(DEFAULT_COLOR);
    let mut image = RgbaImage::from_pixel(width, height, Rgba(fill));
    let marker = Rgba([
        shade(fill[0]),
        shade(fill[1]),
        shade(fill[2]),
        fill[3],
    ]);

    for geometry in &document.geometry {
        for cube in geometry.bones.iter().flat_map(|b| &b.cubes) {
            let [u0, v0, u1, v1] = uv_footprint(cube.uv, cube.size);
            let x_end = u1.min(u64::from(width));
            let y_end = v1.min(u64::from(height));
            for y in v0..y_end {
                for x in u0..x_end {
                    let border = x == u0 || y == v0 || x + 1 == u1 || y + 1 == v1;
                    if border {
                        image.put_pixel(x as u32, y as u32, marker);
                    }
                }
            }
        }
    }
    image
}

fn shade(channel: u8) -> u8 {
    (channel as f32 * MARKER_SHADE).round() as u8
}

/// Encode an image as PNG.
pub fn to_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let cursor = std::io::Cursor::new(&mut bytes);
    let encoder = image::codecs::png::PngEncoder::new(cursor);

    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| ConvertError::Export(format!("Failed to encode PNG: {}", e)))?;

    Ok(bytes)
}
