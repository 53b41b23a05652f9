//! Binary glTF 2.0 export
//!
//! Every scene node becomes a glTF node with its own mesh and material,
//! stored as translation/rotation/scale. Textures are embedded as PNG in
//! the binary chunk after the geometry.

use crate::component::ComponentId;
use crate::export::encode_png;
use crate::scene::{Material, NodeSource, SceneSnapshot};
use crate::texture::fit_texture;
use crate::{Error, Result};
use serde_json::{Value, json};

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const LINEAR: u32 = 9729;
const CLAMP_TO_EDGE: u32 = 33071;

/// GLB export options
#[derive(Debug, Clone)]
pub struct GlbOptions {
    /// Longest texture edge; larger textures are downscaled
    pub max_texture_size: u32,
}

impl Default for GlbOptions {
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
        }
    }
}

/// Accumulates the binary chunk and the buffer views pointing into it
#[derive(Default)]
struct BinBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
}

impl BinBuilder {
    fn push(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        let padding = (4 - (self.bin.len() % 4)) % 4;
        self.bin.resize(self.bin.len() + padding, 0);

        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.bin.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_color(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(srgb_to_linear)
}

/// Build a GLB container for a scene snapshot
///
/// Returns the container and the components left out because their
/// texture could not be encoded.
pub fn write_glb(
    scene: &SceneSnapshot,
    options: &GlbOptions,
) -> Result<(Vec<u8>, Vec<ComponentId>)> {
    let mut bin = BinBuilder::default();
    let mut accessors = Vec::new();
    let mut meshes = Vec::new();
    let mut materials = Vec::new();
    let mut images = Vec::new();
    let mut textures = Vec::new();
    let mut nodes = Vec::new();
    let mut skipped = Vec::new();

    for node in &scene.nodes {
        let mesh = &node.mesh;
        if mesh.is_empty() {
            tracing::warn!("Skipping empty mesh {:?} in GLB export", node.name);
            continue;
        }

        let png = match &node.material.texture {
            Some(texture) => match encode_png(&fit_texture(texture, options.max_texture_size)) {
                Ok(png) => Some(png),
                Err(e) => {
                    tracing::warn!("Skipping {:?} in GLB export: {}", node.name, e);
                    if let NodeSource::Component(id) = node.source {
                        skipped.push(id);
                    }
                    continue;
                }
            },
            None => None,
        };

        let positions: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| v.position).collect();
        let normals: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| v.normal).collect();
        let uvs: Vec<[f32; 2]> = mesh.vertices.iter().map(|v| v.uv).collect();
        let (min, max) = mesh.bounds();
        let count = mesh.vertex_count();

        let position_view = bin.push(bytemuck::cast_slice(&positions), Some(ARRAY_BUFFER));
        let normal_view = bin.push(bytemuck::cast_slice(&normals), Some(ARRAY_BUFFER));
        let uv_view = bin.push(bytemuck::cast_slice(&uvs), Some(ARRAY_BUFFER));
        let index_view = bin.push(
            bytemuck::cast_slice(&mesh.indices),
            Some(ELEMENT_ARRAY_BUFFER),
        );

        let first = accessors.len();
        accessors.push(json!({
            "bufferView": position_view,
            "componentType": FLOAT,
            "count": count,
            "type": "VEC3",
            "min": min.to_array(),
            "max": max.to_array(),
        }));
        accessors.push(json!({
            "bufferView": normal_view,
            "componentType": FLOAT,
            "count": count,
            "type": "VEC3",
        }));
        accessors.push(json!({
            "bufferView": uv_view,
            "componentType": FLOAT,
            "count": count,
            "type": "VEC2",
        }));
        accessors.push(json!({
            "bufferView": index_view,
            "componentType": UNSIGNED_INT,
            "count": mesh.indices.len(),
            "type": "SCALAR",
        }));

        let texture_index = match png {
            Some(png) => {
                let view = bin.push(&png, None);
                images.push(json!({ "bufferView": view, "mimeType": "image/png" }));
                textures.push(json!({ "sampler": 0, "source": images.len() - 1 }));
                Some(textures.len() - 1)
            }
            None => None,
        };
        materials.push(material_json(&node.name, &node.material, texture_index));

        meshes.push(json!({
            "name": node.name,
            "primitives": [{
                "attributes": {
                    "POSITION": first,
                    "NORMAL": first + 1,
                    "TEXCOORD_0": first + 2,
                },
                "indices": first + 3,
                "material": materials.len() - 1,
            }],
        }));

        nodes.push(json!({
            "name": node.name,
            "mesh": meshes.len() - 1,
            "translation": node.translation.to_array(),
            "rotation": node.rotation.to_array(),
            "scale": node.scale.to_array(),
        }));
    }

    if nodes.is_empty() {
        return Err(Error::Export("nothing to export".to_string()));
    }

    let padding = (4 - (bin.bin.len() % 4)) % 4;
    bin.bin.resize(bin.bin.len() + padding, 0);

    let scene_nodes: Vec<usize> = (0..nodes.len()).collect();
    let mut root = json!({
        "asset": { "version": "2.0", "generator": concat!("cloudcard ", env!("CARGO_PKG_VERSION")) },
        "scene": 0,
        "scenes": [{ "nodes": scene_nodes }],
        "nodes": nodes,
        "meshes": meshes,
        "materials": materials,
        "accessors": accessors,
        "bufferViews": bin.views,
        "buffers": [{ "byteLength": bin.bin.len() }],
    });
    if !images.is_empty() {
        root["samplers"] = json!([{
            "magFilter": LINEAR,
            "minFilter": LINEAR,
            "wrapS": CLAMP_TO_EDGE,
            "wrapT": CLAMP_TO_EDGE,
        }]);
        root["images"] = Value::Array(images);
        root["textures"] = Value::Array(textures);
    }

    let json = serde_json::to_vec(&root)?;
    let glb = assemble(&json, &bin.bin);
    tracing::debug!(
        "GLB: {} nodes, {} bytes",
        root["nodes"].as_array().map_or(0, Vec::len),
        glb.len()
    );
    Ok((glb, skipped))
}

fn material_json(name: &str, material: &Material, texture: Option<usize>) -> Value {
    let [r, g, b] = linear_color(material.base_color.to_f32());
    let mut pbr = json!({
        "baseColorFactor": [r, g, b, 1.0],
        "metallicFactor": material.metalness,
        "roughnessFactor": material.roughness,
    });
    if let Some(index) = texture {
        pbr["baseColorTexture"] = json!({ "index": index });
    }

    let alpha_mode = if material.transparent { "BLEND" } else { "OPAQUE" };

    json!({
        "name": name,
        "pbrMetallicRoughness": pbr,
        "emissiveFactor": material.emissive,
        "alphaMode": alpha_mode,
        "doubleSided": false,
    })
}

/// Lay out the GLB header, JSON chunk and BIN chunk
fn assemble(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let json_padding = (4 - (json.len() % 4)) % 4;
    let bin_padding = (4 - (bin.len() % 4)) % 4;

    let total_size = 12  // GLB header
        + 8 + json.len() + json_padding  // JSON chunk
        + 8 + bin.len() + bin_padding; // BIN chunk

    let mut out = Vec::with_capacity(total_size);

    // GLB header
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total_size as u32).to_le_bytes());

    // JSON chunk
    out.extend_from_slice(&((json.len() + json_padding) as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534A_u32.to_le_bytes()); // "JSON"
    out.extend_from_slice(json);
    out.resize(out.len() + json_padding, 0x20);

    // BIN chunk
    out.extend_from_slice(&((bin.len() + bin_padding) as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942_u32.to_le_bytes()); // "BIN\0"
    out.extend_from_slice(bin);
    out.resize(out.len() + bin_padding, 0);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::config::EditorConfig;
    use crate::registry::ComponentRegistry;
    use crate::scene::{Background, Lighting};
    use crate::texture::BlockRasterizer;
    use approx::assert_relative_eq;
    use glam::Vec2;

    fn scene_with_text() -> SceneSnapshot {
        let config = EditorConfig::default();
        let card = Card::new(&config.card);
        let mut registry = ComponentRegistry::new(
            &config,
            *card.dimensions(),
            Box::new(BlockRasterizer::default()),
        );
        let id = registry.add_text("HELLO", 48, "Arial").expect("add");
        registry.place(id, Vec2::new(1.5, -1.0)).expect("place");
        let hidden = registry.add_text("HIDDEN", 24, "Arial").expect("add");
        registry.set_visible(hidden, false).expect("hide");
        SceneSnapshot::capture(&card, &registry, Lighting::export(), Background::Transparent)
    }

    #[test]
    fn test_glb_parses_with_gltf() {
        let bytes = write_glb(&scene_with_text(), &GlbOptions::default()).expect("glb").0;
        assert_eq!(&bytes[..4], b"glTF");
        assert_eq!(bytes.len() % 4, 0);

        let gltf = gltf::Gltf::from_slice(&bytes).expect("valid glb");
        assert_eq!(gltf.nodes().count(), 2);
        assert_eq!(gltf.meshes().count(), 2);
        assert_eq!(gltf.images().count(), 1);
        assert_eq!(gltf.animations().count(), 0);
        assert!(gltf.blob.is_some());
    }

    #[test]
    fn test_nodes_use_trs() {
        let bytes = write_glb(&scene_with_text(), &GlbOptions::default()).expect("glb").0;
        let gltf = gltf::Gltf::from_slice(&bytes).expect("valid glb");

        let text = gltf.nodes().nth(1).expect("text node");
        assert!(matches!(
            text.transform(),
            gltf::scene::Transform::Decomposed { .. }
        ));
        let (t, _, _) = text.transform().decomposed();
        assert_relative_eq!(t[0], 1.5, epsilon = 1e-5);
        assert_relative_eq!(t[1], -1.0, epsilon = 1e-5);
        assert_eq!(text.name(), Some("HELLO"));
    }

    #[test]
    fn test_textures_are_capped() {
        let options = GlbOptions {
            max_texture_size: 32,
        };
        let bytes = write_glb(&scene_with_text(), &options).expect("glb").0;
        let gltf = gltf::Gltf::from_slice(&bytes).expect("valid glb");
        let blob = gltf.blob.as_deref().expect("blob");

        let image = gltf.images().next().expect("image");
        let gltf::image::Source::View { view, mime_type } = image.source() else {
            panic!("texture is not embedded");
        };
        assert_eq!(mime_type, "image/png");
        let png = &blob[view.offset()..view.offset() + view.length()];
        let decoded = image::load_from_memory(png).expect("png");
        assert!(decoded.width() <= 32 && decoded.height() <= 32);
    }

    #[test]
    fn test_card_material_is_opaque() {
        let bytes = write_glb(&scene_with_text(), &GlbOptions::default()).expect("glb").0;
        let gltf = gltf::Gltf::from_slice(&bytes).expect("valid glb");
        let card = gltf.materials().next().expect("material");
        assert_eq!(card.alpha_mode(), gltf::material::AlphaMode::Opaque);
        assert_relative_eq!(card.pbr_metallic_roughness().roughness_factor(), 0.7);
    }

    #[test]
    fn test_unencodable_texture_is_skipped() {
        let config = EditorConfig::default();
        let card = Card::new(&config.card);
        let mut registry = ComponentRegistry::new(
            &config,
            *card.dimensions(),
            Box::new(BlockRasterizer::default()),
        );
        registry.add_text("HELLO", 48, "Arial").expect("add");
        let broken = registry.insert_raw_graphic(
            "broken.svg",
            "<html><body/></html>",
            image::RgbaImage::new(0, 0),
        );
        let scene =
            SceneSnapshot::capture(&card, &registry, Lighting::export(), Background::Transparent);

        let (bytes, skipped) = write_glb(&scene, &GlbOptions::default()).expect("glb");
        assert_eq!(skipped, vec![broken]);

        let gltf = gltf::Gltf::from_slice(&bytes).expect("valid glb");
        assert_eq!(gltf.nodes().count(), 2);
        assert_eq!(gltf.images().count(), 1);
        assert!(gltf.nodes().all(|n| n.name() != Some("broken.svg")));
    }
}
