//! GPU renderer for card scenes
//!
//! Draws a [`SceneSnapshot`] into an offscreen texture with wgpu and reads
//! the pixels back into an RGBA frame. Opaque nodes are drawn first, then
//! transparent ones from back to front with alpha blending.
//!
//! Device setup and readback are async so the browser host can drive them
//! from a promise; native callers use the blocking wrappers built on
//! `pollster`.

use crate::camera::Camera;
use bytemuck::{Pod, Zeroable};
use cloudcard_core::mesh::Vertex;
use cloudcard_core::scene::{Background, Light, Lighting, SceneNode, SceneSnapshot};
use futures::channel::oneshot;
use glam::Vec3;
use image::RgbaImage;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;

/// Color target format; frames are read back byte for byte
const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Directional lights beyond this count are ignored
pub const MAX_LIGHTS: usize = 8;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// Errors that can occur while presenting a frame
#[derive(Error, Debug)]
pub enum RenderError {
    /// The target has no pixels
    #[error("Viewport is empty ({0}x{1})")]
    EmptyViewport(u32, u32),

    #[error("Frame {width}x{height} exceeds the GPU texture limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("No suitable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("Failed to create GPU device: {0}")]
    Device(String),

    #[error("Failed to read the frame back: {0}")]
    Readback(String),
}

/// Something that can show a scene through a camera
pub trait Presenter {
    fn present(&mut self, scene: &SceneSnapshot, camera: &Camera) -> Result<(), RenderError>;
}

/// A shared device and queue
#[derive(Debug, Clone)]
pub struct GpuDevice {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuDevice {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    /// Initialize wgpu for headless rendering (no window)
    pub async fn headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::NoAdapter(e.to_string()))?;

        let info = adapter.get_info();
        tracing::debug!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Cloudcard Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;

        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// Blocking form of [`GpuDevice::headless`]
    #[cfg(not(target_arch = "wasm32"))]
    pub fn headless_blocking() -> Result<Self, RenderError> {
        pollster::block_on(Self::headless())
    }

    /// Largest frame or texture edge the device accepts
    pub fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Per-frame uniforms: camera, lights and backdrop
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    ambient: [f32; 4],
    backdrop_center: [f32; 4],
    backdrop_edge: [f32; 4],
    resolution: [f32; 2],
    light_count: u32,
    _pad: u32,
    light_dirs: [[f32; 4]; MAX_LIGHTS],
    light_colors: [[f32; 4]; MAX_LIGHTS],
}

impl FrameUniforms {
    fn new(camera: &Camera, lighting: &Lighting, background: Background, size: (u32, u32)) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        uniforms.resolution = [size.0 as f32, size.1 as f32];

        if let Background::Gradient { center, edge } = background {
            uniforms.backdrop_center = Vec3::from_array(center.to_f32()).extend(1.0).to_array();
            uniforms.backdrop_edge = Vec3::from_array(edge.to_f32()).extend(1.0).to_array();
        }

        let mut ambient = Vec3::ZERO;
        let mut count = 0;
        for light in &lighting.lights {
            match *light {
                Light::Ambient { color, intensity } => {
                    ambient += Vec3::from_array(color.to_f32()) * intensity;
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => {
                    if count == MAX_LIGHTS {
                        tracing::debug!("Ignoring directional lights past {}", MAX_LIGHTS);
                        continue;
                    }
                    uniforms.light_dirs[count] = position.normalize_or_zero().extend(0.0).to_array();
                    uniforms.light_colors[count] =
                        (Vec3::from_array(color.to_f32()) * intensity).extend(0.0).to_array();
                    count += 1;
                }
            }
        }
        uniforms.ambient = ambient.extend(1.0).to_array();
        uniforms.light_count = count as u32;
        uniforms
    }
}

/// Per-node uniforms: transforms and material
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct NodeUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
    emissive: [f32; 4],
}

impl NodeUniforms {
    fn new(node: &SceneNode) -> Self {
        let model = node.transform();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            base_color: Vec3::from_array(node.material.base_color.to_f32())
                .extend(1.0)
                .to_array(),
            emissive: Vec3::from_array(node.material.emissive).extend(0.0).to_array(),
        }
    }
}

/// A texture uploaded for one scene image, kept while the image is in use
struct CachedTexture {
    /// Holds the image so its address is not reused while cached
    _source: Arc<RgbaImage>,
    view: wgpu::TextureView,
}

/// GPU buffers for one node of the current frame
struct NodeDraw {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    bind_group: wgpu::BindGroup,
    transparent: bool,
}

struct Targets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
        }
    }
}

/// Offscreen renderer that keeps the last frame on the CPU side
pub struct GpuRenderer {
    gpu: GpuDevice,
    frame: RgbaImage,
    targets: Option<Targets>,
    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    backdrop_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    node_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    blank: wgpu::TextureView,
    textures: HashMap<usize, CachedTexture>,
}

impl GpuRenderer {
    /// Create a renderer on an existing device
    pub fn new(gpu: &GpuDevice, width: u32, height: u32) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Card Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/card.wgsl").into()),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Node Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniforms::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &node_layout],
            push_constant_ranges: &[],
        });
        let backdrop_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Backdrop Pipeline Layout"),
            bind_group_layouts: &[&frame_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };

        let scene_pipeline = |label: &str, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&scene_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[vertex_layout.clone()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: FRAME_FORMAT,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // The card can be turned to show its back
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let opaque_pipeline = scene_pipeline("Opaque Pipeline", wgpu::BlendState::REPLACE, true);
        let transparent_pipeline =
            scene_pipeline("Transparent Pipeline", wgpu::BlendState::ALPHA_BLENDING, false);

        let backdrop_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Backdrop Pipeline"),
            layout: Some(&backdrop_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_backdrop"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_backdrop"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: FRAME_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Print Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // Untextured materials sample plain white
        let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        let blank = upload_texture(gpu, &white, "Blank Texture");

        Self {
            gpu: gpu.clone(),
            frame: RgbaImage::new(width, height),
            targets: None,
            opaque_pipeline,
            transparent_pipeline,
            backdrop_pipeline,
            frame_buffer,
            frame_bind_group,
            node_layout,
            sampler,
            blank,
            textures: HashMap::new(),
        }
    }

    /// Create a renderer on its own headless device
    pub async fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let gpu = GpuDevice::headless().await?;
        Ok(Self::new(&gpu, width, height))
    }

    pub fn device(&self) -> &GpuDevice {
        &self.gpu
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    /// Resize the frame; contents are cleared
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.frame.dimensions() {
            self.frame = RgbaImage::new(width, height);
            self.targets = None;
        }
    }

    /// The last rendered frame
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn into_frame(self) -> RgbaImage {
        self.frame
    }

    /// Render a scene and return the frame
    pub async fn render_async(
        &mut self,
        scene: &SceneSnapshot,
        camera: &Camera,
    ) -> Result<&RgbaImage, RenderError> {
        let (width, height) = self.frame.dimensions();
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport(width, height));
        }
        let max = self.gpu.max_texture_size();
        if width > max || height > max {
            return Err(RenderError::TooLarge { width, height, max });
        }

        let readback = self.encode(scene, camera, width, height);
        self.frame = read_back(&self.gpu, &readback, width, height).await?;
        Ok(&self.frame)
    }

    /// Blocking form of [`GpuRenderer::render_async`]
    #[cfg(not(target_arch = "wasm32"))]
    pub fn render(&mut self, scene: &SceneSnapshot, camera: &Camera) -> Result<&RgbaImage, RenderError> {
        pollster::block_on(self.render_async(scene, camera))
    }

    /// Record and submit the passes for one frame; returns the readback buffer
    fn encode(&mut self, scene: &SceneSnapshot, camera: &Camera, width: u32, height: u32) -> Readback {
        let uniforms = FrameUniforms::new(camera, &scene.lighting, scene.background, (width, height));
        self.gpu
            .queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let draws = self.prepare_nodes(scene, camera);

        let device = Arc::clone(&self.gpu.device);
        let targets = self
            .targets
            .get_or_insert_with(|| Targets::new(&device, width, height));

        let clear = match scene.background {
            Background::Transparent => wgpu::Color::TRANSPARENT,
            Background::Solid(color) => {
                let [r, g, b] = color.to_f32().map(f64::from);
                wgpu::Color { r, g, b, a: 1.0 }
            }
            Background::Gradient { edge, .. } => {
                let [r, g, b] = edge.to_f32().map(f64::from);
                wgpu::Color { r, g, b, a: 1.0 }
            }
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            if matches!(scene.background, Background::Gradient { .. }) {
                pass.set_pipeline(&self.backdrop_pipeline);
                pass.draw(0..3, 0..1); // Full-screen triangle
            }

            for draw in &draws {
                let pipeline = if draw.transparent {
                    &self.transparent_pipeline
                } else {
                    &self.opaque_pipeline
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &draw.bind_group, &[]);
                pass.set_vertex_buffer(0, draw.vertices.slice(..));
                pass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        let readback = Readback::new(&device, width, height);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(readback.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        readback
    }

    /// Buffers and bind groups for every node, in draw order
    fn prepare_nodes(&mut self, scene: &SceneSnapshot, camera: &Camera) -> Vec<NodeDraw> {
        let view = camera.view_matrix();

        let (opaque, mut transparent): (Vec<&SceneNode>, Vec<&SceneNode>) =
            scene.nodes.iter().partition(|n| !n.material.transparent);

        // Farthest first; view space looks down -Z
        transparent.sort_by(|a, b| {
            let za = view.transform_point3(a.translation).z;
            let zb = view.transform_point3(b.translation).z;
            za.total_cmp(&zb)
        });

        let mut used = HashSet::new();
        let draws = opaque
            .into_iter()
            .chain(transparent)
            .filter(|node| !node.mesh.indices.is_empty())
            .map(|node| {
                let texture_key = node.material.texture.as_ref().map(|texture| {
                    let key = Arc::as_ptr(texture) as usize;
                    used.insert(key);
                    self.cache_texture(key, texture);
                    key
                });
                self.node_draw(node, texture_key)
            })
            .collect();

        // Drop textures of components that are gone
        self.textures.retain(|key, _| used.contains(key));
        draws
    }

    fn cache_texture(&mut self, key: usize, texture: &Arc<RgbaImage>) {
        if self.textures.contains_key(&key) {
            return;
        }
        let max = self.gpu.max_texture_size();
        let view = if texture.width() > max || texture.height() > max {
            let fitted = cloudcard_core::texture::fit_texture(texture, max);
            upload_texture(&self.gpu, &fitted, "Print Texture")
        } else {
            upload_texture(&self.gpu, texture, "Print Texture")
        };
        self.textures.insert(
            key,
            CachedTexture {
                _source: Arc::clone(texture),
                view,
            },
        );
    }

    fn node_draw(&self, node: &SceneNode, texture_key: Option<usize>) -> NodeDraw {
        let device = &self.gpu.device;

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Node Vertex Buffer"),
            contents: bytemuck::cast_slice(&node.mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Node Index Buffer"),
            contents: bytemuck::cast_slice(&node.mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Node Uniform Buffer"),
            contents: bytemuck::cast_slice(&[NodeUniforms::new(node)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let texture = texture_key
            .and_then(|key| self.textures.get(&key))
            .map_or(&self.blank, |cached| &cached.view);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Node Bind Group"),
            layout: &self.node_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        NodeDraw {
            vertices,
            indices,
            index_count: node.mesh.indices.len() as u32,
            bind_group,
            transparent: node.material.transparent,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Presenter for GpuRenderer {
    fn present(&mut self, scene: &SceneSnapshot, camera: &Camera) -> Result<(), RenderError> {
        self.render(scene, camera).map(|_| ())
    }
}

/// Upload an RGBA image as a sampled texture
fn upload_texture(gpu: &GpuDevice, image: &RgbaImage, label: &str) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width: image.width().max(1),
        height: image.height().max(1),
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    if image.width() > 0 && image.height() > 0 {
        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );
    }

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Mappable copy of the color target with rows padded for the copy
struct Readback {
    buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

impl Readback {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            padded_bytes_per_row,
        }
    }
}

/// Wait for the copy and strip the row padding
async fn read_back(gpu: &GpuDevice, readback: &Readback, width: u32, height: u32) -> Result<RgbaImage, RenderError> {
    let slice = readback.buffer.slice(..);
    let (tx, rx) = oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    // Native backends complete the mapping here; the browser resolves it on its own
    gpu.device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    rx.await
        .map_err(|_| RenderError::Readback("mapping was cancelled".to_string()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let row_bytes = (width * 4) as usize;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    {
        let data = slice.get_mapped_range();
        for row in data
            .chunks(readback.padded_bytes_per_row as usize)
            .take(height as usize)
        {
            pixels.extend_from_slice(&row[..row_bytes]);
        }
    }
    readback.buffer.unmap();

    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| RenderError::Readback("frame buffer is short".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudcard_core::card::Card;
    use cloudcard_core::color::CardColor;
    use cloudcard_core::config::EditorConfig;
    use cloudcard_core::registry::ComponentRegistry;
    use cloudcard_core::texture::BlockRasterizer;
    use image::Rgba;

    fn scene(background: Background, text: bool) -> SceneSnapshot {
        let config = EditorConfig::default();
        let mut card = Card::new(&config.card);
        card.color = CardColor::Red;
        let mut registry = ComponentRegistry::new(
            &config,
            *card.dimensions(),
            Box::new(BlockRasterizer::default()),
        );
        if text {
            registry.add_text("MMMM", 72, "Arial").expect("add");
        }
        SceneSnapshot::capture(&card, &registry, Lighting::export(), background)
    }

    fn camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::default();
        camera.set_viewport(width, height);
        camera
    }

    /// Headless renderer, or None on machines without any adapter
    fn renderer(width: u32, height: u32) -> Option<GpuRenderer> {
        match GpuDevice::headless_blocking() {
            Ok(gpu) => Some(GpuRenderer::new(&gpu, width, height)),
            Err(e) => {
                eprintln!("skipping GPU test: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_frame_uniforms_split_lights() {
        let uniforms = FrameUniforms::new(
            &camera(10, 10),
            &Lighting::editor(),
            Background::STUDIO,
            (10, 10),
        );
        assert_eq!(uniforms.light_count, 4);
        assert_relative_eq!(uniforms.ambient[0], 1.0);
        assert_relative_eq!(uniforms.light_colors[0][1], 0.2, epsilon = 1e-6);
        let dir = Vec3::from_slice(&uniforms.light_dirs[0][..3]);
        assert_relative_eq!(dir.length(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(uniforms.backdrop_edge[0], 0x1a as f32 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn test_frame_uniforms_cap_lights() {
        let mut lighting = Lighting::editor();
        for _ in 0..MAX_LIGHTS {
            lighting.lights.push(Light::Directional {
                color: cloudcard_core::color::Rgb::WHITE,
                intensity: 1.0,
                position: Vec3::Z,
            });
        }
        let uniforms = FrameUniforms::new(&camera(4, 4), &lighting, Background::Transparent, (4, 4));
        assert_eq!(uniforms.light_count as usize, MAX_LIGHTS);
    }

    #[test]
    fn test_uniform_layout_matches_shader() {
        // Sizes of the WGSL structs with uniform alignment
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 384);
        assert_eq!(std::mem::size_of::<NodeUniforms>(), 160);
    }

    #[test]
    fn test_empty_viewport() {
        let Some(mut renderer) = renderer(0, 10) else {
            return;
        };
        let result = renderer.render(&scene(Background::Transparent, false), &camera(1, 1));
        assert!(matches!(result, Err(RenderError::EmptyViewport(0, 10))));
    }

    #[test]
    fn test_transparent_background_and_card() {
        let Some(mut renderer) = renderer(160, 100) else {
            return;
        };
        let frame = renderer
            .render(&scene(Background::Transparent, false), &camera(160, 100))
            .expect("render");

        // Corner is outside the card
        assert_eq!(frame.get_pixel(0, 0)[3], 0);
        // Center shows the red card
        let center = frame.get_pixel(80, 50);
        assert_eq!(center[3], 255);
        assert!(center[0] > center[1] && center[0] > center[2]);
    }

    #[test]
    fn test_greenscreen_background() {
        let Some(mut renderer) = renderer(64, 64) else {
            return;
        };
        let frame = renderer
            .render(&scene(Background::GREENSCREEN, false), &camera(64, 64))
            .expect("render");
        assert_eq!(*frame.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_gradient_is_lighter_in_the_middle() {
        let Some(mut renderer) = renderer(64, 64) else {
            return;
        };
        let mut snapshot = scene(Background::STUDIO, false);
        snapshot.nodes.clear();
        let frame = renderer.render(&snapshot, &camera(64, 64)).expect("render");
        let middle = frame.get_pixel(32, 32);
        let corner = frame.get_pixel(0, 0);
        assert!(middle[2] > corner[2]);
        assert_eq!(*corner, Rgba([0x1a, 0x1a, 0x1a, 255]));
    }

    #[test]
    fn test_text_draws_over_card() {
        let Some(mut renderer) = renderer(200, 120) else {
            return;
        };
        let cam = camera(200, 120);
        let plain = renderer
            .render(&scene(Background::Transparent, false), &cam)
            .expect("render")
            .clone();
        let with_text = renderer
            .render(&scene(Background::Transparent, true), &cam)
            .expect("render");

        let differing = plain
            .pixels()
            .zip(with_text.pixels())
            .filter(|(a, b)| a != b)
            .count();
        assert!(differing > 0);
    }

    #[test]
    fn test_texture_cache_follows_scene() {
        let Some(mut renderer) = renderer(64, 40) else {
            return;
        };
        let cam = camera(64, 40);
        renderer
            .render(&scene(Background::Transparent, true), &cam)
            .expect("render");
        assert_eq!(renderer.textures.len(), 1);

        renderer
            .render(&scene(Background::Transparent, false), &cam)
            .expect("render");
        assert!(renderer.textures.is_empty());
    }

    #[test]
    fn test_resize() {
        let Some(mut renderer) = renderer(10, 10) else {
            return;
        };
        renderer.resize(20, 5);
        assert_eq!((renderer.width(), renderer.height()), (20, 5));
    }
}
