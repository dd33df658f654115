use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use stagehand_assets::{Material, MaterialLibrary, MeshData, MeshHandle, MeshStore};
use stagehand_common::{Color, ViewportId};
use stagehand_scene::{Light, LightKind, Scene, SceneError};
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

pub const MAX_LIGHTS: usize = 8;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuLight {
    position: [f32; 4],
    direction: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    light_count: [u32; 4],
    lights: [GpuLight; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    diffuse: [f32; 4],
    /// rgb specular, w shininess.
    specular: [f32; 4],
    /// x pattern strength.
    params: [f32; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Per-frame counters for the stats overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: u32,
    pub triangles: u64,
    pub lights: u32,
}

fn pack_light(light: &Light) -> GpuLight {
    let (kind, cos_inner, cos_outer) = match light.kind {
        LightKind::Point => (0.0, 0.0, 0.0),
        LightKind::Directional => (1.0, 0.0, 0.0),
        LightKind::Spot { inner, outer } => (2.0, (inner * 0.5).cos(), (outer * 0.5).cos()),
    };
    let p = light.position;
    let d = light.direction();
    let [dr, dg, db] = light.diffuse.to_array();
    let [sr, sg, sb] = light.specular.to_array();
    GpuLight {
        position: [p.x, p.y, p.z, kind],
        direction: [d.x, d.y, d.z, cos_inner],
        diffuse: [dr, dg, db, cos_outer],
        specular: [sr, sg, sb, 0.0],
    }
}

fn instance(model: Mat4, material: &Material) -> InstanceData {
    let cols = model.to_cols_array_2d();
    let [sr, sg, sb] = material.specular;
    InstanceData {
        model_0: cols[0],
        model_1: cols[1],
        model_2: cols[2],
        model_3: cols[3],
        diffuse: material.diffuse,
        specular: [sr, sg, sb, material.shininess.max(1.0)],
        params: [material.pattern, 0.0, 0.0, 0.0],
    }
}

/// One instance per attached entity whose mesh is available, at most `limit`.
fn collect_instances(
    scene: &Scene,
    materials: &MaterialLibrary,
    fallback: &Material,
    has_mesh: impl Fn(MeshHandle) -> bool,
    limit: usize,
) -> Result<Vec<(MeshHandle, InstanceData)>, SceneError> {
    let mut draws = Vec::new();
    for (id, entity) in scene.entities() {
        let Some(node) = entity.node else {
            continue;
        };
        if !has_mesh(entity.mesh) {
            tracing::trace!("entity {:?} mesh not uploaded, skipped", id);
            continue;
        }
        if draws.len() >= limit {
            tracing::warn!("more than {limit} entities; extra entities not drawn");
            break;
        }
        let model = scene.world_transform(node)?.matrix();
        let material = entity
            .material
            .as_deref()
            .and_then(|name| materials.get(name).ok())
            .unwrap_or(fallback);
        draws.push((entity.mesh, instance(model, material)));
    }
    Ok(draws)
}

fn upload_mesh(device: &wgpu::Device, mesh: &MeshData) -> GpuMesh {
    let vertices: Vec<Vertex> = mesh
        .vertices
        .iter()
        .map(|v| Vertex {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        })
        .collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{}_vertices", mesh.name)),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{}_indices", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
    }
}

/// wgpu-based scene renderer.
pub struct WgpuRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    meshes: BTreeMap<MeshHandle, GpuMesh>,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    fallback_material: Material,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        meshes: &MeshStore,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                            2 => Float32x2,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                            7 => Float32x4,
                            8 => Float32x4,
                            9 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let gpu_meshes: BTreeMap<MeshHandle, GpuMesh> = meshes
            .iter()
            .map(|(handle, mesh)| (handle, upload_mesh(device, mesh)))
            .collect();
        tracing::debug!("uploaded {} meshes", gpu_meshes.len());

        // Instance buffer (pre-allocated)
        let max_instances = 1024u32;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: (max_instances as u64) * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            meshes: gpu_meshes,
            instance_buffer,
            max_instances,
            depth_texture,
            surface_format,
            fallback_material: Material::default(),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Render one frame of `scene` through `viewport` into `target`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        scene: &Scene,
        materials: &MaterialLibrary,
        viewport: ViewportId,
    ) -> Result<FrameStats, SceneError> {
        let vp = scene.viewport(viewport)?;
        let camera = scene.camera(vp.camera)?;

        let mut uniforms = Uniforms::zeroed();
        uniforms.view_proj = camera.view_projection().to_cols_array_2d();
        let eye = camera.position;
        uniforms.camera_pos = [eye.x, eye.y, eye.z, 1.0];
        let [ar, ag, ab] = scene.ambient().to_array();
        uniforms.ambient = [ar, ag, ab, 1.0];

        let mut light_count = 0usize;
        for (_, light) in scene.lights().filter(|(_, l)| l.visible) {
            if light_count == MAX_LIGHTS {
                tracing::warn!("more than {MAX_LIGHTS} visible lights; extra lights ignored");
                break;
            }
            uniforms.lights[light_count] = pack_light(light);
            light_count += 1;
        }
        uniforms.light_count = [light_count as u32, 0, 0, 0];
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let draws = collect_instances(
            scene,
            materials,
            &self.fallback_material,
            |mesh| self.meshes.contains_key(&mesh),
            self.max_instances as usize,
        )?;

        if !draws.is_empty() {
            let instances: Vec<InstanceData> = draws.iter().map(|(_, i)| *i).collect();
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        let mut stats = FrameStats {
            lights: light_count as u32,
            ..FrameStats::default()
        };

        {
            let Color { r, g, b } = vp.background;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (i, (handle, _)) in draws.iter().enumerate() {
                let mesh = &self.meshes[handle];
                let i = i as u32;
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, i..i + 1);
                stats.draws += 1;
                stats.triangles += (mesh.index_count / 3) as u64;
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        Ok(stats)
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
