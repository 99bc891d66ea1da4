use std::{collections::HashMap, mem::size_of};

use anyhow::{Context, Result};
use bytemuck::{bytes_of, Pod, Zeroable};
use glam::{Mat4, UVec4, Vec4};
use log::{debug, warn};

use crate::{
    assets::AssetSource,
    renderer::{
        mesh::{GpuMesh, GpuTexture, Vertex},
        render_target::{RenderTargetSet, DEPTH_TEXTURE_FORMAT, HDR_TEXTURE_FORMAT},
        samplers::Samplers,
    },
    scene::{DrawItem, MeshId, TextureId},
};

/// Upper bound on entities drawn per frame.
pub const MAX_DRAWS: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
struct DrawUniforms {
    world: Mat4,
    view_projection: Mat4,
    /// xyz: direction the light travels, w: intensity
    light_direction: Vec4,
    light_color: Vec4,
    ambient: Vec4,
    capabilities: UVec4,
}

impl DrawUniforms {
    fn new(item: &DrawItem, view_projection: Mat4) -> Self {
        let material = &item.material;
        let (light_direction, light_color) = match material.light() {
            Some(light) => (
                light.direction.extend(light.intensity),
                light.color.extend(1.0),
            ),
            None => (Vec4::ZERO, Vec4::ZERO),
        };
        Self {
            world: item.world,
            view_projection,
            light_direction,
            light_color,
            ambient: material.ambient.extend(1.0),
            capabilities: UVec4::new(material.capabilities().bits(), 0, 0, 0),
        }
    }
}

/// Draws the scene entities into the offscreen scene buffer.
pub struct ScenePass {
    render_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_stride: wgpu::BufferAddress,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_groups: HashMap<TextureId, wgpu::BindGroup>,
    untextured_bind_group: wgpu::BindGroup,
    textures: Vec<(TextureId, GpuTexture)>,
    white: GpuTexture,
    meshes: HashMap<MeshId, GpuMesh>,
    draw_count: usize,
}

impl ScenePass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        samplers: &Samplers,
        assets: &dyn AssetSource,
    ) -> Result<Self> {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as wgpu::BufferAddress;
        let uniform_stride = (size_of::<DrawUniforms>() as wgpu::BufferAddress).next_multiple_of(alignment);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Draw Uniform Buffer"),
            size: uniform_stride * MAX_DRAWS as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Draw Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(size_of::<DrawUniforms>() as _),
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
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
                ],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Draw Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size_of::<DrawUniforms>() as _),
                }),
            }],
        });

        let create_texture_bind_group = |label: &str, texture: &GpuTexture| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &texture_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Sampler(&samplers.bilinear_repeat),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&texture.texture_view),
                    },
                ],
            })
        };

        let mut textures = Vec::with_capacity(TextureId::ALL.len());
        let mut texture_bind_groups = HashMap::new();
        for id in TextureId::ALL {
            let data = assets
                .texture(id)
                .with_context(|| format!("Failed to load {id:?} texture"))?;
            let texture = GpuTexture::new(device, queue, &format!("{id:?} Texture"), &data);
            texture_bind_groups.insert(
                id,
                create_texture_bind_group(&format!("{id:?} Texture Bind Group"), &texture),
            );
            textures.push((id, texture));
        }

        let white = GpuTexture::white(device, queue);
        let untextured_bind_group = create_texture_bind_group("Untextured Bind Group", &white);

        let mut meshes = HashMap::new();
        for id in [MeshId::Sphere, MeshId::Ship] {
            let data = assets
                .mesh(id)
                .with_context(|| format!("Failed to load {id:?} mesh"))?;
            meshes.insert(id, GpuMesh::new(device, &format!("{id:?}"), &data));
        }

        let render_pipeline = {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

            let shader_module = device.create_shader_module(wgpu::include_wgsl!("scene.wgsl"));

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: "vs_main",
                    compilation_options: Default::default(),
                    buffers: &[Vertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: "fs_main",
                    compilation_options: Default::default(),
                    targets: &[Some(HDR_TEXTURE_FORMAT.into())],
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_TEXTURE_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Ok(Self {
            render_pipeline,
            uniform_buffer,
            uniform_stride,
            uniform_bind_group,
            texture_bind_groups,
            untextured_bind_group,
            textures,
            white,
            meshes,
            draw_count: 0,
        })
    }

    /// Uploads per-draw constants for this frame's items.
    pub fn prepare(&mut self, queue: &wgpu::Queue, items: &[DrawItem], view: Mat4, projection: Mat4) {
        if items.len() > MAX_DRAWS {
            warn!("Dropping {} draws over the limit of {}", items.len() - MAX_DRAWS, MAX_DRAWS);
        }
        let view_projection = projection * view;

        let count = items.len().min(MAX_DRAWS);
        let mut bytes = vec![0u8; self.uniform_stride as usize * count];
        for (chunk, item) in bytes
            .chunks_exact_mut(self.uniform_stride as usize)
            .zip(items)
        {
            let uniforms = DrawUniforms::new(item, view_projection);
            chunk[..size_of::<DrawUniforms>()].copy_from_slice(bytes_of(&uniforms));
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.uniform_buffer, 0, &bytes);
        }
        self.draw_count = count;
    }

    /// Clears scene color and depth, then draws the prepared items in order.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, targets: &RenderTargetSet, items: &[DrawItem]) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.scene_color.texture_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.scene_depth.texture_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let size = targets.output_size();
        rpass.set_viewport(0.0, 0.0, size.width as f32, size.height as f32, 0.0, 1.0);
        rpass.set_pipeline(&self.render_pipeline);

        for (slot, item) in items.iter().take(self.draw_count).enumerate() {
            let Some(mesh) = self.meshes.get(&item.mesh) else {
                debug!("No mesh for {:?}", item.mesh);
                continue;
            };
            let texture_bind_group = item
                .material
                .texture()
                .and_then(|id| self.texture_bind_groups.get(&id))
                .unwrap_or(&self.untextured_bind_group);

            let offset = (slot as wgpu::BufferAddress * self.uniform_stride) as wgpu::DynamicOffset;
            rpass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
            rpass.set_bind_group(1, texture_bind_group, &[]);
            mesh.draw(&mut rpass);
        }
    }

    pub fn mesh_counts(&self) -> Vec<(MeshId, u32, u32)> {
        let mut counts: Vec<_> = self
            .meshes
            .iter()
            .map(|(id, mesh)| (*id, mesh.vertex_count(), mesh.index_count()))
            .collect();
        counts.sort_by_key(|(id, _, _)| *id as u8);
        counts
    }

    /// Sizes of the loaded textures; `None` is the fallback white texel.
    pub fn texture_sizes(&self) -> Vec<(Option<TextureId>, wgpu::Extent3d)> {
        self.textures
            .iter()
            .map(|(id, texture)| (Some(*id), texture.size))
            .chain(Some((None, self.white.size)))
            .collect()
    }
}
