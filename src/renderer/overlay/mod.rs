mod font;

use std::mem::size_of;

use bytemuck::cast_slice;
use glam::{Vec2, Vec4};
use log::warn;
use wgpu::util::DeviceExt;

use crate::{renderer::mesh::ColorVertex, window::Size};

/// Longest HUD line that still fits the vertex buffer.
pub const MAX_HUD_CHARS: usize = 48;
const HUD_CAPACITY: usize =
    MAX_HUD_CHARS * (font::GLYPH_WIDTH * font::GLYPH_HEIGHT) as usize * 6;
/// Screen pixels per font pixel.
const HUD_SCALE: f32 = 3.0;
const HUD_ORIGIN: Vec2 = Vec2::new(16.0, 16.0);
const HUD_COLOR: Vec4 = Vec4::new(0.9, 0.9, 0.9, 0.85);

const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

/// Reticle triangles as offsets from the screen centre, in pixels of a
/// half-resolution canvas (+y down). Each triangle is red, green, blue.
const RETICLE: [[Vec2; 3]; 4] = [
    [Vec2::new(0.0, -20.0), Vec2::new(-15.0, -40.0), Vec2::new(15.0, -40.0)],
    [Vec2::new(20.0, 0.0), Vec2::new(40.0, -15.0), Vec2::new(40.0, 15.0)],
    [Vec2::new(0.0, 20.0), Vec2::new(15.0, 40.0), Vec2::new(-15.0, 40.0)],
    [Vec2::new(-20.0, 0.0), Vec2::new(-40.0, 15.0), Vec2::new(-40.0, -15.0)],
];

pub fn reticle_vertices(size: Size) -> Vec<ColorVertex> {
    let canvas = Vec2::new(size.width as f32, size.height as f32) / 2.0;
    let to_ndc = |offset: Vec2| Vec2::new(offset.x * 2.0 / canvas.x, -offset.y * 2.0 / canvas.y);
    RETICLE
        .iter()
        .flat_map(|triangle| {
            triangle
                .iter()
                .zip([RED, GREEN, BLUE])
                .map(|(offset, color)| ColorVertex::new(to_ndc(*offset), color))
        })
        .collect()
}

/// Two triangles per lit font pixel, anchored at the top-left corner.
pub fn hud_vertices(text: &str, size: Size) -> Vec<ColorVertex> {
    let to_ndc = |pixel: Vec2| {
        Vec2::new(
            pixel.x * 2.0 / size.width as f32 - 1.0,
            1.0 - pixel.y * 2.0 / size.height as f32,
        )
    };
    font::lit_pixels(text)
        .flat_map(|(column, row)| {
            let top_left = HUD_ORIGIN + Vec2::new(column as f32, row as f32) * HUD_SCALE;
            let bottom_right = top_left + Vec2::splat(HUD_SCALE);
            let a = to_ndc(top_left);
            let b = to_ndc(Vec2::new(bottom_right.x, top_left.y));
            let c = to_ndc(Vec2::new(top_left.x, bottom_right.y));
            let d = to_ndc(bottom_right);
            [a, c, b, b, c, d].map(|position| ColorVertex::new(position, HUD_COLOR))
        })
        .collect()
}

/// Reticle geometry for the current output size.
pub struct Reticle {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl Reticle {
    pub fn new(device: &wgpu::Device, size: Size) -> Self {
        let vertices = reticle_vertices(size);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Reticle Vertex Buffer"),
            contents: cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        }
    }
}

/// Alpha-blended screen-space geometry drawn over the scene buffer.
pub struct OverlayPass {
    render_pipeline: wgpu::RenderPipeline,
    hud_vertex_buffer: wgpu::Buffer,
    hud_vertex_count: u32,
}

impl OverlayPass {
    pub fn new(device: &wgpu::Device, render_target_format: wgpu::TextureFormat) -> Self {
        let hud_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("HUD Vertex Buffer"),
            size: (HUD_CAPACITY * size_of::<ColorVertex>()) as _,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let render_pipeline = {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Overlay Pipeline Layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

            let shader_module = device.create_shader_module(wgpu::include_wgsl!("overlay.wgsl"));

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Overlay Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: "vs_main",
                    compilation_options: Default::default(),
                    buffers: &[ColorVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: "fs_main",
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: render_target_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        Self {
            render_pipeline,
            hud_vertex_buffer,
            hud_vertex_count: 0,
        }
    }

    pub fn prepare_hud(&mut self, queue: &wgpu::Queue, text: &str, size: Size) {
        let mut vertices = hud_vertices(text, size);
        if vertices.len() > HUD_CAPACITY {
            warn!("HUD text too long, truncating: {text}");
            vertices.truncate(HUD_CAPACITY - HUD_CAPACITY % 6);
        }
        if !vertices.is_empty() {
            queue.write_buffer(&self.hud_vertex_buffer, 0, cast_slice(&vertices));
        }
        self.hud_vertex_count = vertices.len() as u32;
    }

    /// Draws the reticle then the HUD on top of what `target` already holds.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, reticle: &Reticle) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Overlay Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        rpass.set_pipeline(&self.render_pipeline);

        rpass.set_vertex_buffer(0, reticle.vertex_buffer.slice(..));
        rpass.draw(0..reticle.vertex_count, 0..1);

        if self.hud_vertex_count > 0 {
            rpass.set_vertex_buffer(0, self.hud_vertex_buffer.slice(..));
            rpass.draw(0..self.hud_vertex_count, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reticle_is_four_rgb_triangles() {
        let vertices = reticle_vertices(Size::new(1600, 900));
        assert_eq!(vertices.len(), 12);
        for triangle in vertices.chunks(3) {
            assert_eq!(triangle[0].color, RED.to_array());
            assert_eq!(triangle[1].color, GREEN.to_array());
            assert_eq!(triangle[2].color, BLUE.to_array());
        }
    }

    #[test]
    fn reticle_offsets_are_in_half_resolution_pixels() {
        let vertices = reticle_vertices(Size::new(1600, 900));
        // 20 px above centre on an 800x450 canvas
        assert_eq!(vertices[0].position, Vec2::new(0.0, 40.0 / 450.0));
        // 40 px right of centre
        assert_eq!(vertices[4].position.x, 80.0 / 800.0);
    }

    #[test]
    fn reticle_is_symmetric_about_the_centre() {
        let vertices = reticle_vertices(Size::new(1280, 720));
        let sum = vertices.iter().fold(Vec2::ZERO, |sum, v| sum + v.position);
        assert!(sum.length() < 1e-5);
    }

    #[test]
    fn hud_starts_at_top_left() {
        let size = Size::new(800, 600);
        let vertices = hud_vertices("1", size);
        assert_eq!(vertices.len() % 6, 0);
        for vertex in &vertices {
            assert!(vertex.position.x < 0.0 && vertex.position.y > 0.0);
        }
        assert!(hud_vertices("", size).is_empty());
    }

    #[test]
    fn hud_line_fits_capacity() {
        let text = "8".repeat(MAX_HUD_CHARS);
        assert!(hud_vertices(&text, Size::new(800, 600)).len() <= HUD_CAPACITY);
    }
}
