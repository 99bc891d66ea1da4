use crate::renderer::postprocessing::BloomParameters;

/// Extract stage: keeps the part of each scene texel above the threshold,
/// rescaled back to the full range, written at half resolution.
pub struct BrightPassRenderPass {
    bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
}

impl BrightPassRenderPass {
    pub fn new(device: &wgpu::Device, color_target_format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bright Pass Bind Group Layout"),
            entries: &[
                super::uniform_entry::<BloomParameters>(0),
                super::sampler_entry(1),
                super::texture_entry(2),
            ],
        });

        let fragment_shader_module =
            device.create_shader_module(wgpu::include_wgsl!("bright_pass.fragment.wgsl"));

        let render_pipeline = super::create_fullscreen_pipeline(
            device,
            "Bright Pass Render Pipeline",
            &bind_group_layout,
            &fragment_shader_module,
            color_target_format,
        );

        Self {
            bind_group_layout,
            render_pipeline,
        }
    }

    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        parameters_buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
        src_texture_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bright Pass Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: parameters_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(src_texture_view),
                },
            ],
        })
    }

    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut rpass = super::begin_fullscreen_pass(encoder, "Bloom Extract Render Pass", target);
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
