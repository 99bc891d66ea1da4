use crate::renderer::postprocessing::BloomParameters;

/// Combine stage: saturation- and intensity-adjusted scene plus bloom,
/// written to the presentable surface.
pub struct ComposeRenderPass {
    bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
}

impl ComposeRenderPass {
    pub fn new(device: &wgpu::Device, render_target_format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compose Bind Group Layout"),
            entries: &[
                super::uniform_entry::<BloomParameters>(0),
                super::sampler_entry(1),
                super::texture_entry(2),
                super::texture_entry(3),
            ],
        });

        let fragment_shader_module =
            device.create_shader_module(wgpu::include_wgsl!("compose.fragment.wgsl"));

        let render_pipeline = super::create_fullscreen_pipeline(
            device,
            "Post Process Compose Render Pipeline",
            &bind_group_layout,
            &fragment_shader_module,
            render_target_format,
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
        color_texture_view: &wgpu::TextureView,
        bloom_texture_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Compose Bind Group"),
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
                    resource: wgpu::BindingResource::TextureView(color_texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(bloom_texture_view),
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
        let mut rpass = super::begin_fullscreen_pass(encoder, "Bloom Combine Render Pass", target);
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
