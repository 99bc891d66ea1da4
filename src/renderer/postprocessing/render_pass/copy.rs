/// Texel-exact copy of the scene buffer, used when bloom is off.
pub struct CopyRenderPass {
    bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
}

impl CopyRenderPass {
    pub fn new(device: &wgpu::Device, render_target_format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Copy Bind Group Layout"),
            entries: &[super::texture_entry(0)],
        });

        let fragment_shader_module =
            device.create_shader_module(wgpu::include_wgsl!("copy.fragment.wgsl"));

        let render_pipeline = super::create_fullscreen_pipeline(
            device,
            "Copy Render Pipeline",
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
        src_texture_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Copy Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(src_texture_view),
            }],
        })
    }

    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut rpass = super::begin_fullscreen_pass(encoder, "Pass-through Copy Render Pass", target);
        rpass.set_pipeline(&self.render_pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
