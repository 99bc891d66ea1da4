/// Samplers shared by every pass on a device.
pub struct Samplers {
    /// Clamped bilinear filtering for full-screen passes. Also upsamples the
    /// half-resolution bloom target during the combine.
    pub bilinear: wgpu::Sampler,
    /// Repeating bilinear filtering for mesh textures.
    pub bilinear_repeat: wgpu::Sampler,
}

impl Samplers {
    pub fn new(device: &wgpu::Device) -> Self {
        let bilinear = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bilinear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let bilinear_repeat = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bilinear Repeat Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            bilinear,
            bilinear_repeat,
        }
    }
}
