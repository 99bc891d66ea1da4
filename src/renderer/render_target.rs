use crate::window::Size;

pub const HDR_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// What a render target is used for within a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TargetRole {
    SceneColor,
    SceneDepth,
    BloomA,
    BloomB,
    /// The presentable surface texture. Owned by the surface, not the pool.
    BackBuffer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub role: TargetRole,
    pub size: Size,
    pub format: wgpu::TextureFormat,
}

pub struct RenderTarget {
    pub role: TargetRole,
    pub size: Size,
    pub format: wgpu::TextureFormat,
    pub texture: wgpu::Texture,
    pub texture_view: wgpu::TextureView,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, spec: &TargetSpec) -> Self {
        let label = format!("{:?} Render Target", spec.role);
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !spec.format.is_depth_stencil_format() {
            usage |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: spec.size.into(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: spec.format,
            usage,
            view_formats: &[],
        });
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            role: spec.role,
            size: spec.size,
            format: spec.format,
            texture,
            texture_view,
        }
    }

    pub fn spec(&self) -> TargetSpec {
        TargetSpec {
            role: self.role,
            size: self.size,
            format: self.format,
        }
    }
}

/// Offscreen targets for one output size.
pub struct RenderTargetSet {
    pub scene_color: RenderTarget,
    pub scene_depth: RenderTarget,
    pub bloom_a: RenderTarget,
    pub bloom_b: RenderTarget,
}

impl RenderTargetSet {
    /// Targets needed for an output of `size`. The bloom chain runs at
    /// half resolution.
    pub fn plan(size: Size) -> [TargetSpec; 4] {
        let half = size.half();
        [
            TargetSpec {
                role: TargetRole::SceneColor,
                size,
                format: HDR_TEXTURE_FORMAT,
            },
            TargetSpec {
                role: TargetRole::SceneDepth,
                size,
                format: DEPTH_TEXTURE_FORMAT,
            },
            TargetSpec {
                role: TargetRole::BloomA,
                size: half,
                format: HDR_TEXTURE_FORMAT,
            },
            TargetSpec {
                role: TargetRole::BloomB,
                size: half,
                format: HDR_TEXTURE_FORMAT,
            },
        ]
    }

    pub fn new(device: &wgpu::Device, size: Size) -> Self {
        let [scene_color, scene_depth, bloom_a, bloom_b] =
            Self::plan(size).map(|spec| RenderTarget::new(device, &spec));

        Self {
            scene_color,
            scene_depth,
            bloom_a,
            bloom_b,
        }
    }

    pub fn get(&self, role: TargetRole) -> Option<&RenderTarget> {
        match role {
            TargetRole::SceneColor => Some(&self.scene_color),
            TargetRole::SceneDepth => Some(&self.scene_depth),
            TargetRole::BloomA => Some(&self.bloom_a),
            TargetRole::BloomB => Some(&self.bloom_b),
            TargetRole::BackBuffer => None,
        }
    }

    pub fn output_size(&self) -> Size {
        self.scene_color.size
    }

    pub fn bloom_size(&self) -> Size {
        self.bloom_a.size
    }

    pub fn describe(&self) -> [TargetSpec; 4] {
        [
            self.scene_color.spec(),
            self.scene_depth.spec(),
            self.bloom_a.spec(),
            self.bloom_b.spec(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_for(plan: &[TargetSpec], role: TargetRole) -> TargetSpec {
        *plan.iter().find(|spec| spec.role == role).unwrap()
    }

    #[test]
    fn plan_for_default_window() {
        let plan = RenderTargetSet::plan(Size::new(1600, 900));
        assert_eq!(spec_for(&plan, TargetRole::SceneColor).size, Size::new(1600, 900));
        assert_eq!(spec_for(&plan, TargetRole::SceneDepth).size, Size::new(1600, 900));
        assert_eq!(spec_for(&plan, TargetRole::BloomA).size, Size::new(800, 450));
        assert_eq!(spec_for(&plan, TargetRole::BloomB).size, Size::new(800, 450));
    }

    #[test]
    fn odd_sizes_round_down() {
        let plan = RenderTargetSet::plan(Size::new(1023, 767));
        assert_eq!(spec_for(&plan, TargetRole::BloomA).size, Size::new(511, 383));
    }

    #[test]
    fn plan_never_includes_the_back_buffer() {
        let plan = RenderTargetSet::plan(Size::new(64, 64));
        assert!(plan.iter().all(|spec| spec.role != TargetRole::BackBuffer));
    }

    #[test]
    fn bloom_targets_are_filterable_hdr() {
        let plan = RenderTargetSet::plan(Size::new(64, 64));
        assert_eq!(spec_for(&plan, TargetRole::BloomA).format, HDR_TEXTURE_FORMAT);
        assert_eq!(spec_for(&plan, TargetRole::SceneDepth).format, DEPTH_TEXTURE_FORMAT);
    }
}
