use anyhow::{anyhow, Context, Result};
use glam::Mat4;
use log::info;
use pollster::FutureExt as _;

use crate::{
    assets::AssetSource,
    camera::projection_matrix,
    renderer::{
        overlay::{OverlayPass, Reticle},
        postprocessing::{BloomBindings, BloomPreset, BloomRenderer},
        render_target::{RenderTargetSet, TargetSpec, HDR_TEXTURE_FORMAT},
        samplers::Samplers,
        scene_pass::ScenePass,
    },
    scene::{DrawItem, MeshId, TextureId},
    window::Size,
};

/// What a frame needs from the orchestrator besides the pool itself.
pub struct FrameInputs<'a> {
    pub items: &'a [DrawItem],
    pub view: Mat4,
    pub hud_text: &'a str,
}

/// Everything that survives a resize.
struct DeviceResources {
    output_format: wgpu::TextureFormat,
    samplers: Samplers,
    scene_pass: ScenePass,
    overlay_pass: OverlayPass,
    bloom: BloomRenderer,
}

/// Everything whose dimensions follow the output surface.
struct SizeResources {
    size: Size,
    targets: RenderTargetSet,
    bloom_bindings: BloomBindings,
    reticle: Reticle,
    projection: Mat4,
}

/// Snapshot of what a pool holds, for comparing two pools.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolDescription {
    pub output_format: wgpu::TextureFormat,
    pub preset: BloomPreset,
    pub targets: [TargetSpec; 4],
    pub projection: Mat4,
    pub meshes: Vec<(MeshId, u32, u32)>,
    pub textures: Vec<(Option<TextureId>, wgpu::Extent3d)>,
}

/// GPU objects for one device and one output size.
///
/// A pool only exists fully built: [`ResourcePoolBuilder::build`] either
/// returns a complete pool or an error, and [`ResourcePool::resize`] keeps
/// the old size resources until their replacements are ready.
pub struct ResourcePool {
    device: DeviceResources,
    size: SizeResources,
    preset: BloomPreset,
}

pub struct ResourcePoolBuilder<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    assets: &'a dyn AssetSource,
    output_format: wgpu::TextureFormat,
    preset: BloomPreset,
}

impl<'a> ResourcePoolBuilder<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue, assets: &'a dyn AssetSource) -> Self {
        Self {
            device,
            queue,
            assets,
            output_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            preset: BloomPreset::default(),
        }
    }

    pub fn output_format(mut self, output_format: wgpu::TextureFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn preset(mut self, preset: BloomPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn build(self, size: Size) -> Result<ResourcePool> {
        let device = with_error_scope(self.device, "device resources", || {
            let samplers = Samplers::new(self.device);
            let scene_pass = ScenePass::new(self.device, self.queue, &samplers, self.assets)?;
            Ok(DeviceResources {
                output_format: self.output_format,
                samplers,
                scene_pass,
                overlay_pass: OverlayPass::new(self.device, HDR_TEXTURE_FORMAT),
                bloom: BloomRenderer::new(self.device, self.output_format, self.preset),
            })
        })?;
        let size = build_size_resources(self.device, &device, size, self.preset)?;

        info!(
            "Resource pool created at {}x{} ({:?}, preset {})",
            size.size.width, size.size.height, self.output_format, self.preset
        );

        Ok(ResourcePool {
            device,
            size,
            preset: self.preset,
        })
    }
}

impl ResourcePool {
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        assets: &dyn AssetSource,
        output_format: wgpu::TextureFormat,
        size: Size,
        preset: BloomPreset,
    ) -> Result<Self> {
        ResourcePoolBuilder::new(device, queue, assets)
            .output_format(output_format)
            .preset(preset)
            .build(size)
    }

    /// Releases every GPU object now instead of waiting for the last
    /// reference to drop.
    pub fn destroy(self) {
        let targets = &self.size.targets;
        for target in [
            &targets.scene_color,
            &targets.scene_depth,
            &targets.bloom_a,
            &targets.bloom_b,
        ] {
            target.texture.destroy();
        }
        info!("Resource pool destroyed");
    }

    /// Rebuilds the size-dependent half. On failure the pool keeps its
    /// previous size.
    pub fn resize(&mut self, device: &wgpu::Device, size: Size) -> Result<()> {
        if size == self.size.size {
            return Ok(());
        }
        let resources = build_size_resources(device, &self.device, size, self.preset)?;
        let old = std::mem::replace(&mut self.size, resources);
        for target in [
            &old.targets.scene_color,
            &old.targets.scene_depth,
            &old.targets.bloom_a,
            &old.targets.bloom_b,
        ] {
            target.texture.destroy();
        }
        info!("Resized render targets to {}x{}", size.width, size.height);
        Ok(())
    }

    pub fn set_preset(&mut self, queue: &wgpu::Queue, preset: BloomPreset) {
        if preset == self.preset {
            return;
        }
        self.device
            .bloom
            .set_preset(queue, &self.size.bloom_bindings, preset);
        self.preset = preset;
        info!("Bloom preset {preset}");
    }

    pub fn describe(&self) -> PoolDescription {
        PoolDescription {
            output_format: self.device.output_format,
            preset: self.preset,
            targets: self.size.targets.describe(),
            projection: self.size.projection,
            meshes: self.device.scene_pass.mesh_counts(),
            textures: self.device.scene_pass.texture_sizes(),
        }
    }

    /// Records the whole frame: scene, overlays, then post-processing into
    /// `output`.
    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        frame: &FrameInputs<'_>,
    ) {
        let DeviceResources {
            scene_pass,
            overlay_pass,
            bloom,
            ..
        } = &mut self.device;
        let SizeResources {
            size,
            targets,
            bloom_bindings,
            reticle,
            projection,
        } = &self.size;

        scene_pass.prepare(queue, frame.items, frame.view, *projection);
        overlay_pass.prepare_hud(queue, frame.hud_text, *size);

        scene_pass.draw(encoder, targets, frame.items);
        overlay_pass.draw(encoder, &targets.scene_color.texture_view, reticle);
        bloom.draw(encoder, bloom_bindings, targets, output, self.preset);
    }
}

fn build_size_resources(
    device: &wgpu::Device,
    resources: &DeviceResources,
    size: Size,
    preset: BloomPreset,
) -> Result<SizeResources> {
    with_error_scope(device, "size resources", || {
        let targets = RenderTargetSet::new(device, size);
        let bloom_bindings =
            resources
                .bloom
                .create_bindings(device, &resources.samplers, &targets, preset);
        Ok(SizeResources {
            size,
            reticle: Reticle::new(device, size),
            projection: projection_matrix(size.aspect_ratio()),
            targets,
            bloom_bindings,
        })
    })
    .with_context(|| format!("Failed to create {}x{} resources", size.width, size.height))
}

/// Runs `f` with out-of-memory and validation errors captured. Anything
/// captured fails the whole call and the value built by `f` is dropped.
fn with_error_scope<T>(device: &wgpu::Device, label: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let result = f();
    let validation = device.pop_error_scope().block_on();
    let out_of_memory = device.pop_error_scope().block_on();

    let value = result.with_context(|| format!("Failed to build {label}"))?;
    match validation.or(out_of_memory) {
        Some(err) => Err(anyhow!("{err}")).with_context(|| format!("Failed to build {label}")),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::{MeshData, ProceduralAssets, TextureData},
        renderer::{gpu::headless_device, render_target::TargetRole},
    };

    const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn create_pool(device: &wgpu::Device, queue: &wgpu::Queue, size: Size) -> ResourcePool {
        ResourcePool::create(
            device,
            queue,
            &ProceduralAssets::default(),
            OUTPUT_FORMAT,
            size,
            BloomPreset::Default,
        )
        .unwrap()
    }

    #[test]
    fn default_window_targets() {
        let Some((device, queue)) = headless_device() else {
            return;
        };
        let pool = create_pool(&device, &queue, Size::new(1600, 900));
        let targets = pool.describe().targets;
        let size_of = |role| targets.iter().find(|t| t.role == role).unwrap().size;
        assert_eq!(size_of(TargetRole::SceneColor), Size::new(1600, 900));
        assert_eq!(size_of(TargetRole::BloomA), Size::new(800, 450));
        assert_eq!(size_of(TargetRole::BloomB), Size::new(800, 450));
    }

    #[test]
    fn recreated_pool_matches_a_fresh_one() {
        let Some((device, queue)) = headless_device() else {
            return;
        };
        let size = Size::new(1600, 900);
        let first = create_pool(&device, &queue, size);
        let before = first.describe();
        first.destroy();

        let (fresh_device, fresh_queue) = headless_device().unwrap();
        let second = create_pool(&fresh_device, &fresh_queue, size);
        assert_eq!(second.describe(), before);
    }

    #[test]
    fn resize_rebuilds_targets_and_projection() {
        let Some((device, queue)) = headless_device() else {
            return;
        };
        let mut pool = create_pool(&device, &queue, Size::new(1600, 900));
        pool.resize(&device, Size::new(1001, 601)).unwrap();
        let description = pool.describe();
        let bloom = description
            .targets
            .iter()
            .find(|t| t.role == TargetRole::BloomA)
            .unwrap();
        assert_eq!(bloom.size, Size::new(500, 300));
        assert_eq!(
            description.projection,
            projection_matrix(1001.0 / 601.0)
        );
    }

    struct MissingAssets;

    impl AssetSource for MissingAssets {
        fn texture(&self, id: TextureId) -> Result<TextureData> {
            Err(anyhow!("no {}", id.file_name()))
        }

        fn mesh(&self, id: MeshId) -> Result<MeshData> {
            ProceduralAssets::default().mesh(id)
        }
    }

    #[test]
    fn missing_asset_fails_the_whole_pool() {
        let Some((device, queue)) = headless_device() else {
            return;
        };
        let result = ResourcePoolBuilder::new(&device, &queue, &MissingAssets)
            .output_format(OUTPUT_FORMAT)
            .build(Size::new(64, 64));
        assert!(result.is_err());
    }
}
