mod kernel;
mod preset;
#[cfg(test)]
mod reference;
mod render_pass;

use bytemuck::bytes_of;
use log::debug;
use wgpu::util::DeviceExt;

pub use kernel::{BlurDirection, BlurKernel, BlurUniforms};
pub use preset::{BloomParameters, BloomPreset};
use render_pass::{BlurRenderPass, BrightPassRenderPass, ComposeRenderPass, CopyRenderPass};

use crate::{
    renderer::{
        render_target::{RenderTargetSet, TargetRole, HDR_TEXTURE_FORMAT},
        samplers::Samplers,
    },
    window::Size,
};

/// One full-screen draw of the post-process chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BloomStage {
    Extract,
    BlurHorizontal,
    BlurVertical,
    Combine,
    Copy,
}

impl BloomStage {
    pub fn inputs(self) -> &'static [TargetRole] {
        match self {
            Self::Extract => &[TargetRole::SceneColor],
            Self::BlurHorizontal => &[TargetRole::BloomA],
            Self::BlurVertical => &[TargetRole::BloomB],
            Self::Combine => &[TargetRole::SceneColor, TargetRole::BloomA],
            Self::Copy => &[TargetRole::SceneColor],
        }
    }

    pub fn output(self) -> TargetRole {
        match self {
            Self::Extract => TargetRole::BloomA,
            Self::BlurHorizontal => TargetRole::BloomB,
            Self::BlurVertical => TargetRole::BloomA,
            Self::Combine | Self::Copy => TargetRole::BackBuffer,
        }
    }
}

/// Stages recorded for `preset`, in submission order.
pub fn stage_plan(preset: BloomPreset) -> &'static [BloomStage] {
    if preset.is_enabled() {
        &[
            BloomStage::Extract,
            BloomStage::BlurHorizontal,
            BloomStage::BlurVertical,
            BloomStage::Combine,
        ]
    } else {
        &[BloomStage::Copy]
    }
}

/// Pipelines and the shared parameter buffer. Survives resizes.
pub struct BloomRenderer {
    bright_pass: BrightPassRenderPass,
    blur_pass: BlurRenderPass,
    compose_pass: ComposeRenderPass,
    copy_pass: CopyRenderPass,
    parameters_buffer: wgpu::Buffer,
}

/// Size-dependent half of the chain: tap buffers and the bind groups that
/// reference the current render targets.
pub struct BloomBindings {
    bloom_size: Size,
    blur_horizontal_taps: wgpu::Buffer,
    blur_vertical_taps: wgpu::Buffer,
    bright_bind_group: wgpu::BindGroup,
    blur_horizontal_bind_group: wgpu::BindGroup,
    blur_vertical_bind_group: wgpu::BindGroup,
    compose_bind_group: wgpu::BindGroup,
    copy_bind_group: wgpu::BindGroup,
}

impl BloomRenderer {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        preset: BloomPreset,
    ) -> Self {
        let parameters_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Parameters Uniform Buffer"),
            contents: bytes_of(&preset.parameters()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            bright_pass: BrightPassRenderPass::new(device, HDR_TEXTURE_FORMAT),
            blur_pass: BlurRenderPass::new(device, HDR_TEXTURE_FORMAT),
            compose_pass: ComposeRenderPass::new(device, output_format),
            copy_pass: CopyRenderPass::new(device, output_format),
            parameters_buffer,
        }
    }

    pub fn create_bindings(
        &self,
        device: &wgpu::Device,
        samplers: &Samplers,
        targets: &RenderTargetSet,
        preset: BloomPreset,
    ) -> BloomBindings {
        let bloom_size = targets.bloom_size();
        let kernel = BlurKernel::new(preset.parameters().blur_amount);

        let create_taps = |label: &str, direction: BlurDirection| {
            let step = direction.texel_step(bloom_size.width, bloom_size.height);
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes_of(&BlurUniforms::new(&kernel, step)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let blur_horizontal_taps = create_taps("Horizontal Blur Taps", BlurDirection::Horizontal);
        let blur_vertical_taps = create_taps("Vertical Blur Taps", BlurDirection::Vertical);

        let bright_bind_group = self.bright_pass.create_bind_group(
            device,
            &self.parameters_buffer,
            &samplers.bilinear,
            &targets.scene_color.texture_view,
        );
        let blur_horizontal_bind_group = self.blur_pass.create_bind_group(
            device,
            &blur_horizontal_taps,
            &samplers.bilinear,
            &targets.bloom_a.texture_view,
        );
        let blur_vertical_bind_group = self.blur_pass.create_bind_group(
            device,
            &blur_vertical_taps,
            &samplers.bilinear,
            &targets.bloom_b.texture_view,
        );
        let compose_bind_group = self.compose_pass.create_bind_group(
            device,
            &self.parameters_buffer,
            &samplers.bilinear,
            &targets.scene_color.texture_view,
            &targets.bloom_a.texture_view,
        );
        let copy_bind_group = self
            .copy_pass
            .create_bind_group(device, &targets.scene_color.texture_view);

        BloomBindings {
            bloom_size,
            blur_horizontal_taps,
            blur_vertical_taps,
            bright_bind_group,
            blur_horizontal_bind_group,
            blur_vertical_bind_group,
            compose_bind_group,
            copy_bind_group,
        }
    }

    /// Rewrites the parameter and tap buffers. No targets are reallocated.
    pub fn set_preset(&self, queue: &wgpu::Queue, bindings: &BloomBindings, preset: BloomPreset) {
        debug!("Uploading bloom parameters for preset {preset}");
        let parameters = preset.parameters();
        queue.write_buffer(&self.parameters_buffer, 0, bytes_of(&parameters));

        let kernel = BlurKernel::new(parameters.blur_amount);
        let Size { width, height } = bindings.bloom_size;
        for (buffer, direction) in [
            (&bindings.blur_horizontal_taps, BlurDirection::Horizontal),
            (&bindings.blur_vertical_taps, BlurDirection::Vertical),
        ] {
            let uniforms = BlurUniforms::new(&kernel, direction.texel_step(width, height));
            queue.write_buffer(buffer, 0, bytes_of(&uniforms));
        }
    }

    /// Records the chain for `preset`. Every stage is its own render pass,
    /// so a target sampled by one stage is never bound as an attachment of
    /// the same pass.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &BloomBindings,
        targets: &RenderTargetSet,
        output: &wgpu::TextureView,
        preset: BloomPreset,
    ) {
        for stage in stage_plan(preset) {
            let target = match stage.output() {
                TargetRole::BackBuffer => output,
                role => match targets.get(role) {
                    Some(target) => &target.texture_view,
                    None => continue,
                },
            };
            match stage {
                BloomStage::Extract => {
                    self.bright_pass
                        .draw(encoder, &bindings.bright_bind_group, target)
                }
                BloomStage::BlurHorizontal => self.blur_pass.draw(
                    encoder,
                    "Bloom Horizontal Blur Render Pass",
                    &bindings.blur_horizontal_bind_group,
                    target,
                ),
                BloomStage::BlurVertical => self.blur_pass.draw(
                    encoder,
                    "Bloom Vertical Blur Render Pass",
                    &bindings.blur_vertical_bind_group,
                    target,
                ),
                BloomStage::Combine => {
                    self.compose_pass
                        .draw(encoder, &bindings.compose_bind_group, target)
                }
                BloomStage::Copy => self.copy_pass.draw(encoder, &bindings.copy_bind_group, target),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_presets_run_four_stages_in_order() {
        for preset in BloomPreset::ALL.into_iter().filter(|p| p.is_enabled()) {
            assert_eq!(
                stage_plan(preset),
                &[
                    BloomStage::Extract,
                    BloomStage::BlurHorizontal,
                    BloomStage::BlurVertical,
                    BloomStage::Combine
                ]
            );
        }
    }

    #[test]
    fn none_preset_is_a_single_copy() {
        assert_eq!(stage_plan(BloomPreset::None), &[BloomStage::Copy]);
        assert_eq!(BloomStage::Copy.inputs(), &[TargetRole::SceneColor]);
        assert_eq!(BloomStage::Copy.output(), TargetRole::BackBuffer);
    }

    #[test]
    fn no_stage_samples_its_own_output() {
        for preset in BloomPreset::ALL {
            for stage in stage_plan(preset) {
                assert!(!stage.inputs().contains(&stage.output()), "{stage:?}");
            }
        }
    }

    #[test]
    fn each_stage_reads_what_an_earlier_stage_wrote() {
        for preset in BloomPreset::ALL {
            let mut written = vec![TargetRole::SceneColor];
            for stage in stage_plan(preset) {
                for input in stage.inputs() {
                    assert!(written.contains(input), "{stage:?} reads unwritten {input:?}");
                }
                written.push(stage.output());
            }
            assert_eq!(written.last(), Some(&TargetRole::BackBuffer));
        }
    }

    #[test]
    fn none_preset_output_equals_scene_buffer() {
        use crate::renderer::gpu::headless_device;

        let Some((device, queue)) = headless_device() else {
            return;
        };
        // 32 texels of Rgba16Float fill one 256-byte row exactly
        let size = Size::new(32, 4);
        let bytes_per_row = size.width * 8;
        let targets = RenderTargetSet::new(&device, size);
        let samplers = Samplers::new(&device);

        let halves: [u16; 4] = [0x0000, 0x3800, 0x3c00, 0x3400];
        let scene: Vec<u8> = (0..size.width * size.height)
            .flat_map(|i| {
                let texel = [
                    halves[i as usize % 4],
                    halves[(i as usize + 1) % 4],
                    halves[(i as usize + 2) % 4],
                    0x3c00,
                ];
                bytemuck::cast::<[u16; 4], [u8; 8]>(texel)
            })
            .collect();
        queue.write_texture(
            targets.scene_color.texture.as_image_copy(),
            &scene,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: None,
            },
            size.into(),
        );

        let output = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pass-through Output"),
            size: size.into(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pass-through Readback"),
            size: (bytes_per_row * size.height) as _,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bloom = BloomRenderer::new(&device, HDR_TEXTURE_FORMAT, BloomPreset::None);
        let bindings = bloom.create_bindings(&device, &samplers, &targets, BloomPreset::None);

        let mut encoder = device.create_command_encoder(&Default::default());
        bloom.draw(&mut encoder, &bindings, &targets, &output_view, BloomPreset::None);
        encoder.copy_texture_to_buffer(
            output.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: None,
                },
            },
            size.into(),
        );
        queue.submit(Some(encoder.finish()));

        let (sender, receiver) = std::sync::mpsc::channel();
        readback
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| sender.send(result).unwrap());
        device.poll(wgpu::Maintain::Wait);
        receiver.recv().unwrap().unwrap();

        let copied = readback.slice(..).get_mapped_range().to_vec();
        assert_eq!(copied, scene);
    }
}
