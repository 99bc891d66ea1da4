use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{ensure, Context, Result};
use log::{error, info, warn};
use pollster::FutureExt as _;
use wgpu::SurfaceError;
use winit::window::Window;

use crate::{config::GpuConfig, window::Size};

/// Owns the wgpu objects bound to the window.
///
/// The device can be replaced in place after a loss; the instance and the
/// surface stay. Without a surface, frames render into a throwaway offscreen
/// texture of the configured format and size.
pub struct Gpu {
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'static>>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: Size,
    settings: GpuConfig,
    device_lost: Arc<AtomicBool>,
}

/// A single acquired back buffer plus the encoder recording into it.
pub struct GpuFrame {
    pub surface_texture: Option<wgpu::SurfaceTexture>,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering resumes next frame.
    Reconfigured,
    SkipFrame,
    /// The device has to be rebuilt along with every resource on it.
    DeviceLost,
    Fatal,
}

impl Gpu {
    pub async fn new(window: Arc<Window>, settings: &GpuConfig) -> Result<Self> {
        let size: Size = window.inner_size().into();
        ensure!(!size.is_empty(), "Window has zero size");

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("Failed to create surface")?;

        let device_lost = Arc::new(AtomicBool::new(false));
        let (adapter, device, queue) =
            request_device(&instance, Some(&surface), settings, &device_lost).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, settings.prefer_srgb)
            .context("There is no supported surface format")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: settings.present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            instance,
            surface: Some(surface),
            adapter,
            device,
            queue,
            config,
            size,
            settings: settings.clone(),
            device_lost,
        })
    }

    /// Surface-less device for GPU-backed tests. `None` on hosts without an
    /// adapter.
    #[cfg(test)]
    pub(crate) fn headless(size: Size) -> Option<Self> {
        let instance = wgpu::Instance::default();
        let settings = GpuConfig::default();
        let device_lost = Arc::new(AtomicBool::new(false));
        let (adapter, device, queue) = request_device(&instance, None, &settings, &device_lost)
            .block_on()
            .ok()?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width: size.width,
            height: size.height,
            present_mode: settings.present_mode,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Some(Self {
            instance,
            surface: None,
            adapter,
            device,
            queue,
            config,
            size,
            settings,
            device_lost,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Acquire)
    }

    /// Flags the device as lost without waiting for the driver.
    pub fn mark_device_lost(&self) {
        self.device_lost.store(true, Ordering::Release);
    }

    /// Replaces adapter, device and queue and reconfigures the surface.
    ///
    /// Every resource created on the old device is invalid afterwards.
    pub fn recreate_device(&mut self) -> Result<()> {
        let device_lost = Arc::new(AtomicBool::new(false));
        let (adapter, device, queue) =
            request_device(&self.instance, self.surface.as_ref(), &self.settings, &device_lost)
                .block_on()?;

        if let Some(surface) = &self.surface {
            let surface_caps = surface.get_capabilities(&adapter);
            if !surface_caps.formats.contains(&self.config.format) {
                self.config.format = choose_surface_format(&surface_caps, self.settings.prefer_srgb)
                    .context("There is no supported surface format")?;
            }
        }

        self.adapter = adapter;
        self.device = device;
        self.queue = queue;
        self.device_lost = device_lost;
        self.configure_surface();
        Ok(())
    }

    fn configure_surface(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigures the surface. Returns false when nothing changed or the
    /// new size is empty, in which case the old configuration is kept.
    pub fn resize(&mut self, size: Size) -> bool {
        if size.is_empty() || size == self.size {
            return false;
        }
        self.size = size;
        self.config.width = size.width;
        self.config.height = size.height;
        self.configure_surface();
        true
    }

    pub fn begin_frame(&self) -> Result<GpuFrame, SurfaceError> {
        let (surface_texture, view) = match &self.surface {
            Some(surface) => {
                let surface_texture = surface.get_current_texture()?;
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (Some(surface_texture), view)
            }
            None => (None, self.offscreen_view()),
        };

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Command Encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands and presents it.
    pub fn present(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(Some(encoder.finish()));
        drop(view);
        if let Some(surface_texture) = surface_texture {
            surface_texture.present();
        }
    }

    fn offscreen_view(&self) -> wgpu::TextureView {
        self.device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Offscreen Frame Texture"),
                size: self.size.into(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn handle_surface_error(&mut self, err: &SurfaceError) -> SurfaceErrorAction {
        let action = surface_error_action(err);
        if action == SurfaceErrorAction::Reconfigured && !self.size.is_empty() {
            self.configure_surface();
        }
        action
    }
}

fn surface_error_action(err: &SurfaceError) -> SurfaceErrorAction {
    match err {
        SurfaceError::Lost => {
            warn!("Surface lost");
            SurfaceErrorAction::DeviceLost
        }
        SurfaceError::Outdated => {
            info!("Surface outdated, reconfiguring");
            SurfaceErrorAction::Reconfigured
        }
        SurfaceError::Timeout => {
            warn!("Timed out acquiring the next frame, skipping it");
            SurfaceErrorAction::SkipFrame
        }
        SurfaceError::OutOfMemory => {
            error!("Out of memory acquiring the next frame");
            SurfaceErrorAction::Fatal
        }
    }
}

async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
    settings: &GpuConfig,
    device_lost: &Arc<AtomicBool>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: settings.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .context("No adapter found")?;

    let info = adapter.get_info();
    info!("Using adapter {} ({:?})", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Solar Bloom Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )
        .await
        .context("No device found")?;

    watch_device(&device, device_lost);

    Ok((adapter, device, queue))
}

/// Routes driver-side loss and uncaptured errors into the log and the
/// shared lost flag instead of panicking.
fn watch_device(device: &wgpu::Device, device_lost: &Arc<AtomicBool>) {
    let flag = Arc::clone(device_lost);
    device.set_device_lost_callback(move |reason, message| {
        warn!("Device lost ({reason:?}): {message}");
        flag.store(true, Ordering::Release);
    });
    device.on_uncaptured_error(Box::new(|err| {
        error!("Uncaptured wgpu error: {err}");
    }));
}

fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        let preferred = caps.formats.iter().copied().find(|format| format.is_srgb());
        if preferred.is_some() {
            return preferred;
        }
    }
    caps.formats.first().copied()
}

/// Device without a surface for GPU-backed tests. `None` on hosts without
/// an adapter.
#[cfg(test)]
pub(crate) fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    Gpu::headless(Size::new(1, 1)).map(|gpu| (gpu.device, gpu.queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_format_is_preferred() {
        let caps = wgpu::SurfaceCapabilities {
            formats: vec![
                wgpu::TextureFormat::Bgra8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
            ],
            ..Default::default()
        };
        assert_eq!(
            choose_surface_format(&caps, true),
            Some(wgpu::TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(
            choose_surface_format(&caps, false),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn no_formats_means_no_surface() {
        let caps = wgpu::SurfaceCapabilities::default();
        assert_eq!(choose_surface_format(&caps, true), None);
    }

    #[test]
    fn surface_errors_map_to_actions() {
        use SurfaceErrorAction::*;
        assert_eq!(surface_error_action(&SurfaceError::Lost), DeviceLost);
        assert_eq!(surface_error_action(&SurfaceError::Outdated), Reconfigured);
        assert_eq!(surface_error_action(&SurfaceError::Timeout), SkipFrame);
        assert_eq!(surface_error_action(&SurfaceError::OutOfMemory), Fatal);
    }

    #[test]
    fn headless_frames_render_offscreen() {
        let Some(mut gpu) = Gpu::headless(Size::new(64, 32)) else {
            return;
        };
        let frame = gpu.begin_frame().unwrap();
        assert!(frame.surface_texture.is_none());
        gpu.present(frame);

        assert!(gpu.resize(Size::new(32, 16)));
        assert_eq!(gpu.handle_surface_error(&SurfaceError::Outdated), SurfaceErrorAction::Reconfigured);
        let frame = gpu.begin_frame().unwrap();
        gpu.present(frame);
    }
}
