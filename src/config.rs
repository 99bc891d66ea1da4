use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::{
    assets, logging::LoggingConfig, renderer::postprocessing::BloomPreset, window::Size,
};

#[derive(Debug, Clone)]
pub struct GpuConfig {
    pub present_mode: wgpu::PresentMode,
    pub power_preference: wgpu::PowerPreference,
    pub prefer_srgb: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            present_mode: wgpu::PresentMode::AutoVsync,
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub title: String,
    pub size: Size,
    pub bloom_preset: BloomPreset,
    /// Texture directory. `None` selects the built-in procedural assets.
    pub asset_dir: Option<PathBuf>,
    /// Seed for the procedural assets.
    pub asset_seed: u64,
    pub gpu: GpuConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Solar Bloom".to_owned(),
            size: Size::new(1600, 900),
            bloom_preset: BloomPreset::Default,
            asset_dir: None,
            asset_seed: assets::DEFAULT_SEED,
            gpu: GpuConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("SOLAR_BLOOM_SIZE") {
            config.size = parse_size(&value).context("Invalid SOLAR_BLOOM_SIZE")?;
        }
        if let Some(value) = lookup("SOLAR_BLOOM_PRESET") {
            config.bloom_preset = value.parse().context("Invalid SOLAR_BLOOM_PRESET")?;
        }
        if let Some(value) = lookup("SOLAR_BLOOM_ASSETS") {
            config.asset_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("SOLAR_BLOOM_SEED") {
            config.asset_seed = parse_seed(&value).context("Invalid SOLAR_BLOOM_SEED")?;
        }
        if let Some(value) = lookup("SOLAR_BLOOM_VSYNC") {
            config.gpu.present_mode = match value.trim() {
                "1" | "true" | "on" => wgpu::PresentMode::AutoVsync,
                "0" | "false" | "off" => wgpu::PresentMode::AutoNoVsync,
                other => bail!("Invalid SOLAR_BLOOM_VSYNC {:?}", other),
            };
        }

        Ok(config)
    }
}

fn parse_size(value: &str) -> Result<Size> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .context("Expected <width>x<height>")?;
    let size = Size::new(
        width.trim().parse().context("Bad width")?,
        height.trim().parse().context("Bad height")?,
    );
    if size.is_empty() {
        bail!("Size must be non-zero, got {}x{}", size.width, size.height);
    }
    Ok(size)
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_seed(value: &str) -> Result<u64> {
    let value = value.trim();
    let seed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16)?,
        None => value.parse()?,
    };
    Ok(seed)
}
