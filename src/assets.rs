use std::{
    f32::consts::{PI, TAU},
    path::PathBuf,
};

use anyhow::{ensure, Context, Result};
use glam::{vec2, vec3, Vec3, Vec4};
use log::{debug, info};
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::{
    renderer::mesh::Vertex,
    scene::{MeshId, TextureId},
};

/// Tightly packed RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        ensure!(width > 0 && height > 0, "Texture must not be empty");
        ensure!(
            rgba.len() == (width * height * 4) as usize,
            "Expected {} bytes for {}x{} RGBA, got {}",
            width * height * 4,
            width,
            height,
            rgba.len()
        );
        Ok(Self {
            width,
            height,
            rgba,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Supplies geometry and textures by logical name. Failures are fatal to
/// resource creation.
pub trait AssetSource {
    fn texture(&self, id: TextureId) -> Result<TextureData>;
    fn mesh(&self, id: MeshId) -> Result<MeshData>;
}

/// Deterministic built-in content. The same seed always yields the same
/// bytes, so a rebuilt resource pool matches the one it replaces.
#[derive(Debug, Clone)]
pub struct ProceduralAssets {
    seed: u64,
}

pub const DEFAULT_SEED: u64 = 0x5eed_b100;

impl Default for ProceduralAssets {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl ProceduralAssets {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, salt: u64) -> Pcg64Mcg {
        Pcg64Mcg::seed_from_u64(self.seed ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }
}

const TEXTURE_WIDTH: u32 = 256;
const TEXTURE_HEIGHT: u32 = 128;

impl AssetSource for ProceduralAssets {
    fn texture(&self, id: TextureId) -> Result<TextureData> {
        let (base, accent, bands) = match id {
            TextureId::Sun => (vec3(1.0, 0.78, 0.2), vec3(1.0, 0.35, 0.05), 3.0),
            TextureId::Planet => (vec3(0.15, 0.35, 0.8), vec3(0.2, 0.6, 0.25), 7.0),
            TextureId::Asteroid => (vec3(0.45, 0.42, 0.4), vec3(0.25, 0.23, 0.22), 11.0),
        };
        let mut rng = self.rng_for(id as u64 + 1);

        let mut rgba = Vec::with_capacity((TEXTURE_WIDTH * TEXTURE_HEIGHT * 4) as usize);
        for y in 0..TEXTURE_HEIGHT {
            let v = y as f32 / TEXTURE_HEIGHT as f32;
            let band = ((v * bands * PI).sin() * 0.5 + 0.5).powf(2.0);
            for _ in 0..TEXTURE_WIDTH {
                let grain: f32 = rng.gen_range(-0.08..0.08);
                let color = base.lerp(accent, band) + Vec3::splat(grain);
                let color = color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
                rgba.extend_from_slice(&[color.x as u8, color.y as u8, color.z as u8, 255]);
            }
        }

        TextureData::new(TEXTURE_WIDTH, TEXTURE_HEIGHT, rgba)
    }

    fn mesh(&self, id: MeshId) -> Result<MeshData> {
        Ok(match id {
            MeshId::Sphere => sphere(1.0, 16),
            MeshId::Ship => ship_hull(),
        })
    }
}

/// Reads `<dir>/<name>.png` textures; meshes stay procedural.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    dir: PathBuf,
    meshes: ProceduralAssets,
}

impl DirectoryAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            meshes: ProceduralAssets::default(),
        }
    }
}

impl AssetSource for DirectoryAssets {
    fn texture(&self, id: TextureId) -> Result<TextureData> {
        let path = self.dir.join(id.file_name());
        debug!("Loading texture {path:?}");
        let image = image::ImageReader::open(&path)
            .with_context(|| format!("Failed to open texture {path:?}"))?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("Failed to decode texture {path:?}"))?
            .to_rgba8();
        info!("Loaded texture {path:?} ({}x{})", image.width(), image.height());
        TextureData::new(image.width(), image.height(), image.into_raw())
    }

    fn mesh(&self, id: MeshId) -> Result<MeshData> {
        self.meshes.mesh(id)
    }
}

/// UV sphere of the given diameter.
pub fn sphere(diameter: f32, tessellation: u32) -> MeshData {
    let stacks = tessellation.max(3) / 2;
    let slices = tessellation.max(3);
    let radius = diameter * 0.5;

    let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
    for stack in 0..=stacks {
        let v = stack as f32 / stacks as f32;
        let (sin_lat, cos_lat) = (v * PI - PI * 0.5).sin_cos();
        for slice in 0..=slices {
            let u = slice as f32 / slices as f32;
            let (sin_lon, cos_lon) = (u * TAU).sin_cos();
            let normal = vec3(cos_lat * cos_lon, sin_lat, cos_lat * sin_lon);
            vertices.push(Vertex {
                position: normal * radius,
                normal,
                uv: vec2(u, 1.0 - v),
                color: Vec4::ONE,
            });
        }
    }

    let stride = slices + 1;
    let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);
    for stack in 0..stacks {
        for slice in 0..slices {
            let a = stack * stride + slice;
            let b = a + stride;
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }

    MeshData { vertices, indices }
}

/// Flat-shaded dart in model units of roughly two thousand.
pub fn ship_hull() -> MeshData {
    let nose = vec3(0.0, 0.0, 1200.0);
    let tail = vec3(0.0, 0.0, -800.0);
    let left = vec3(-900.0, 0.0, -700.0);
    let right = vec3(900.0, 0.0, -700.0);
    let top = vec3(0.0, 250.0, -500.0);
    let bottom = vec3(0.0, -150.0, -500.0);

    let hull = vec3(0.7, 0.72, 0.78).extend(1.0);
    let trim = vec3(0.85, 0.2, 0.15).extend(1.0);
    let engine = vec3(0.3, 0.8, 1.0).extend(1.0);

    let faces = [
        ([nose, left, top], hull),
        ([nose, top, right], hull),
        ([nose, bottom, left], trim),
        ([nose, right, bottom], trim),
        ([tail, top, left], hull),
        ([tail, right, top], hull),
        ([tail, left, bottom], engine),
        ([tail, bottom, right], engine),
    ];

    let mut vertices = Vec::with_capacity(faces.len() * 3);
    for (corners, color) in faces {
        let normal = (corners[1] - corners[0])
            .cross(corners[2] - corners[0])
            .normalize_or_zero();
        for position in corners {
            vertices.push(Vertex {
                position,
                normal,
                uv: vec2(0.0, 0.0),
                color,
            });
        }
    }
    let indices = (0..vertices.len() as u32).collect();

    MeshData { vertices, indices }
}
