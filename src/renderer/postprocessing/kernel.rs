use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

pub const TAP_COUNT: usize = 15;
const CENTER: usize = TAP_COUNT / 2;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BlurTap {
    /// Distance from the destination texel, in source texels.
    pub offset: f32,
    pub weight: f32,
}

/// 15-tap Gaussian, stored in spatial order from the most negative offset
/// to the most positive one.
///
/// Every tap except the centre sits between two texels so the bilinear
/// sampler averages a pair of them in one fetch. Weights are normalized to
/// sum to one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlurKernel {
    taps: [BlurTap; TAP_COUNT],
}

fn gaussian(n: f64, theta: f64) -> f64 {
    (1.0 / (2.0 * std::f64::consts::PI * theta).sqrt()) * (-(n * n) / (2.0 * theta * theta)).exp()
}

impl BlurKernel {
    pub fn new(blur_amount: f32) -> Self {
        let theta = f64::from(blur_amount.max(f32::EPSILON));

        let mut weights = [0.0f64; TAP_COUNT];
        let mut offsets = [0.0f64; TAP_COUNT];

        weights[CENTER] = gaussian(0.0, theta);
        for k in 1..=CENTER {
            let weight = gaussian(k as f64, theta);
            let offset = (k - 1) as f64 * 2.0 + 1.5;
            weights[CENTER + k] = weight;
            weights[CENTER - k] = weight;
            offsets[CENTER + k] = offset;
            offsets[CENTER - k] = -offset;
        }

        let total: f64 = weights.iter().sum();

        let mut taps = [BlurTap::default(); TAP_COUNT];
        for (tap, (weight, offset)) in taps.iter_mut().zip(weights.iter().zip(offsets)) {
            *tap = BlurTap {
                offset: offset as f32,
                weight: (weight / total) as f32,
            };
        }

        Self { taps }
    }

    pub fn taps(&self) -> &[BlurTap; TAP_COUNT] {
        &self.taps
    }
}

/// Axis a blur pass samples along.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    /// One texel step in UV space for a source of the given size.
    pub fn texel_step(self, width: u32, height: u32) -> Vec2 {
        match self {
            Self::Horizontal => Vec2::new(1.0 / width.max(1) as f32, 0.0),
            Self::Vertical => Vec2::new(0.0, 1.0 / height.max(1) as f32),
        }
    }
}

/// Blur constant buffer: per tap `xy` is the UV offset and `z` the weight.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BlurUniforms {
    pub samples: [Vec4; TAP_COUNT],
}

impl BlurUniforms {
    pub fn new(kernel: &BlurKernel, texel_step: Vec2) -> Self {
        let mut samples = [Vec4::ZERO; TAP_COUNT];
        for (sample, tap) in samples.iter_mut().zip(kernel.taps()) {
            let offset = texel_step * tap.offset;
            *sample = Vec4::new(offset.x, offset.y, tap.weight, 0.0);
        }
        Self { samples }
    }
}
