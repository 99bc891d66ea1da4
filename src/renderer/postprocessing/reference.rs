//! CPU versions of the post-process shaders, for checking their math.

use glam::{Vec3, Vec4};

use super::{BloomParameters, BlurKernel};

pub fn extract(color: Vec4, parameters: &BloomParameters) -> Vec4 {
    let t = parameters.threshold;
    ((color - Vec4::splat(t)) / (1.0 - t)).clamp(Vec4::ZERO, Vec4::ONE)
}

pub fn adjust_saturation(color: Vec3, saturation: f32) -> Vec3 {
    let grey = color.dot(Vec3::new(0.3, 0.59, 0.11));
    Vec3::splat(grey).lerp(color, saturation)
}

pub fn combine(base: Vec3, bloom: Vec3, parameters: &BloomParameters) -> Vec3 {
    let bloom = adjust_saturation(bloom, parameters.bloom_saturation) * parameters.bloom_intensity;
    let base = adjust_saturation(base, parameters.base_saturation) * parameters.base_intensity;
    let base = base * (Vec3::ONE - bloom.clamp(Vec3::ZERO, Vec3::ONE));
    base + bloom
}

/// 1-D blur of `row` at integer texel `x`, with linear filtering and
/// clamp-to-edge addressing.
pub fn blur_row(row: &[f32], x: usize, kernel: &BlurKernel) -> f32 {
    let fetch = |position: f32| {
        let last = row.len() as f32 - 1.0;
        let position = position.clamp(0.0, last);
        let left = position.floor();
        let right = (left + 1.0).min(last);
        let fraction = position - left;
        row[left as usize] * (1.0 - fraction) + row[right as usize] * fraction
    };
    kernel
        .taps()
        .iter()
        .map(|tap| fetch(x as f32 + tap.offset) * tap.weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::postprocessing::BloomPreset;

    #[test]
    fn extract_suppresses_texels_below_threshold() {
        let parameters = BloomPreset::Subtle.parameters();
        let dim = extract(Vec4::splat(0.4), &parameters);
        assert_eq!(dim, Vec4::ZERO);
        let bright = extract(Vec4::splat(1.0), &parameters);
        assert_eq!(bright, Vec4::ONE);
        let middle = extract(Vec4::splat(0.75), &parameters);
        assert!((middle.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_threshold_extract_keeps_everything() {
        let parameters = BloomPreset::Soft.parameters();
        let color = Vec4::new(0.1, 0.5, 0.9, 1.0);
        assert_eq!(extract(color, &parameters), color);
    }

    #[test]
    fn combine_without_bloom_keeps_base() {
        let parameters = BloomPreset::Default.parameters();
        let base = Vec3::new(0.2, 0.4, 0.6);
        let out = combine(base, Vec3::ZERO, &parameters);
        assert!((out - base).length() < 1e-6);
    }

    #[test]
    fn zero_saturation_is_grey() {
        let grey = adjust_saturation(Vec3::new(1.0, 0.0, 0.0), 0.0);
        assert!((grey - Vec3::splat(0.3)).length() < 1e-6);
    }

    #[test]
    fn saturated_preset_greys_the_base() {
        let parameters = BloomPreset::Saturated.parameters();
        let out = combine(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, &parameters);
        assert!((out.x - out.y).abs() < 1e-6 && (out.y - out.z).abs() < 1e-6);
    }

    #[test]
    fn blur_preserves_flat_fields() {
        let row = vec![0.6; 64];
        for preset in BloomPreset::ALL {
            let kernel = BlurKernel::new(preset.parameters().blur_amount);
            let value = blur_row(&row, 32, &kernel);
            assert!((value - 0.6).abs() < 1e-5, "{preset}: {value}");
        }
    }

    #[test]
    fn blur_spreads_a_single_bright_texel() {
        let mut row = vec![0.0; 64];
        row[32] = 1.0;
        let kernel = BlurKernel::new(4.0);
        let centre = blur_row(&row, 32, &kernel);
        let neighbour = blur_row(&row, 34, &kernel);
        let far = blur_row(&row, 60, &kernel);
        assert!(centre < 1.0 && centre > neighbour);
        assert!(neighbour > 0.0);
        assert_eq!(far, 0.0);
    }
}
