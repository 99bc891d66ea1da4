use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use bytemuck::{Pod, Zeroable};

/// Coefficients shared by the extract and combine shaders.
///
/// Uploaded verbatim as a uniform buffer, so the layout is padded out to a
/// multiple of 16 bytes.
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct BloomParameters {
    pub threshold: f32,
    pub blur_amount: f32,
    pub bloom_intensity: f32,
    pub base_intensity: f32,
    pub bloom_saturation: f32,
    pub base_saturation: f32,
    _pad: [f32; 2],
}

impl BloomParameters {
    pub const fn new(
        threshold: f32,
        blur_amount: f32,
        bloom_intensity: f32,
        base_intensity: f32,
        bloom_saturation: f32,
        base_saturation: f32,
    ) -> Self {
        Self {
            threshold,
            blur_amount,
            bloom_intensity,
            base_intensity,
            bloom_saturation,
            base_saturation,
            _pad: [0.0; 2],
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BloomPreset {
    #[default]
    Default,
    Soft,
    Desaturated,
    Saturated,
    Blurry,
    Subtle,
    None,
}

impl BloomPreset {
    pub const ALL: [BloomPreset; 7] = [
        Self::Default,
        Self::Soft,
        Self::Desaturated,
        Self::Saturated,
        Self::Blurry,
        Self::Subtle,
        Self::None,
    ];

    #[rustfmt::skip]
    pub fn parameters(self) -> BloomParameters {
        //                                  thresh blur  bloom  base  bloom_sat base_sat
        match self {
            Self::Default     => BloomParameters::new(0.25, 4.0, 1.25, 1.0, 1.0, 1.0),
            Self::Soft        => BloomParameters::new(0.0,  3.0, 1.0,  1.0, 1.0, 1.0),
            Self::Desaturated => BloomParameters::new(0.5,  8.0, 2.0,  1.0, 0.0, 1.0),
            Self::Saturated   => BloomParameters::new(0.25, 4.0, 2.0,  1.0, 2.0, 0.0),
            Self::Blurry      => BloomParameters::new(0.0,  2.0, 1.0,  0.1, 1.0, 1.0),
            Self::Subtle      => BloomParameters::new(0.5,  2.0, 1.0,  1.0, 1.0, 1.0),
            Self::None        => BloomParameters::new(0.25, 4.0, 1.25, 1.0, 1.0, 1.0),
        }
    }

    /// Whether the extract/blur/combine stages run at all.
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Soft => "soft",
            Self::Desaturated => "desaturated",
            Self::Saturated => "saturated",
            Self::Blurry => "blurry",
            Self::Subtle => "subtle",
            Self::None => "none",
        }
    }
}

impl fmt::Display for BloomPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BloomPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| anyhow!("Unknown bloom preset {:?}", s))
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;

    #[test]
    fn parameters_fill_whole_uniform_slots() {
        assert_eq!(size_of::<BloomParameters>() % 16, 0);
    }

    #[test]
    fn cycling_visits_every_preset_once() {
        let mut preset = BloomPreset::Default;
        let mut seen = Vec::new();
        for _ in 0..BloomPreset::ALL.len() {
            seen.push(preset);
            preset = preset.next();
        }
        assert_eq!(preset, BloomPreset::Default);
        assert_eq!(seen, BloomPreset::ALL.to_vec());
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Blurry".parse::<BloomPreset>().unwrap(), BloomPreset::Blurry);
        assert_eq!(" none ".parse::<BloomPreset>().unwrap(), BloomPreset::None);
        assert!("glowy".parse::<BloomPreset>().is_err());
    }

    #[test]
    fn only_none_bypasses_the_pipeline() {
        for preset in BloomPreset::ALL {
            assert_eq!(preset.is_enabled(), preset != BloomPreset::None);
        }
    }

    #[test]
    fn thresholds_leave_headroom_for_the_extract_scale() {
        for preset in BloomPreset::ALL {
            assert!(preset.parameters().threshold < 1.0);
        }
    }
}
