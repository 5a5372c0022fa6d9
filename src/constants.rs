// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use serde::{Deserialize, Serialize};

/// Row stride alignment (in bytes) required for texture ↔ buffer copies.
///
/// Mirrors `wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`; kept as a plain constant so the
/// host-side padding helpers do not depend on the GPU crate.
pub const ROW_ALIGNMENT_BYTES: u32 = 256;

/// Interleaved RGBA, 8 bits per channel
pub const BYTES_PER_PIXEL: u32 = 4;

/// Largest bitmap edge accepted by the padding helpers
pub const MAX_BITMAP_DIMENSION: u32 = 32768;

/// Compute workgroup edge length; every kernel declares `@workgroup_size(16, 16)`
pub const WORKGROUP_SIZE: u32 = 16;

/// Reference resolution that effect parameters are authored against
pub const DEFAULT_BASE_DPI: f64 = 72.0;

/// Texture format used for every effect texture
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Texture filtering mode for a compute graph's shared sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplerMode {
    /// Bilinear filtering, clamp to edge (default for most effects)
    #[default]
    LinearClamp,
    /// Bilinear filtering, wrap around (fluid distortion)
    LinearRepeat,
    /// Point sampling, clamp to edge (outline boundary detection)
    NearestClamp,
}

impl SamplerMode {
    /// Get all sampler modes
    pub const ALL: [SamplerMode; 3] = [
        SamplerMode::LinearClamp,
        SamplerMode::LinearRepeat,
        SamplerMode::NearestClamp,
    ];

    pub fn filter_mode(&self) -> wgpu::FilterMode {
        match self {
            SamplerMode::LinearClamp | SamplerMode::LinearRepeat => wgpu::FilterMode::Linear,
            SamplerMode::NearestClamp => wgpu::FilterMode::Nearest,
        }
    }

    pub fn address_mode(&self) -> wgpu::AddressMode {
        match self {
            SamplerMode::LinearRepeat => wgpu::AddressMode::Repeat,
            SamplerMode::LinearClamp | SamplerMode::NearestClamp => wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the crate version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_alignment_matches_wgpu() {
        assert_eq!(ROW_ALIGNMENT_BYTES, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
    }

    #[test]
    fn test_sampler_modes() {
        assert_eq!(
            SamplerMode::LinearRepeat.address_mode(),
            wgpu::AddressMode::Repeat
        );
        assert_eq!(
            SamplerMode::NearestClamp.filter_mode(),
            wgpu::FilterMode::Nearest
        );
        for mode in SamplerMode::ALL {
            if mode != SamplerMode::LinearRepeat {
                assert_eq!(mode.address_mode(), wgpu::AddressMode::ClampToEdge);
            }
        }
    }
}
