// SPDX-License-Identifier: GPL-3.0-only

//! Compute kernels and the graph that runs them
//!
//! Every effect kernel is a WGSL compute shader with a 16x16 workgroup that
//! reads RGBA textures and writes one `rgba8unorm` storage texture. Kernels
//! receive the unaligned output size in their uniforms and skip invocations
//! past it, so the row-alignment padding never influences a result.

pub mod gpu_processor;
pub mod pipeline;

pub use gpu_processor::{compute_dispatch_size, pop_validation_scope, read_buffer_async};
pub use pipeline::{BindingKind, ComputeGraph, GraphPlan, Kernel, Resource, Slot};

/// Entry point shared by the single-pass kernels
pub const MAIN_ENTRY: &str = "main";

/// Separable gaussian blur, one axis per pass
pub const GAUSSIAN_BLUR_SHADER: &str = include_str!("gaussian_blur.wgsl");

/// Value-noise caustics with blend/add/original colour modes
pub const CAUSTICS_SHADER: &str = include_str!("caustics.wgsl");

/// Simplex-noise displacement with chromatic split
pub const FLUID_DISTORTION_SHADER: &str = include_str!("fluid_distortion.wgsl");

/// Procedural wave pattern that replaces the input
pub const COSMIC_WAVES_SHADER: &str = include_str!("cosmic_waves.wgsl");

/// Glow blur; entry points `blur_vertical` and `blur_horizontal`
pub const SPARKLE_BLUR_SHADER: &str = include_str!("sparkle_blur.wgsl");
pub const SPARKLE_VERTICAL_ENTRY: &str = "blur_vertical";
pub const SPARKLE_HORIZONTAL_ENTRY: &str = "blur_horizontal";

/// Outline boundary detection (pass 1)
pub const OUTLINE_BOUNDARY_SHADER: &str = include_str!("outline_boundary.wgsl");

/// Outline morphology and compositing (pass 2)
pub const OUTLINE_MORPHOLOGY_SHADER: &str = include_str!("outline_morphology.wgsl");

/// Rotated sine-wave displacement
pub const WAVE_DISTORTION_SHADER: &str = include_str!("wave_distortion.wgsl");

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse and validate a WGSL shader with naga, returning the module
    fn validate_shader(name: &str, source: &str) -> naga::Module {
        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => panic!("Shader '{}' parse failed: {:?}", name, e),
        };

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module);

        if let Err(e) = info {
            panic!("Shader '{}' validation failed: {:?}", name, e);
        }
        module
    }

    fn assert_entry_points(name: &str, module: &naga::Module, expected: &[&str]) {
        for entry in expected {
            let found = module.entry_points.iter().find(|ep| ep.name == *entry);
            let ep =
                found.unwrap_or_else(|| panic!("Shader '{}' has no entry point '{}'", name, entry));
            assert_eq!(ep.stage, naga::ShaderStage::Compute);
            assert_eq!(ep.workgroup_size, [16, 16, 1], "Shader '{}' workgroup size", name);
        }
    }

    #[test]
    fn test_gaussian_blur_shader_validates() {
        let module = validate_shader("gaussian_blur", GAUSSIAN_BLUR_SHADER);
        assert_entry_points("gaussian_blur", &module, &[MAIN_ENTRY]);
    }

    #[test]
    fn test_caustics_shader_validates() {
        let module = validate_shader("caustics", CAUSTICS_SHADER);
        assert_entry_points("caustics", &module, &[MAIN_ENTRY]);
    }

    #[test]
    fn test_fluid_distortion_shader_validates() {
        let module = validate_shader("fluid_distortion", FLUID_DISTORTION_SHADER);
        assert_entry_points("fluid_distortion", &module, &[MAIN_ENTRY]);
    }

    #[test]
    fn test_cosmic_waves_shader_validates() {
        let module = validate_shader("cosmic_waves", COSMIC_WAVES_SHADER);
        assert_entry_points("cosmic_waves", &module, &[MAIN_ENTRY]);
    }

    #[test]
    fn test_sparkle_blur_shader_validates() {
        let module = validate_shader("sparkle_blur", SPARKLE_BLUR_SHADER);
        assert_entry_points(
            "sparkle_blur",
            &module,
            &[SPARKLE_VERTICAL_ENTRY, SPARKLE_HORIZONTAL_ENTRY],
        );
    }

    #[test]
    fn test_outline_shaders_validate() {
        let boundary = validate_shader("outline_boundary", OUTLINE_BOUNDARY_SHADER);
        assert_entry_points("outline_boundary", &boundary, &[MAIN_ENTRY]);
        let morphology = validate_shader("outline_morphology", OUTLINE_MORPHOLOGY_SHADER);
        assert_entry_points("outline_morphology", &morphology, &[MAIN_ENTRY]);
    }

    #[test]
    fn test_wave_distortion_shader_validates() {
        let module = validate_shader("wave_distortion", WAVE_DISTORTION_SHADER);
        assert_entry_points("wave_distortion", &module, &[MAIN_ENTRY]);
    }
}
