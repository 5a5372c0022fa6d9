// SPDX-License-Identifier: GPL-3.0-only

//! Separable gaussian blur
//!
//! Two dispatches of the same kernel, vertical into an intermediate texture
//! and then horizontal into the result. Colour is weighted by alpha so
//! transparent margins do not darken edges.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::Bitmap;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, ComputeGraph, GAUSSIAN_BLUR_SHADER, Kernel, MAIN_ENTRY, Resource, Slot,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

pub const EFFECT_ID: &str = "gaussian-blur-v1";

/// Kernel bindings: source, destination, sampler, params
const BINDINGS: [BindingKind; 4] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

/// Uniform block of `gaussian_blur.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    pub output_size: [i32; 2],
    pub direction: [i32; 2],
    pub dpi_scale: f32,
    pub radius: i32,
    pub strength: f32,
    pub _padding: f32,
}

impl BlurUniforms {
    pub const VERTICAL: [i32; 2] = [0, 1];
    pub const HORIZONTAL: [i32; 2] = [1, 0];

    pub fn new(bitmap: &Bitmap, params: &ParamBag, env: &RenderEnv, direction: [i32; 2]) -> Self {
        Self {
            output_size: [bitmap.width as i32, bitmap.height as i32],
            direction,
            dpi_scale: env.dpi_scale() as f32,
            radius: params.int("radius") as i32,
            strength: params.real("strength") as f32,
            _padding: 0.0,
        }
    }

    /// Standard deviation in pixels, matching the kernel
    pub fn sigma(&self) -> f32 {
        self.radius as f32 * self.dpi_scale * 0.33 * self.strength
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianBlur;

impl LiveEffect for GaussianBlur {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Gaussian Blur"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("radius", 10).range(0.0, 200.0),
            ParamSpec::real("strength", 1.0).range(0.0, 2.0),
        ])
    }

    fn scale_parameters(&self, params: &ParamBag, factor: f64) -> ParamBag {
        self.schema().scale(params, &["radius"], factor)
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        UiNode::col(vec![
            UiNode::labeled_slider(
                "Blur Radius (px)",
                "radius",
                DataType::Int,
                1.0,
                200.0,
                params.int("radius") as f64,
            ),
            UiNode::labeled_slider(
                "Blur Strength",
                "strength",
                DataType::Float,
                0.0,
                2.0,
                params.real("strength"),
            ),
        ])
    }

    fn padding(&self, params: &ParamBag, env: &RenderEnv) -> u32 {
        env.scaled_padding(params.int("radius") as f64)
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let kernel = Kernel::new(
            &gpu.device,
            "gaussian_blur",
            GAUSSIAN_BLUR_SHADER,
            MAIN_ENTRY,
            &BINDINGS,
        )?;
        Ok(Box::new(GaussianBlurRenderer { gpu, kernel }))
    }
}

struct GaussianBlurRenderer {
    gpu: Arc<GpuContext>,
    kernel: Kernel,
}

impl EffectRenderer for GaussianBlurRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = GaussianBlur.edit_parameters(params);
            let padded = input.pad(GaussianBlur.padding(&params, &env))?;

            let vertical = BlurUniforms::new(&padded, &params, &env, BlurUniforms::VERTICAL);
            let horizontal = BlurUniforms::new(&padded, &params, &env, BlurUniforms::HORIZONTAL);

            if vertical.sigma() <= 0.0 {
                debug!("Blur sigma is zero, returning input unchanged");
                return Ok(padded);
            }

            let mut graph = ComputeGraph::for_bitmap("gaussian_blur", &padded);
            let intermediate = graph.texture("vertical");
            let result = graph.texture("result");
            graph
                .pass(
                    &self.kernel,
                    vec![
                        Resource::Texture(Slot::SOURCE),
                        Resource::StorageTexture(intermediate),
                        Resource::Sampler,
                        Resource::uniform(&vertical),
                    ],
                )
                .pass(
                    &self.kernel,
                    vec![
                        Resource::Texture(intermediate),
                        Resource::StorageTexture(result),
                        Resource::Sampler,
                        Resource::uniform(&horizontal),
                    ],
                )
                .output(result);

            graph.run(&self.gpu, &padded).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 32);
    }

    #[test]
    fn test_edit_clamps_radius_and_strength() {
        let raw = ParamBag::new().with("radius", 500_i64).with("strength", -1.0);
        let edited = GaussianBlur.edit_parameters(&raw);
        assert_eq!(edited.int("radius"), 200);
        assert_eq!(edited.real("strength"), 0.0);
    }

    #[test]
    fn test_padding_follows_dpi() {
        let params = GaussianBlur.schema().defaults();
        assert_eq!(GaussianBlur.padding(&params, &RenderEnv::new(72.0, 72.0)), 10);
        assert_eq!(GaussianBlur.padding(&params, &RenderEnv::new(144.0, 72.0)), 20);
    }

    #[test]
    fn test_scale_rounds_radius() {
        let params = GaussianBlur.schema().defaults();
        let scaled = GaussianBlur.scale_parameters(&params, 1.26);
        assert_eq!(scaled.int("radius"), 13);
        assert_eq!(scaled.real("strength"), 1.0);
    }

    #[test]
    fn test_sigma() {
        let bitmap = Bitmap::new(4, 4);
        let params = GaussianBlur.schema().defaults().with("radius", 0_i64);
        let u = BlurUniforms::new(&bitmap, &params, &RenderEnv::default(), BlurUniforms::VERTICAL);
        assert_eq!(u.sigma(), 0.0);
    }
}
