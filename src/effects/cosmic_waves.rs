// SPDX-License-Identifier: GPL-3.0-only

//! Cosmic waves generator
//!
//! Replaces the input with an interference pattern; only the canvas size of
//! the input is used.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::Bitmap;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, COSMIC_WAVES_SHADER, ComputeGraph, Kernel, MAIN_ENTRY, Resource, Slot,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;

pub const EFFECT_ID: &str = "cosmic-waves-shader-v1";

const BINDINGS: [BindingKind; 3] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Uniform,
];

/// Uniform block of `cosmic_waves.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CosmicWavesUniforms {
    pub output_size: [i32; 2],
    pub time_offset: f32,
    pub seed: f32,
    pub wave_count: i32,
    pub color_intensity: f32,
    pub color_shift: f32,
    pub _padding: f32,
}

impl CosmicWavesUniforms {
    pub fn new(bitmap: &Bitmap, params: &ParamBag) -> Self {
        Self {
            output_size: [bitmap.width as i32, bitmap.height as i32],
            time_offset: params.real("timeOffset") as f32,
            seed: params.real("seed") as f32,
            wave_count: params.int("waveCount") as i32,
            color_intensity: params.real("colorIntensity") as f32,
            color_shift: params.real("colorShift") as f32,
            _padding: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CosmicWaves;

impl LiveEffect for CosmicWaves {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Cosmic Waves"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::real("timeOffset", 0.0).range(0.0, 100.0),
            ParamSpec::real("seed", 12.34).range(0.0, 1000.0),
            ParamSpec::int("waveCount", 8).range(1.0, 20.0),
            ParamSpec::real("colorIntensity", 0.6).range(0.0, 1.0),
            ParamSpec::real("colorShift", 0.5).range(0.0, 1.0),
        ])
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        UiNode::col(vec![
            UiNode::labeled_slider(
                "Time Offset",
                "timeOffset",
                DataType::Float,
                0.0,
                100.0,
                params.real("timeOffset"),
            ),
            UiNode::labeled_slider(
                "Seed",
                "seed",
                DataType::Float,
                0.0,
                1000.0,
                params.real("seed"),
            ),
            UiNode::labeled_slider(
                "Wave Count",
                "waveCount",
                DataType::Int,
                1.0,
                20.0,
                params.int("waveCount") as f64,
            ),
            UiNode::labeled_slider(
                "Color Intensity",
                "colorIntensity",
                DataType::Float,
                0.0,
                1.0,
                params.real("colorIntensity"),
            ),
            UiNode::labeled_slider(
                "Color Shift",
                "colorShift",
                DataType::Float,
                0.0,
                1.0,
                params.real("colorShift"),
            ),
        ])
    }

    fn padding(&self, _params: &ParamBag, _env: &RenderEnv) -> u32 {
        0
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let kernel = Kernel::new(
            &gpu.device,
            "cosmic_waves",
            COSMIC_WAVES_SHADER,
            MAIN_ENTRY,
            &BINDINGS,
        )?;
        Ok(Box::new(CosmicWavesRenderer { gpu, kernel }))
    }
}

struct CosmicWavesRenderer {
    gpu: Arc<GpuContext>,
    kernel: Kernel,
}

impl EffectRenderer for CosmicWavesRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        _env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = CosmicWaves.edit_parameters(params);
            let uniforms = CosmicWavesUniforms::new(&input, &params);

            let mut graph = ComputeGraph::for_bitmap("cosmic_waves", &input);
            let result = graph.texture("result");
            graph
                .pass(
                    &self.kernel,
                    vec![
                        Resource::Texture(Slot::SOURCE),
                        Resource::StorageTexture(result),
                        Resource::uniform(&uniforms),
                    ],
                )
                .output(result);

            graph.run(&self.gpu, &input).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<CosmicWavesUniforms>(), 32);
    }

    #[test]
    fn test_edit_clamps_every_field() {
        let raw = ParamBag::new()
            .with("timeOffset", 500.0)
            .with("seed", -3.0)
            .with("waveCount", 0_i64)
            .with("colorIntensity", 2.0)
            .with("colorShift", -1.0);
        let edited = CosmicWaves.edit_parameters(&raw);
        assert_eq!(edited.real("timeOffset"), 100.0);
        assert_eq!(edited.real("seed"), 0.0);
        assert_eq!(edited.int("waveCount"), 1);
        assert_eq!(edited.real("colorIntensity"), 1.0);
        assert_eq!(edited.real("colorShift"), 0.0);
    }

    #[test]
    fn test_scale_leaves_params_unchanged() {
        let params = CosmicWaves.schema().defaults();
        assert_eq!(CosmicWaves.scale_parameters(&params, 3.0), params);
    }

    #[test]
    fn test_wave_count_interpolates_to_integers() {
        let a = CosmicWaves.schema().defaults().with("waveCount", 2_i64);
        let b = CosmicWaves.schema().defaults().with("waveCount", 5_i64);
        let mid = CosmicWaves.interpolate(&a, &b, 0.5);
        // 3.5 rounds away from zero
        assert_eq!(mid.int("waveCount"), 4);
    }
}
