// SPDX-License-Identifier: GPL-3.0-only

//! Fluid distortion
//!
//! Displaces pixels along a 3D simplex noise field and splits red and blue
//! along the displacement for a chromatic fringe. Sampling wraps around, so
//! the margin is generous to keep wrapped content out of view.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::{Bitmap, padding_pixels};
use crate::constants::SamplerMode;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, ComputeGraph, FLUID_DISTORTION_SHADER, Kernel, MAIN_ENTRY, Resource, Slot,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

pub const EFFECT_ID: &str = "fluid-distortion-v1";

/// `timeSeed` wraps at this value
const TIME_SEED_PERIOD: f64 = 1000.0;

const BINDINGS: [BindingKind; 4] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

/// Uniform block of `fluid_distortion.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FluidUniforms {
    pub output_size: [i32; 2],
    pub noise_scale: f32,
    pub time: f32,
    pub turbulence: f32,
    pub distortion: f32,
    pub chromatic_shift: f32,
    pub _padding: f32,
}

impl FluidUniforms {
    pub fn new(bitmap: &Bitmap, params: &ParamBag, env: &RenderEnv) -> Self {
        let turbulence = params.real("turbulence");
        let intensity = params.real("intensity");
        // base_dpi / dpi: finer rasters get a proportionally smaller fringe
        let ratio = 1.0 / env.dpi_scale();

        Self {
            output_size: [bitmap.width as i32, bitmap.height as i32],
            noise_scale: params.real("scale") as f32,
            time: (params.real("timeSeed") * params.real("speed")) as f32,
            turbulence: turbulence as f32,
            distortion: (intensity / 1000.0 * (1.0 + turbulence * 0.5)) as f32,
            chromatic_shift: (params.real("colorShift")
                * ratio
                * 0.01
                * (1.0 + turbulence * 0.3)
                * ratio) as f32,
            _padding: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FluidDistortion;

impl LiveEffect for FluidDistortion {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Fluid Distortion"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::real("intensity", 20.0).min(0.0),
            ParamSpec::real("speed", 0.5).min(0.0),
            ParamSpec::real("scale", 3.0).min(0.1),
            ParamSpec::real("turbulence", 0.3).min(0.0),
            ParamSpec::real("colorShift", 0.1).min(0.0),
            ParamSpec::real("timeSeed", 0.0),
        ])
    }

    fn edit_parameters(&self, params: &ParamBag) -> ParamBag {
        let mut edited = self.schema().normalize(params);
        let seed = edited.real("timeSeed") % TIME_SEED_PERIOD;
        edited.set("timeSeed", seed);
        edited
    }

    fn scale_parameters(&self, params: &ParamBag, factor: f64) -> ParamBag {
        self.schema().scale(params, &["intensity", "scale"], factor)
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        UiNode::col(vec![
            UiNode::labeled_slider(
                "Intensity",
                "intensity",
                DataType::Float,
                0.0,
                100.0,
                params.real("intensity"),
            ),
            UiNode::labeled_slider(
                "Speed",
                "speed",
                DataType::Float,
                0.0,
                5.0,
                params.real("speed"),
            ),
            UiNode::labeled_slider(
                "Scale",
                "scale",
                DataType::Float,
                0.1,
                20.0,
                params.real("scale"),
            ),
            UiNode::labeled_slider(
                "Turbulence",
                "turbulence",
                DataType::Float,
                0.0,
                2.0,
                params.real("turbulence"),
            ),
            UiNode::labeled_slider(
                "Color Shift",
                "colorShift",
                DataType::Float,
                0.0,
                2.0,
                params.real("colorShift"),
            ),
            UiNode::labeled_slider(
                "Time Seed",
                "timeSeed",
                DataType::Float,
                0.0,
                1000.0,
                params.real("timeSeed"),
            ),
        ])
    }

    fn padding(&self, params: &ParamBag, env: &RenderEnv) -> u32 {
        let intensity = params.real("intensity");
        let intensity_factor = intensity / 10.0;
        let scale_factor = 5.0 / params.real("scale").max(0.5);
        let turbulence_factor = params.real("turbulence") * 1.5;
        let color_shift_factor = params.real("colorShift") * 2.0;

        let reach = 200.0
            + intensity_factor * scale_factor * (1.0 + turbulence_factor)
            + color_shift_factor * intensity / 20.0;

        let minimum = padding_pixels(5.0 * env.dpi_scale());
        let padding = minimum.max(env.scaled_padding(reach));
        debug!(padding, dpi = env.dpi, "Fluid distortion padding");
        padding
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let kernel = Kernel::new(
            &gpu.device,
            "fluid_distortion",
            FLUID_DISTORTION_SHADER,
            MAIN_ENTRY,
            &BINDINGS,
        )?;
        Ok(Box::new(FluidDistortionRenderer { gpu, kernel }))
    }
}

struct FluidDistortionRenderer {
    gpu: Arc<GpuContext>,
    kernel: Kernel,
}

impl EffectRenderer for FluidDistortionRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = FluidDistortion.edit_parameters(params);
            let padded = input.pad(FluidDistortion.padding(&params, &env))?;
            let uniforms = FluidUniforms::new(&padded, &params, &env);

            let mut graph = ComputeGraph::for_bitmap("fluid_distortion", &padded);
            let result = graph.texture("result");
            graph
                .sampler(SamplerMode::LinearRepeat)
                .pass(
                    &self.kernel,
                    vec![
                        Resource::Texture(Slot::SOURCE),
                        Resource::StorageTexture(result),
                        Resource::Sampler,
                        Resource::uniform(&uniforms),
                    ],
                )
                .output(result);

            graph.run(&self.gpu, &padded).await
        })
    }
}
