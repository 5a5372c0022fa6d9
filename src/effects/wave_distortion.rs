// SPDX-License-Identifier: GPL-3.0-only

//! Wave distortion
//!
//! Offsets pixels with a sine wave travelling along `angleValue`. The cross
//! wave adds the same displacement perpendicular to it.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::Bitmap;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, ComputeGraph, Kernel, MAIN_ENTRY, Resource, Slot, WAVE_DISTORTION_SHADER,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;

pub const EFFECT_ID: &str = "wave-distortion-v1";

const BINDINGS: [BindingKind; 4] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

/// Angle presets offered as buttons: (id, label, degrees)
const ANGLE_PRESETS: [(&str, &str, f64); 3] = [
    ("horizontal", "Horizontal", 0.0),
    ("vertical", "Vertical", 90.0),
    ("diagonal", "Diagonal", 45.0),
];

/// Uniform block of `wave_distortion.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct WaveUniforms {
    pub output_size: [f32; 2],
    pub dpi_scale: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub angle_rad: f32,
    pub cross_wave: f32,
    pub time: f32,
}

impl WaveUniforms {
    pub fn new(bitmap: &Bitmap, params: &ParamBag, env: &RenderEnv) -> Self {
        Self {
            output_size: [bitmap.width as f32, bitmap.height as f32],
            dpi_scale: env.dpi_scale() as f32,
            amplitude: params.real("amplitude") as f32,
            frequency: params.real("frequency") as f32,
            angle_rad: params.real("angleValue").to_radians() as f32,
            cross_wave: if params.flag("crossWave") { 1.0 } else { 0.0 },
            time: params.real("time") as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WaveDistortion;

impl LiveEffect for WaveDistortion {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Wave Distortion"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::real("amplitude", 50.0).min(0.0),
            ParamSpec::real("frequency", 5.0),
            ParamSpec::real("angleValue", 0.0),
            ParamSpec::bool("crossWave", false),
            ParamSpec::real("time", 0.0),
        ])
    }

    fn scale_parameters(&self, params: &ParamBag, factor: f64) -> ParamBag {
        self.schema().scale(params, &["amplitude"], factor)
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        let presets = ANGLE_PRESETS
            .iter()
            .map(|(id, label, degrees)| {
                UiNode::button(id, label, ParamBag::new().with("angleValue", *degrees))
            })
            .collect();

        UiNode::col(vec![
            UiNode::labeled_slider(
                "Amplitude",
                "amplitude",
                DataType::Float,
                0.0,
                300.0,
                params.real("amplitude"),
            ),
            UiNode::labeled_slider(
                "Frequency",
                "frequency",
                DataType::Float,
                0.1,
                100.0,
                params.real("frequency"),
            ),
            UiNode::labeled_slider(
                "Angle",
                "angleValue",
                DataType::Float,
                0.0,
                360.0,
                params.real("angleValue"),
            ),
            UiNode::col(vec![UiNode::text("Presets"), UiNode::row(presets)]),
            UiNode::row(vec![UiNode::checkbox(
                "crossWave",
                "Cross Wave",
                params.flag("crossWave"),
            )]),
            UiNode::labeled_slider(
                "Time",
                "time",
                DataType::Float,
                0.0,
                100.0,
                params.real("time"),
            ),
        ])
    }

    fn padding(&self, params: &ParamBag, env: &RenderEnv) -> u32 {
        env.scaled_padding(params.real("amplitude") / 2.0)
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let kernel = Kernel::new(
            &gpu.device,
            "wave_distortion",
            WAVE_DISTORTION_SHADER,
            MAIN_ENTRY,
            &BINDINGS,
        )?;
        Ok(Box::new(WaveDistortionRenderer { gpu, kernel }))
    }
}

struct WaveDistortionRenderer {
    gpu: Arc<GpuContext>,
    kernel: Kernel,
}

impl EffectRenderer for WaveDistortionRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = WaveDistortion.edit_parameters(params);
            let padded = input.pad(WaveDistortion.padding(&params, &env))?;
            let uniforms = WaveUniforms::new(&padded, &params, &env);

            let mut graph = ComputeGraph::for_bitmap("wave_distortion", &padded);
            let result = graph.texture("result");
            graph
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{UiEvent, apply_event};

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<WaveUniforms>(), 32);
    }

    #[test]
    fn test_angle_is_converted_to_radians() {
        let bitmap = Bitmap::new(1, 1);
        let params = WaveDistortion.schema().defaults().with("angleValue", 180.0);
        let u = WaveUniforms::new(&bitmap, &params, &RenderEnv::default());
        assert!((u.angle_rad - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_padding_is_half_amplitude() {
        let params = WaveDistortion.schema().defaults();
        assert_eq!(WaveDistortion.padding(&params, &RenderEnv::default()), 25);
        assert_eq!(WaveDistortion.padding(&params, &RenderEnv::new(144.0, 72.0)), 50);
    }

    #[test]
    fn test_preset_buttons_set_angle() {
        let schema = WaveDistortion.schema();
        let params = schema.defaults();
        let ui = WaveDistortion.render_ui(&params);

        let click = UiEvent::Click {
            id: "vertical".to_string(),
        };
        let next = apply_event(&schema, &ui, &params, &click);
        assert_eq!(next.real("angleValue"), 90.0);
        assert_eq!(next.real("amplitude"), 50.0);
    }
}
