// SPDX-License-Identifier: GPL-3.0-only

//! Underwater caustics light pattern
//!
//! Single pass. The pattern is animated by the host clock scaled by `speed`.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::Bitmap;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{Color, ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, CAUSTICS_SHADER, ComputeGraph, Kernel, MAIN_ENTRY, Resource, Slot,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;

pub const EFFECT_ID: &str = "caustics-effect-v1";

const BINDINGS: [BindingKind; 3] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Uniform,
];

pub const COLOR_MODES: [&str; 3] = ["blend", "add", "original"];

/// Uniform block of `caustics.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CausticsUniforms {
    pub light_color: [f32; 4],
    pub bg_color: [f32; 4],
    pub intensity: f32,
    pub scale: f32,
    pub complexity: f32,
    pub speed: f32,
    pub time: f32,
    pub color_mode: u32,
    pub output_size: [i32; 2],
}

impl CausticsUniforms {
    pub fn new(bitmap: &Bitmap, params: &ParamBag, env: &RenderEnv) -> Self {
        Self {
            light_color: params.color("lightColor").to_array(),
            bg_color: params.color("bgColor").to_array(),
            intensity: params.real("intensity") as f32,
            scale: params.real("scale") as f32,
            complexity: params.real("complexity") as f32,
            speed: params.real("speed") as f32,
            time: env.time as f32,
            color_mode: color_mode_index(params.text("colorMode")),
            output_size: [bitmap.width as i32, bitmap.height as i32],
        }
    }
}

/// Kernel switch value; unknown modes blend
fn color_mode_index(mode: &str) -> u32 {
    COLOR_MODES
        .iter()
        .position(|m| *m == mode)
        .map_or(0, |i| i as u32)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Caustics;

impl LiveEffect for Caustics {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Caustics"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::real("intensity", 1.0),
            ParamSpec::real("scale", 50.0),
            ParamSpec::real("complexity", 3.0),
            ParamSpec::real("speed", 0.5),
            ParamSpec::choice("colorMode", &COLOR_MODES, "blend"),
            ParamSpec::color("lightColor", Color::WHITE),
            ParamSpec::color("bgColor", Color::rgba(0.0, 0.1, 0.2, 1.0)),
        ])
    }

    fn scale_parameters(&self, params: &ParamBag, factor: f64) -> ParamBag {
        self.schema().scale(params, &["scale"], factor)
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        UiNode::col(vec![
            UiNode::labeled_slider(
                "Intensity",
                "intensity",
                DataType::Float,
                0.0,
                2.0,
                params.real("intensity"),
            ),
            UiNode::labeled_slider(
                "Scale",
                "scale",
                DataType::Float,
                10.0,
                200.0,
                params.real("scale"),
            ),
            UiNode::labeled_slider(
                "Complexity",
                "complexity",
                DataType::Float,
                1.0,
                10.0,
                params.real("complexity"),
            ),
            UiNode::labeled_slider(
                "Speed",
                "speed",
                DataType::Float,
                0.0,
                2.0,
                params.real("speed"),
            ),
            UiNode::col(vec![
                UiNode::text("Color Mode"),
                UiNode::select(
                    "colorMode",
                    &[("blend", "Blend"), ("add", "Add"), ("original", "Original")],
                    params.text("colorMode"),
                ),
            ]),
            UiNode::col(vec![
                UiNode::text("Light Color"),
                UiNode::color_input("lightColor", params.color("lightColor")),
            ]),
            UiNode::col(vec![
                UiNode::text("Background Color"),
                UiNode::color_input("bgColor", params.color("bgColor")),
            ]),
        ])
    }

    fn padding(&self, _params: &ParamBag, _env: &RenderEnv) -> u32 {
        0
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let kernel = Kernel::new(&gpu.device, "caustics", CAUSTICS_SHADER, MAIN_ENTRY, &BINDINGS)?;
        Ok(Box::new(CausticsRenderer { gpu, kernel }))
    }
}

struct CausticsRenderer {
    gpu: Arc<GpuContext>,
    kernel: Kernel,
}

impl EffectRenderer for CausticsRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = Caustics.edit_parameters(params);
            let uniforms = CausticsUniforms::new(&input, &params, &env);

            let mut graph = ComputeGraph::for_bitmap("caustics", &input);
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
        assert_eq!(std::mem::size_of::<CausticsUniforms>(), 64);
    }

    #[test]
    fn test_color_mode_index() {
        assert_eq!(color_mode_index("blend"), 0);
        assert_eq!(color_mode_index("add"), 1);
        assert_eq!(color_mode_index("original"), 2);
        assert_eq!(color_mode_index("screen"), 0);
    }

    #[test]
    fn test_unknown_color_mode_falls_back_to_default() {
        let edited = Caustics.edit_parameters(&ParamBag::new().with("colorMode", "screen"));
        assert_eq!(edited.text("colorMode"), "blend");
    }

    #[test]
    fn test_adjust_colors_touches_both_colors() {
        let params = Caustics.schema().defaults();
        let adjusted = Caustics.adjust_colors(&params, &|_| Color::rgba(0.5, 0.5, 0.5, 1.0));
        assert_eq!(adjusted.color("lightColor"), Color::rgba(0.5, 0.5, 0.5, 1.0));
        assert_eq!(adjusted.color("bgColor"), Color::rgba(0.5, 0.5, 0.5, 1.0));
        assert_eq!(adjusted.real("scale"), 50.0);
    }

    #[test]
    fn test_uniforms_carry_time() {
        let bitmap = Bitmap::new(8, 4);
        let params = Caustics.schema().defaults();
        let u = CausticsUniforms::new(&bitmap, &params, &RenderEnv::default().with_time(2.5));
        assert_eq!(u.time, 2.5);
        assert_eq!(u.output_size, [8, 4]);
        assert_eq!(u.light_color, [1.0, 1.0, 1.0, 1.0]);
    }
}
