// SPDX-License-Identifier: GPL-3.0-only

//! Sparkle ("kirakira") blur
//!
//! A glow built from a separable blur. The vertical pass spreads the source,
//! optionally recoloured; the horizontal pass finishes the blur, brightens it
//! by `sparkle` and composites the untouched source on top. With
//! `makeOriginalTransparent` the source area is cut out of the glow instead.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::Bitmap;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{Color, ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, ComputeGraph, Kernel, Resource, SPARKLE_BLUR_SHADER, SPARKLE_HORIZONTAL_ENTRY,
    SPARKLE_VERTICAL_ENTRY, Slot,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

pub const EFFECT_ID: &str = "kirakira-blur-v1";

const VERTICAL_BINDINGS: [BindingKind; 4] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

/// Vertical bindings plus the original source at binding 4
const HORIZONTAL_BINDINGS: [BindingKind; 5] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Sampler,
    BindingKind::Uniform,
    BindingKind::Texture,
];

/// Uniform block of `sparkle_blur.wgsl`, shared by both passes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SparkleUniforms {
    pub custom_color: [f32; 4],
    pub output_size: [i32; 2],
    pub dpi_scale: f32,
    pub radius: i32,
    pub strength: f32,
    pub sparkle: f32,
    pub make_original_transparent: u32,
    pub use_custom_color: u32,
}

impl SparkleUniforms {
    pub fn new(bitmap: &Bitmap, params: &ParamBag, env: &RenderEnv) -> Self {
        Self {
            custom_color: params.color("customColor").to_array(),
            output_size: [bitmap.width as i32, bitmap.height as i32],
            dpi_scale: env.dpi_scale() as f32,
            radius: params.int("radius") as i32,
            strength: params.real("strength") as f32,
            sparkle: params.real("sparkle") as f32,
            make_original_transparent: params.flag("makeOriginalTransparent") as u32,
            use_custom_color: params.flag("useCustomColor") as u32,
        }
    }

    pub fn sigma(&self) -> f32 {
        self.radius as f32 * self.dpi_scale * 0.33 * self.strength
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SparkleBlur;

impl LiveEffect for SparkleBlur {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Kirakira Blur"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("radius", 10).range(0.0, 200.0),
            ParamSpec::real("strength", 1.0).range(0.0, 2.0),
            ParamSpec::real("sparkle", 0.5).range(0.0, 1.0),
            ParamSpec::bool("makeOriginalTransparent", false),
            ParamSpec::bool("useCustomColor", false),
            ParamSpec::color("customColor", Color::WHITE),
        ])
    }

    fn scale_parameters(&self, params: &ParamBag, factor: f64) -> ParamBag {
        self.schema().scale(params, &["radius"], factor)
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        let custom_color = params.color("customColor");
        let use_custom_color = params.flag("useCustomColor");

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
            UiNode::labeled_slider(
                "Sparkle",
                "sparkle",
                DataType::Float,
                0.0,
                1.0,
                params.real("sparkle"),
            ),
            UiNode::Separator,
            UiNode::col(vec![
                UiNode::checkbox("useCustomColor", "Use custom blur color", use_custom_color),
                UiNode::row(vec![
                    UiNode::text("Custom blur color"),
                    UiNode::color_input("customColor", custom_color),
                    UiNode::text_input("customColor", &custom_color.to_hex(true)),
                ])
                .disabled(!use_custom_color),
            ]),
            UiNode::Separator,
            UiNode::col(vec![UiNode::checkbox(
                "makeOriginalTransparent",
                "Make original transparent",
                params.flag("makeOriginalTransparent"),
            )]),
        ])
    }

    fn padding(&self, params: &ParamBag, env: &RenderEnv) -> u32 {
        env.scaled_padding(params.int("radius") as f64)
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let vertical = Kernel::new(
            &gpu.device,
            "sparkle_blur_vertical",
            SPARKLE_BLUR_SHADER,
            SPARKLE_VERTICAL_ENTRY,
            &VERTICAL_BINDINGS,
        )?;
        let horizontal = Kernel::new(
            &gpu.device,
            "sparkle_blur_horizontal",
            SPARKLE_BLUR_SHADER,
            SPARKLE_HORIZONTAL_ENTRY,
            &HORIZONTAL_BINDINGS,
        )?;
        Ok(Box::new(SparkleBlurRenderer {
            gpu,
            vertical,
            horizontal,
        }))
    }
}

struct SparkleBlurRenderer {
    gpu: Arc<GpuContext>,
    vertical: Kernel,
    horizontal: Kernel,
}

impl EffectRenderer for SparkleBlurRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = SparkleBlur.edit_parameters(params);
            let padded = input.pad(SparkleBlur.padding(&params, &env))?;
            let uniforms = SparkleUniforms::new(&padded, &params, &env);

            if uniforms.sigma() <= 0.0 {
                debug!("Sparkle blur sigma is zero, returning input unchanged");
                return Ok(padded);
            }

            let mut graph = ComputeGraph::for_bitmap("sparkle_blur", &padded);
            let blurred = graph.texture("vertical");
            let result = graph.texture("result");
            graph
                .pass(
                    &self.vertical,
                    vec![
                        Resource::Texture(Slot::SOURCE),
                        Resource::StorageTexture(blurred),
                        Resource::Sampler,
                        Resource::uniform(&uniforms),
                    ],
                )
                .pass(
                    &self.horizontal,
                    vec![
                        Resource::Texture(blurred),
                        Resource::StorageTexture(result),
                        Resource::Sampler,
                        Resource::uniform(&uniforms),
                        Resource::Texture(Slot::SOURCE),
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
        assert_eq!(std::mem::size_of::<SparkleUniforms>(), 48);
    }

    #[test]
    fn test_flags_reach_uniforms() {
        let bitmap = Bitmap::new(2, 2);
        let params = SparkleBlur
            .schema()
            .defaults()
            .with("useCustomColor", true)
            .with("customColor", Color::rgba(1.0, 0.0, 0.0, 1.0));
        let u = SparkleUniforms::new(&bitmap, &params, &RenderEnv::default());
        assert_eq!(u.use_custom_color, 1);
        assert_eq!(u.make_original_transparent, 0);
        assert_eq!(u.custom_color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_custom_color_row_follows_checkbox() {
        let params = SparkleBlur.schema().defaults();
        let ui = serde_json::to_value(SparkleBlur.render_ui(&params)).unwrap();
        let row = &ui["children"][4]["children"][1];
        assert_eq!(row["disabled"], true);
        assert_eq!(row["children"][2]["value"], "#ffffff");

        let enabled = params.with("useCustomColor", true);
        let ui = serde_json::to_value(SparkleBlur.render_ui(&enabled)).unwrap();
        assert_eq!(ui["children"][4]["children"][1]["disabled"], false);
    }

    #[test]
    fn test_adjust_colors_only_touches_custom_color() {
        let params = SparkleBlur.schema().defaults();
        let adjusted = SparkleBlur.adjust_colors(&params, &|c| Color::rgba(c.b, c.g, c.r, 0.5));
        assert_eq!(adjusted.color("customColor").a, 0.5);
        assert_eq!(adjusted.int("radius"), 10);
    }
}
