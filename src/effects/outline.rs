// SPDX-License-Identifier: GPL-3.0-only

//! Morphological outline
//!
//! Pass 1 marks how close each pixel is to an opaque/transparent boundary.
//! Pass 2 closes that mask (dilate, then erode), thresholds it and paints the
//! outline colour behind the original.

use super::{EffectRenderer, LiveEffect, RenderEnv, require_gpu};
use crate::bitmap::Bitmap;
use crate::constants::SamplerMode;
use crate::errors::EffectResult;
use crate::gpu::GpuContext;
use crate::params::{Color, ParamBag, ParamSchema, ParamSpec};
use crate::shaders::{
    BindingKind, ComputeGraph, Kernel, MAIN_ENTRY, OUTLINE_BOUNDARY_SHADER,
    OUTLINE_MORPHOLOGY_SHADER, Resource, Slot,
};
use crate::ui::{DataType, UiNode};
use bytemuck::{Pod, Zeroable};
use futures::future::BoxFuture;
use std::sync::Arc;

pub const EFFECT_ID: &str = "outline-effect-morphology-v1";

const BOUNDARY_BINDINGS: [BindingKind; 4] = [
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Sampler,
    BindingKind::Uniform,
];

const MORPHOLOGY_BINDINGS: [BindingKind; 4] = [
    BindingKind::Texture,
    BindingKind::Texture,
    BindingKind::StorageTexture,
    BindingKind::Uniform,
];

/// Uniform block shared by both outline kernels
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct OutlineUniforms {
    pub color: [f32; 4],
    pub output_size: [i32; 2],
    pub dpi_scale: f32,
    pub size: f32,
    /// Fraction in `[0, 1]`
    pub opacity: f32,
    pub _padding: [f32; 3],
}

impl OutlineUniforms {
    pub fn new(bitmap: &Bitmap, params: &ParamBag, env: &RenderEnv) -> Self {
        Self {
            color: params.color("color").to_array(),
            output_size: [bitmap.width as i32, bitmap.height as i32],
            dpi_scale: env.dpi_scale() as f32,
            size: params.real("size") as f32,
            opacity: (params.real("opacity") / 100.0) as f32,
            _padding: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Outline;

impl LiveEffect for Outline {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Outline Effect (Morphology)"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::real("size", 3.0).min(0.1),
            ParamSpec::color("color", Color::BLACK),
            ParamSpec::real("opacity", 100.0).range(0.0, 100.0),
        ])
    }

    fn scale_parameters(&self, params: &ParamBag, factor: f64) -> ParamBag {
        self.schema().scale(params, &["size"], factor)
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        let size = params.real("size");
        UiNode::col(vec![
            UiNode::row(vec![
                UiNode::text("Size"),
                UiNode::slider("size", DataType::Float, 0.1, 200.0, size),
                UiNode::number_input("size", DataType::Float, size),
            ]),
            UiNode::color_input("color", params.color("color")),
            UiNode::labeled_slider(
                "Opacity",
                "opacity",
                DataType::Float,
                0.0,
                100.0,
                params.real("opacity"),
            ),
        ])
    }

    fn padding(&self, params: &ParamBag, env: &RenderEnv) -> u32 {
        env.scaled_padding(params.real("size"))
    }

    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        let gpu = require_gpu(gpu)?;
        let boundary = Kernel::new(
            &gpu.device,
            "outline_boundary",
            OUTLINE_BOUNDARY_SHADER,
            MAIN_ENTRY,
            &BOUNDARY_BINDINGS,
        )?;
        let morphology = Kernel::new(
            &gpu.device,
            "outline_morphology",
            OUTLINE_MORPHOLOGY_SHADER,
            MAIN_ENTRY,
            &MORPHOLOGY_BINDINGS,
        )?;
        Ok(Box::new(OutlineRenderer {
            gpu,
            boundary,
            morphology,
        }))
    }
}

struct OutlineRenderer {
    gpu: Arc<GpuContext>,
    boundary: Kernel,
    morphology: Kernel,
}

impl EffectRenderer for OutlineRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let params = Outline.edit_parameters(params);
            let padded = input.pad(Outline.padding(&params, &env))?;
            let uniforms = OutlineUniforms::new(&padded, &params, &env);

            let mut graph = ComputeGraph::for_bitmap("outline", &padded);
            let boundary = graph.texture("boundary");
            let result = graph.texture("result");
            graph
                .sampler(SamplerMode::NearestClamp)
                .pass(
                    &self.boundary,
                    vec![
                        Resource::Texture(Slot::SOURCE),
                        Resource::StorageTexture(boundary),
                        Resource::Sampler,
                        Resource::uniform(&uniforms),
                    ],
                )
                .pass(
                    &self.morphology,
                    vec![
                        Resource::Texture(Slot::SOURCE),
                        Resource::Texture(boundary),
                        Resource::StorageTexture(result),
                        Resource::uniform(&uniforms),
                    ],
                )
                .output(result);

            graph.run(&self.gpu, &padded).await
        })
    }
}
