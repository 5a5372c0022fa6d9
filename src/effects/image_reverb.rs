// SPDX-License-Identifier: GPL-3.0-only

//! Image reverb
//!
//! A CPU-only effect modelled on an audio reverb: a handful of early
//! reflections are smeared in a biased direction, the result is diffused
//! `iterations` times with a decaying gain and a box blur, and the wet signal
//! is mixed back into the dry input.
//!
//! Every intermediate buffer stores 8-bit channels with clamping, so rounding
//! happens at each stage rather than once at the end.

use super::{EffectRenderer, LiveEffect, RenderEnv};
use crate::bitmap::Bitmap;
use crate::errors::{EffectError, EffectResult};
use crate::gpu::GpuContext;
use crate::params::{ParamBag, ParamSchema, ParamSpec};
use crate::ui::{DataType, UiNode};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

pub const EFFECT_ID: &str = "image-reverb-v1";

/// (dx, dy, strength) of each early reflection
const REFLECTIONS: [(f64, f64, f64); 6] = [
    (1.0, 0.0, 0.6),
    (0.0, 1.0, 0.5),
    (1.0, 1.0, 0.4),
    (-1.0, 1.0, 0.3),
    (2.0, 0.0, 0.2),
    (0.0, 2.0, 0.1),
];

/// Gain of the dry signal added back after the early reflections
const DRY_REFLECTION_GAIN: f64 = 0.5;

/// Normalised reverb settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    pub decay_factor: f64,
    pub diffusion_strength: f64,
    pub spread: i64,
    pub iterations: i64,
    pub direction_x: f64,
    pub direction_y: f64,
}

impl ReverbSettings {
    pub fn from_params(params: &ParamBag) -> Self {
        Self {
            decay_factor: params.real("decayFactor"),
            diffusion_strength: params.real("diffusionStrength"),
            spread: params.int("spread").max(1),
            iterations: params.int("iterations").max(1),
            direction_x: params.real("directionX"),
            direction_y: params.real("directionY"),
        }
    }

    /// Per-axis bias in `[-1, 1]`
    fn bias(&self) -> (f64, f64) {
        (self.direction_x * 2.0 - 1.0, self.direction_y * 2.0 - 1.0)
    }

    /// Box blur radius, capped at the longer image edge
    fn blur_radius(&self, extent: i64) -> i64 {
        (self.spread / 3).clamp(1, extent.max(1))
    }
}

/// Rounds half up, so -2.5 becomes -2
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Rounds a pixel shift and caps it at `extent`, past which edge clamping
/// gives the same result
fn shift(offset: f64, extent: i64) -> i64 {
    let limit = extent as f64;
    round_half_up(offset).clamp(-limit, limit) as i64
}

/// Converts to a channel the way a clamped 8-bit store does: NaN becomes 0,
/// out-of-range values saturate, ties round to even.
fn store_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

struct Plane<'a> {
    width: i64,
    height: i64,
    data: &'a [u8],
}

impl Plane<'_> {
    fn clamped_index(&self, x: i64, y: i64) -> usize {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        ((y * self.width + x) * 4) as usize
    }
}

fn early_reflections(input: &Bitmap, settings: &ReverbSettings) -> Vec<u8> {
    let plane = Plane {
        width: input.width as i64,
        height: input.height as i64,
        data: &input.data,
    };
    let (bias_x, bias_y) = settings.bias();
    let spread = settings.spread as f64;
    let extent = plane.width.max(plane.height);
    let mut buffer = vec![0u8; input.data.len()];

    for (dx, dy, strength) in REFLECTIONS {
        let offset_x = shift(dx * bias_x * spread, extent);
        let offset_y = shift(dy * bias_y * spread, extent);

        for y in 0..plane.height {
            for x in 0..plane.width {
                let src = ((y * plane.width + x) * 4) as usize;
                let dst = plane.clamped_index(x + offset_x, y + offset_y);
                for c in 0..4 {
                    let sum = buffer[dst + c] as f64 + plane.data[src + c] as f64 * strength;
                    buffer[dst + c] = store_channel(sum);
                }
            }
        }
    }

    for (out, dry) in buffer.iter_mut().zip(&input.data) {
        let sum = *out as f64 + *dry as f64 * DRY_REFLECTION_GAIN;
        *out = store_channel(sum.min(255.0));
    }

    buffer
}

/// Shifts `source` by the biased spread with gain `decay`, then box-blurs
/// the shifted copy into `target`.
fn diffuse(
    target: &mut [u8],
    source: &[u8],
    width: i64,
    height: i64,
    decay: f64,
    settings: &ReverbSettings,
) {
    let (bias_x, bias_y) = settings.bias();
    let spread = settings.spread as f64;
    let extent = width.max(height);
    let dir_x = shift(bias_x * spread, extent);
    let dir_y = shift(bias_y * spread, extent);

    let mut shifted = vec![0u8; source.len()];
    let plane = Plane {
        width,
        height,
        data: source,
    };
    for y in 0..height {
        for x in 0..width {
            let src = ((y * width + x) * 4) as usize;
            let dst = plane.clamped_index(x + dir_x, y + dir_y);
            for c in 0..4 {
                let value = source[src + c] as f64 * decay + shifted[dst + c] as f64;
                shifted[dst + c] = store_channel(round_half_up(value));
            }
        }
    }

    box_blur(
        target,
        &Plane {
            width,
            height,
            data: &shifted,
        },
        settings.blur_radius(extent),
    );
}

fn box_blur(target: &mut [u8], source: &Plane<'_>, radius: i64) {
    let size = radius.saturating_mul(2).saturating_add(1) as f64;
    let divisor = size * size;

    for y in 0..source.height {
        for x in 0..source.width {
            let mut sum = [0u64; 4];
            for ky in -radius..=radius {
                for kx in -radius..=radius {
                    let idx = source.clamped_index(x.saturating_add(kx), y.saturating_add(ky));
                    for (c, acc) in sum.iter_mut().enumerate() {
                        *acc += source.data[idx + c] as u64;
                    }
                }
            }

            let dst = ((y * source.width + x) * 4) as usize;
            for (c, acc) in sum.iter().enumerate() {
                target[dst + c] = store_channel(round_half_up(*acc as f64 / divisor));
            }
        }
    }
}

/// Runs the full reverb on `input`. The output has the same size.
pub fn apply_image_reverb(input: &Bitmap, settings: &ReverbSettings) -> Bitmap {
    if input.is_empty() {
        return input.clone();
    }

    let width = input.width as i64;
    let height = input.height as i64;

    let mut wet = early_reflections(input, settings);
    let mut decay = 1.0;
    for _ in 0..settings.iterations {
        let source = wet.clone();
        diffuse(&mut wet, &source, width, height, decay, settings);
        decay *= settings.decay_factor;
    }

    let dry_gain = 1.0 - settings.diffusion_strength;
    let data = input
        .data
        .iter()
        .zip(&wet)
        .map(|(dry, wet)| {
            let mixed = *dry as f64 * dry_gain + *wet as f64 * settings.diffusion_strength;
            store_channel(round_half_up(mixed))
        })
        .collect();

    Bitmap {
        width: input.width,
        height: input.height,
        data,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageReverb;

impl LiveEffect for ImageReverb {
    fn id(&self) -> &'static str {
        EFFECT_ID
    }

    fn title(&self) -> &'static str {
        "Image Reverb"
    }

    fn schema(&self) -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::real("decayFactor", 0.85).range(0.0, 1.0),
            ParamSpec::real("diffusionStrength", 0.5).range(0.0, 1.0),
            ParamSpec::int("spread", 5).range(1.0, 100.0),
            ParamSpec::int("iterations", 5).range(1.0, 10.0),
            ParamSpec::real("directionX", 0.5).range(0.0, 1.0),
            ParamSpec::real("directionY", 0.5).range(0.0, 1.0),
        ])
    }

    fn render_ui(&self, params: &ParamBag) -> UiNode {
        UiNode::col(vec![
            UiNode::labeled_slider(
                "Decay",
                "decayFactor",
                DataType::Float,
                0.0,
                1.0,
                params.real("decayFactor"),
            ),
            UiNode::labeled_slider(
                "Diffusion",
                "diffusionStrength",
                DataType::Float,
                0.0,
                1.0,
                params.real("diffusionStrength"),
            ),
            UiNode::labeled_slider(
                "Spread",
                "spread",
                DataType::Int,
                1.0,
                100.0,
                params.int("spread") as f64,
            ),
            UiNode::labeled_slider(
                "Iterations",
                "iterations",
                DataType::Int,
                1.0,
                10.0,
                params.int("iterations") as f64,
            ),
            UiNode::Separator,
            UiNode::labeled_slider(
                "Direction X",
                "directionX",
                DataType::Float,
                0.0,
                1.0,
                params.real("directionX"),
            ),
            UiNode::labeled_slider(
                "Direction Y",
                "directionY",
                DataType::Float,
                0.0,
                1.0,
                params.real("directionY"),
            ),
        ])
    }

    fn padding(&self, _params: &ParamBag, _env: &RenderEnv) -> u32 {
        0
    }

    fn init(&self, _gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>> {
        Ok(Box::new(ImageReverbRenderer))
    }
}

struct ImageReverbRenderer;

impl EffectRenderer for ImageReverbRenderer {
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        _env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>> {
        Box::pin(async move {
            let settings = ReverbSettings::from_params(&ImageReverb.edit_parameters(params));
            debug!(
                width = input.width,
                height = input.height,
                iterations = settings.iterations,
                "Applying image reverb"
            );

            tokio::task::spawn_blocking(move || apply_image_reverb(&input, &settings))
                .await
                .map_err(|e| EffectError::Other(format!("Reverb task failed: {}", e)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Bitmap {
        let mut bitmap = Bitmap::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 31 + y * 17) % 256) as u8;
                bitmap.set_pixel(x, y, [v, 255 - v, v / 2, 255]);
            }
        }
        bitmap
    }

    #[test]
    fn test_store_channel_rounds_like_clamped_bytes() {
        assert_eq!(store_channel(2.5), 2);
        assert_eq!(store_channel(3.5), 4);
        assert_eq!(store_channel(300.0), 255);
        assert_eq!(store_channel(-1.0), 0);
        assert_eq!(store_channel(f64::NAN), 0);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
    }

    #[test]
    fn test_zero_diffusion_is_identity() {
        let input = gradient(13, 7);
        let params = ImageReverb.schema().defaults().with("diffusionStrength", 0.0);
        let settings = ReverbSettings::from_params(&ImageReverb.edit_parameters(&params));
        assert_eq!(apply_image_reverb(&input, &settings), input);
    }

    #[test]
    fn test_dimensions_are_preserved() {
        let input = gradient(9, 21);
        let settings = ReverbSettings::from_params(&ImageReverb.schema().defaults());
        let output = apply_image_reverb(&input, &settings);
        assert_eq!((output.width, output.height), (9, 21));
        assert_eq!(output.data.len(), input.data.len());
    }

    #[test]
    fn test_centered_direction_keeps_flat_image_flat() {
        let mut input = Bitmap::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                input.set_pixel(x, y, [200, 100, 50, 255]);
            }
        }
        let settings = ReverbSettings::from_params(&ImageReverb.schema().defaults());
        let output = apply_image_reverb(&input, &settings);
        let first = output.pixel(0, 0);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(output.pixel(x, y), first);
            }
        }
    }

    #[test]
    fn test_edit_clamps_counts() {
        let raw = ParamBag::new()
            .with("iterations", 40_i64)
            .with("spread", 0_i64)
            .with("decayFactor", 3.0);
        let edited = ImageReverb.edit_parameters(&raw);
        assert_eq!(edited.int("iterations"), 10);
        assert_eq!(edited.int("spread"), 1);
        assert_eq!(edited.real("decayFactor"), 1.0);
    }

    #[test]
    fn test_edit_caps_spread() {
        let edited = ImageReverb.edit_parameters(&ParamBag::new().with("spread", i64::MAX));
        assert_eq!(edited.int("spread"), 100);
    }

    #[test]
    fn test_huge_spread_completes() {
        let input = gradient(2, 2);
        let settings = ReverbSettings {
            decay_factor: 0.85,
            diffusion_strength: 0.5,
            spread: i64::MAX,
            iterations: 3,
            direction_x: 1.0,
            direction_y: 0.0,
        };
        let output = apply_image_reverb(&input, &settings);
        assert_eq!((output.width, output.height), (2, 2));
        assert_eq!(settings.blur_radius(2), 2);
    }

    #[test]
    fn test_shift_is_capped_at_extent() {
        assert_eq!(shift(3.5, 10), 4);
        assert_eq!(shift(-2.5, 10), -2);
        assert_eq!(shift(1.0e30, 7), 7);
        assert_eq!(shift(-1.0e30, 7), -7);
    }

    #[test]
    fn test_init_does_not_need_gpu() {
        assert!(ImageReverb.init(None).is_ok());
    }

    #[tokio::test]
    async fn test_renderer_runs_on_cpu() {
        let renderer = ImageReverb.init(None).unwrap();
        let input = gradient(6, 5);
        let params = ImageReverb.schema().defaults();
        let output = renderer
            .apply(&params, input.clone(), RenderEnv::default())
            .await
            .unwrap();
        assert_eq!((output.width, output.height), (6, 5));
        assert_ne!(output, input);
    }
}
