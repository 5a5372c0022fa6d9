// SPDX-License-Identifier: GPL-3.0-only

//! Live effect abstraction
//!
//! An effect is described by a [`LiveEffect`] (schema, parameter hooks, UI
//! tree, padding) and evaluated by the [`EffectRenderer`] it creates at init.
//!
//! ```text
//! ┌──────────────────────┐
//! │ Host (params, DPI)   │
//! └──────────┬───────────┘
//!            │ edit_parameters / padding
//!            ▼
//! ┌──────────────────────┐
//! │  LiveEffect trait    │  ← Schema, hooks, UI tree
//! └──────────┬───────────┘
//!            │ init(gpu)
//!            ▼
//! ┌──────────────────────┐
//! │  EffectRenderer      │  ← Compiled kernels, apply()
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  ComputeGraph        │  ← pad, align, dispatch, readback, unpad
//! └──────────────────────┘
//! ```

pub mod caustics;
pub mod cosmic_waves;
pub mod fluid_distortion;
pub mod gaussian_blur;
pub mod image_reverb;
pub mod outline;
pub mod sparkle_blur;
pub mod wave_distortion;

pub use caustics::Caustics;
pub use cosmic_waves::CosmicWaves;
pub use fluid_distortion::FluidDistortion;
pub use gaussian_blur::GaussianBlur;
pub use image_reverb::ImageReverb;
pub use outline::Outline;
pub use sparkle_blur::SparkleBlur;
pub use wave_distortion::WaveDistortion;

use crate::bitmap::{Bitmap, padding_pixels};
use crate::constants::DEFAULT_BASE_DPI;
use crate::errors::{EffectResult, GpuError};
use crate::gpu::GpuContext;
use crate::params::{Color, ParamBag, ParamSchema};
use crate::ui::UiNode;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Document context of one apply call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEnv {
    /// Resolution the bitmap was rasterised at
    pub dpi: f64,
    /// Reference resolution parameters are expressed in
    pub base_dpi: f64,
    /// Host clock in seconds, used by animated effects
    pub time: f64,
}

impl Default for RenderEnv {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_BASE_DPI,
            base_dpi: DEFAULT_BASE_DPI,
            time: 0.0,
        }
    }
}

impl RenderEnv {
    pub fn new(dpi: f64, base_dpi: f64) -> Self {
        Self {
            dpi,
            base_dpi,
            time: 0.0,
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// `dpi / base_dpi`, or 1 when either side is unusable
    pub fn dpi_scale(&self) -> f64 {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if usable(self.dpi) && usable(self.base_dpi) {
            self.dpi / self.base_dpi
        } else {
            1.0
        }
    }

    /// Pixel margin for a length given in base-DPI pixels
    pub fn scaled_padding(&self, length: f64) -> u32 {
        padding_pixels(length * self.dpi_scale())
    }
}

/// Complete live effect trait
///
/// Every effect provides:
/// - A parameter schema and the hooks the host calls while editing
/// - A UI tree for its parameter panel
/// - The margin its kernel needs around the input
/// - A renderer created once per GPU context
pub trait LiveEffect: Send + Sync {
    // ===== Identity =====

    /// Stable identifier, e.g. `gaussian-blur-v1`
    fn id(&self) -> &'static str;

    /// Human readable name
    fn title(&self) -> &'static str;

    /// Declared parameters with kinds, bounds and defaults
    fn schema(&self) -> ParamSchema;

    // ===== Parameter hooks =====

    /// Clamp and derive parameters from raw UI state
    ///
    /// Never fails: missing or malformed entries fall back to the defaults.
    fn edit_parameters(&self, params: &ParamBag) -> ParamBag {
        self.schema().normalize(params)
    }

    /// Remap every colour field through the host's colour transform
    fn adjust_colors(&self, params: &ParamBag, adjust: &dyn Fn(Color) -> Color) -> ParamBag {
        self.schema().adjust_colors(params, adjust)
    }

    /// Rescale spatial fields after the artwork was resized by `factor`
    fn scale_parameters(&self, params: &ParamBag, _factor: f64) -> ParamBag {
        params.clone()
    }

    /// Parameter set at fraction `t` between two keyframes
    fn interpolate(&self, a: &ParamBag, b: &ParamBag, t: f64) -> ParamBag {
        self.schema().interpolate(a, b, t)
    }

    // ===== Presentation =====

    /// Declarative UI tree for the current parameters
    fn render_ui(&self, params: &ParamBag) -> UiNode;

    // ===== Rendering =====

    /// Transparent margin added around the input before the kernel runs
    ///
    /// # Arguments
    /// * `params` - Normalised parameters
    /// * `env` - DPI context of the call
    fn padding(&self, params: &ParamBag, env: &RenderEnv) -> u32;

    /// Compile kernels and return a renderer
    ///
    /// GPU effects fail with [`GpuError::Unavailable`] when `gpu` is `None`.
    fn init(&self, gpu: Option<Arc<GpuContext>>) -> EffectResult<Box<dyn EffectRenderer>>;
}

/// Initialised effect, ready to process bitmaps
pub trait EffectRenderer: Send + Sync {
    /// Run the effect
    ///
    /// The result is `padding` pixels larger than `input` on every side.
    fn apply<'a>(
        &'a self,
        params: &'a ParamBag,
        input: Bitmap,
        env: RenderEnv,
    ) -> BoxFuture<'a, EffectResult<Bitmap>>;
}

/// Unwrap the GPU context handed to `init`
pub(crate) fn require_gpu(gpu: Option<Arc<GpuContext>>) -> Result<Arc<GpuContext>, GpuError> {
    gpu.ok_or(GpuError::Unavailable)
}

/// Every registered effect, in menu order
pub fn all() -> Vec<Box<dyn LiveEffect>> {
    vec![
        Box::new(GaussianBlur),
        Box::new(Caustics),
        Box::new(FluidDistortion),
        Box::new(CosmicWaves),
        Box::new(SparkleBlur),
        Box::new(Outline),
        Box::new(WaveDistortion),
        Box::new(ImageReverb),
    ]
}

/// Look up an effect by id
pub fn find(id: &str) -> Option<Box<dyn LiveEffect>> {
    all().into_iter().find(|effect| effect.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_effect_ids_are_unique() {
        let effects = all();
        let ids: HashSet<_> = effects.iter().map(|e| e.id()).collect();
        assert_eq!(ids.len(), effects.len());
    }

    #[test]
    fn test_find_effect() {
        assert_eq!(find("gaussian-blur-v1").map(|e| e.title()), Some("Gaussian Blur"));
        assert!(find("does-not-exist").is_none());
    }

    #[test]
    fn test_dpi_scale() {
        assert_eq!(RenderEnv::new(144.0, 72.0).dpi_scale(), 2.0);
        assert_eq!(RenderEnv::new(144.0, 0.0).dpi_scale(), 1.0);
        assert_eq!(RenderEnv::default().dpi_scale(), 1.0);
    }

    #[test]
    fn test_scaled_padding_rounds_up() {
        let env = RenderEnv::new(96.0, 72.0);
        // 10 * 1.333.. = 13.33
        assert_eq!(env.scaled_padding(10.0), 14);
        assert_eq!(env.scaled_padding(0.0), 0);
    }

    #[test]
    fn test_gpu_effects_require_context() {
        for effect in all() {
            if effect.id() == image_reverb::EFFECT_ID {
                assert!(effect.init(None).is_ok());
            } else {
                assert!(effect.init(None).is_err(), "{} accepted a missing GPU", effect.id());
            }
        }
    }

    #[test]
    fn test_defaults_survive_edit() {
        for effect in all() {
            let defaults = effect.schema().defaults();
            assert_eq!(effect.edit_parameters(&defaults), defaults, "{}", effect.id());
        }
    }
}
