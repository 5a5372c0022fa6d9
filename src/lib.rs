// SPDX-License-Identifier: GPL-3.0-only

//! Live Effects - GPU image effects for a vector-editor plugin host
//!
//! Each effect takes a parameter bag and an RGBA bitmap and returns a new
//! bitmap. The host owns the plugin ABI and renders the declarative UI trees
//! the effects describe.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`effects`]: The effect catalogue and the [`LiveEffect`] trait
//! - [`params`]: Parameter bags, schemas and colours
//! - [`ui`]: Declarative UI tree and event handling
//! - [`bitmap`]: RGBA buffers with effect and alignment padding
//! - [`shaders`]: WGSL kernels and the multi-pass compute graph
//! - [`gpu`]: Device creation and the shared context
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! use live_effects::{RenderEnv, effects, gpu};
//!
//! let gpu = gpu::shared_gpu_context().await?;
//! let effect = effects::find("gaussian-blur-v1").unwrap();
//! let renderer = effect.init(Some(gpu))?;
//! let params = effect.schema().defaults();
//! let output = renderer.apply(&params, bitmap, RenderEnv::new(144.0, 72.0)).await?;
//! ```

pub mod bitmap;
pub mod config;
pub mod constants;
pub mod effects;
pub mod errors;
pub mod gpu;
pub mod params;
pub mod shaders;
pub mod ui;

// Re-export commonly used types
pub use bitmap::Bitmap;
pub use config::Config;
pub use effects::{EffectRenderer, LiveEffect, RenderEnv};
pub use errors::{EffectError, EffectResult, GpuError};
pub use gpu::GpuContext;
pub use params::{Color, ParamBag, ParamSchema, ParamValue};
pub use ui::{UiEvent, UiNode};
