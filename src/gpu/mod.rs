// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities for compute pipelines.
//!
//! Effects never create their own device. One [`GpuContext`] is created per
//! process (or per host session) and shared behind an `Arc`.

use crate::config::{Config, GpuConfig};
use crate::errors::GpuError;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Re-export so every compute module names the same wgpu
pub use ::wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Largest 2D texture edge the device accepts
    pub max_texture_dimension_2d: u32,
}

/// Device and queue shared by every effect renderer
#[derive(Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub info: GpuDeviceInfo,
}

impl GpuContext {
    /// Reject bitmaps the device cannot hold as a single texture
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), GpuError> {
        let max = self.info.max_texture_dimension_2d;
        if width > max || height > max {
            return Err(GpuError::Validation(format!(
                "{}x{} exceeds the device texture limit of {}",
                width, height, max
            )));
        }
        Ok(())
    }
}

/// Create a wgpu device and queue for compute work.
///
/// The 2D texture limit is raised to whatever the adapter supports, since
/// documents are often larger than the WebGPU default of 8192 pixels.
pub async fn create_compute_device(
    label: &str,
    config: &GpuConfig,
) -> Result<GpuContext, GpuError> {
    info!(label = label, backends = ?config.backends, "Creating GPU device for compute");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: config.backends.backends(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference.to_wgpu(),
            compatible_surface: None,
            force_fallback_adapter: config.force_fallback_adapter,
        })
        .await
        .map_err(|e| GpuError::NoAdapter(e.to_string()))?;

    let adapter_info = adapter.get_info();
    let adapter_limits = adapter.limits();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for compute"
    );

    let required_limits = wgpu::Limits {
        max_texture_dimension_2d: adapter_limits.max_texture_dimension_2d,
        ..wgpu::Limits::downlevel_defaults()
    };

    debug!(
        max_texture_dimension_2d = required_limits.max_texture_dimension_2d,
        "Requesting device limits"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits,
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;

    // Loss is reported and left to the host; the next apply fails upward
    let lost_label = label.to_string();
    device.set_device_lost_callback(move |reason, message| {
        warn!(label = %lost_label, reason = ?reason, message = %message, "GPU device lost");
    });
    device.on_uncaptured_error(uncaptured_error_handler(label));

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        max_texture_dimension_2d: adapter_limits.max_texture_dimension_2d,
    };

    Ok(GpuContext {
        device,
        queue,
        info,
    })
}

/// Log errors raised outside an error scope instead of letting wgpu panic
pub(crate) fn uncaptured_error_handler(label: &str) -> Arc<dyn wgpu::UncapturedErrorHandler> {
    let label = label.to_string();
    Arc::new(move |error: wgpu::Error| {
        warn!(label = %label, error = %error, "Uncaptured GPU error");
    })
}

/// Cached process-wide context
static SHARED_GPU_CONTEXT: OnceLock<tokio::sync::Mutex<Option<Arc<GpuContext>>>> =
    OnceLock::new();

/// Get or create the shared GPU context using the user config
///
/// A failed attempt is not cached, so a later call may succeed once a device
/// becomes available.
pub async fn shared_gpu_context() -> Result<Arc<GpuContext>, GpuError> {
    let lock = SHARED_GPU_CONTEXT.get_or_init(|| tokio::sync::Mutex::new(None));
    let mut guard = lock.lock().await;

    if let Some(ctx) = guard.as_ref() {
        return Ok(Arc::clone(ctx));
    }

    let config = Config::load();
    match create_compute_device("live_effects_gpu", &config.gpu).await {
        Ok(ctx) => {
            let ctx = Arc::new(ctx);
            *guard = Some(Arc::clone(&ctx));
            Ok(ctx)
        }
        Err(e) => {
            warn!("Failed to initialize shared GPU context: {}", e);
            Err(e)
        }
    }
}
