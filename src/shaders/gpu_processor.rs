// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU processor infrastructure
//!
//! Small helpers used by every compute graph:
//! - Async buffer readback
//! - Workgroup count calculation
//! - Validation error scopes around recorded work

use crate::errors::GpuError;
use crate::gpu::wgpu;

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
///
/// # Returns
/// The buffer contents as a Vec<u8>
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, GpuError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| GpuError::BufferMap(e.to_string()))?;

    receiver
        .await
        .map_err(|_| GpuError::BufferMap("mapping callback was dropped".to_string()))?
        .map_err(|e| GpuError::BufferMap(e.to_string()))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Calculate compute shader dispatch size (workgroups needed)
///
/// Given a dimension and workgroup size, returns the number of workgroups
/// needed to cover the entire dimension.
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

/// Pop a validation scope pushed with `push_error_scope`, turning a captured
/// error into [`GpuError::Validation`]
pub async fn pop_validation_scope(device: &wgpu::Device, what: &str) -> Result<(), GpuError> {
    match device.pop_error_scope().await {
        Some(err) => Err(GpuError::Validation(format!("{}: {}", what, err))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_dispatch_size() {
        assert_eq!(compute_dispatch_size(640, 16), 40);
        assert_eq!(compute_dispatch_size(641, 16), 41);
        assert_eq!(compute_dispatch_size(16, 16), 1);
        assert_eq!(compute_dispatch_size(1, 16), 1);
    }
}
