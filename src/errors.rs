// SPDX-License-Identifier: GPL-3.0-only

//! Error types for effect evaluation

use std::fmt;

/// Result type alias using EffectError
pub type EffectResult<T> = Result<T, EffectError>;

/// Main error type returned by effect initialisation and application
#[derive(Debug, Clone, PartialEq)]
pub enum EffectError {
    /// GPU device, pipeline or readback failures
    Gpu(GpuError),
    /// Parameter bag could not be interpreted
    Params(String),
    /// Bitmap buffer or image file problems
    Image(String),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
    /// No effect registered under the given id
    UnknownEffect(String),
    /// Generic error with message
    Other(String),
}

/// GPU-specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// No adapter matched the requested backends
    NoAdapter(String),
    /// Adapter refused to hand out a device
    DeviceRequest(String),
    /// A validation error was captured while recording or submitting work
    Validation(String),
    /// Staging buffer could not be mapped for readback
    BufferMap(String),
    /// A compute graph was assembled inconsistently
    Graph(String),
    /// Effect needs a GPU but was initialised without one
    Unavailable,
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::Gpu(e) => write!(f, "GPU error: {}", e),
            EffectError::Params(msg) => write!(f, "Parameter error: {}", msg),
            EffectError::Image(msg) => write!(f, "Image error: {}", msg),
            EffectError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EffectError::Io(msg) => write!(f, "I/O error: {}", msg),
            EffectError::UnknownEffect(id) => write!(f, "Unknown effect: {}", id),
            EffectError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter(msg) => write!(f, "No suitable GPU adapter found: {}", msg),
            GpuError::DeviceRequest(msg) => write!(f, "Failed to create GPU device: {}", msg),
            GpuError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            GpuError::BufferMap(msg) => write!(f, "Failed to map buffer: {}", msg),
            GpuError::Graph(msg) => write!(f, "Invalid compute graph: {}", msg),
            GpuError::Unavailable => write!(f, "No GPU context was provided"),
        }
    }
}

impl std::error::Error for EffectError {}
impl std::error::Error for GpuError {}

impl From<GpuError> for EffectError {
    fn from(err: GpuError) -> Self {
        EffectError::Gpu(err)
    }
}

impl From<String> for EffectError {
    fn from(msg: String) -> Self {
        EffectError::Other(msg)
    }
}

impl From<&str> for EffectError {
    fn from(msg: &str) -> Self {
        EffectError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for EffectError {
    fn from(err: std::io::Error) -> Self {
        EffectError::Io(err.to_string())
    }
}

impl From<image::ImageError> for EffectError {
    fn from(err: image::ImageError) -> Self {
        EffectError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for EffectError {
    fn from(err: serde_json::Error) -> Self {
        EffectError::Params(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_error_wraps_into_effect_error() {
        let err: EffectError = GpuError::Unavailable.into();
        assert_eq!(err, EffectError::Gpu(GpuError::Unavailable));
        assert_eq!(err.to_string(), "GPU error: No GPU context was provided");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let err = EffectError::from(io);
        assert!(matches!(err, EffectError::Io(ref msg) if msg.contains("missing.png")));
    }
}
