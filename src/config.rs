// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::DEFAULT_BASE_DPI;
use crate::errors::{EffectError, EffectResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "live-effects";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Which graphics APIs the adapter search may use
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuBackendChoice {
    /// Let wgpu pick from every backend compiled in
    #[default]
    All,
    Vulkan,
    Metal,
    Dx12,
    Gl,
}

impl GpuBackendChoice {
    pub const ALL: [GpuBackendChoice; 5] = [
        GpuBackendChoice::All,
        GpuBackendChoice::Vulkan,
        GpuBackendChoice::Metal,
        GpuBackendChoice::Dx12,
        GpuBackendChoice::Gl,
    ];

    pub fn backends(&self) -> wgpu::Backends {
        match self {
            GpuBackendChoice::All => wgpu::Backends::all(),
            GpuBackendChoice::Vulkan => wgpu::Backends::VULKAN,
            GpuBackendChoice::Metal => wgpu::Backends::METAL,
            GpuBackendChoice::Dx12 => wgpu::Backends::DX12,
            GpuBackendChoice::Gl => wgpu::Backends::GL,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl PowerPreference {
    pub fn to_wgpu(&self) -> wgpu::PowerPreference {
        match self {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

/// Adapter selection settings
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GpuConfig {
    pub backends: GpuBackendChoice,
    pub power_preference: PowerPreference,
    /// Force a software adapter (useful on headless CI machines)
    pub force_fallback_adapter: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Reference DPI that effect parameters are authored against
    pub base_dpi: f64,
    pub gpu: GpuConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dpi: DEFAULT_BASE_DPI,
            gpu: GpuConfig::default(),
        }
    }
}

impl Config {
    /// `<config dir>/live-effects/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> EffectResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| EffectError::Config(format!("{}: {}", path.display(), e)))?;
        config.validated()
    }

    /// Load from the default location, falling back to defaults
    ///
    /// A missing file is normal; an unreadable or invalid one is logged.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("No platform config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> EffectResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| EffectError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn validated(self) -> EffectResult<Self> {
        if !(self.base_dpi.is_finite() && self.base_dpi > 0.0) {
            return Err(EffectError::Config(format!(
                "base_dpi must be a positive number, got {}",
                self.base_dpi
            )));
        }
        Ok(self)
    }
}
