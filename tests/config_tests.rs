// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use live_effects::Config;
use live_effects::config::{GpuBackendChoice, PowerPreference};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("live-effects-test-{}", std::process::id()))
        .join(name)
}

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.base_dpi, 72.0, "Base DPI should default to 72");
    assert_eq!(config.gpu.backends, GpuBackendChoice::All);
    assert_eq!(config.gpu.power_preference, PowerPreference::HighPerformance);
    assert!(!config.gpu.force_fallback_adapter);
}

#[test]
fn test_config_save_and_reload() {
    let path = temp_path("roundtrip/config.json");
    let mut config = Config::default();
    config.base_dpi = 96.0;
    config.gpu.backends = GpuBackendChoice::Vulkan;
    config.gpu.power_preference = PowerPreference::LowPower;

    config.save(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_missing_fields_use_defaults() {
    let path = temp_path("partial.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "gpu": { "backends": "gl" } }"#).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.base_dpi, 72.0);
    assert_eq!(loaded.gpu.backends, GpuBackendChoice::Gl);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_rejects_invalid_base_dpi() {
    let path = temp_path("invalid.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "base_dpi": 0 }"#).unwrap();

    assert!(Config::from_file(&path).is_err());

    let _ = std::fs::remove_file(&path);
}
