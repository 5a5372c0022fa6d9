// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for effect operations
//!
//! This module provides command-line functionality for:
//! - Listing the registered effects
//! - Describing an effect's parameters and UI
//! - Applying an effect to a PNG file

use chrono::Local;
use live_effects::bitmap::Bitmap;
use live_effects::config::Config;
use live_effects::effects::{self, LiveEffect, RenderEnv};
use live_effects::errors::{EffectError, GpuError};
use live_effects::gpu::shared_gpu_context;
use live_effects::params::{ParamBag, ParamValue};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Arguments of the `apply` subcommand
pub struct ApplyArgs {
    pub id: String,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub params: Vec<String>,
    pub params_json: Option<PathBuf>,
    pub dpi: Option<f64>,
    pub base_dpi: Option<f64>,
    pub time: f64,
}

/// List all registered effects
pub fn list_effects() -> Result<(), Box<dyn std::error::Error>> {
    println!("Available effects:");
    println!();
    for effect in effects::all() {
        let keys: Vec<&str> = effect.schema().specs().iter().map(|s| s.key).collect();
        println!("  {:<32} {}", effect.id(), effect.title());
        println!("      Parameters: {}", keys.join(", "));
    }
    Ok(())
}

/// Print schema, defaults and the default UI tree as JSON
pub fn describe_effect(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let effect = find_effect(id)?;
    let defaults = effect.schema().defaults();

    let description = serde_json::json!({
        "id": effect.id(),
        "title": effect.title(),
        "schema": effect.schema(),
        "defaults": defaults,
        "ui": effect.render_ui(&defaults),
    });
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

/// Apply an effect to an image file and write the result as PNG
pub fn apply_effect(args: ApplyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let effect = find_effect(&args.id)?;
    let config = Config::load();

    let mut params = effect.schema().defaults();
    if let Some(path) = args.params_json.as_ref() {
        params.merge(&load_params_json(path)?);
    }
    for assignment in &args.params {
        let (key, value) = parse_assignment(assignment)?;
        params.set(&key, value);
    }
    let params = effect.edit_parameters(&params);

    let base_dpi = args.base_dpi.unwrap_or(config.base_dpi);
    let env = RenderEnv::new(args.dpi.unwrap_or(base_dpi), base_dpi).with_time(args.time);

    let input: Bitmap = image::open(&args.input)?.to_rgba8().into();
    println!(
        "Applying {} to {} ({}x{})",
        effect.title(),
        args.input.display(),
        input.width,
        input.height
    );

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, effect.id()));

    let rt = tokio::runtime::Runtime::new()?;
    let start = Instant::now();
    let result = rt.block_on(async {
        let renderer = match effect.init(None) {
            Ok(renderer) => renderer,
            Err(EffectError::Gpu(GpuError::Unavailable)) => {
                let gpu = shared_gpu_context().await?;
                info!(adapter = %gpu.info.adapter_name, "Using GPU");
                effect.init(Some(gpu))?
            }
            Err(e) => return Err(e),
        };
        renderer.apply(&params, input, env).await
    })?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Effect applied");

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let (width, height) = (result.width, result.height);
    result.into_rgba_image()?.save(&output_path)?;

    println!("Saved {}x{} to {}", width, height, output_path.display());
    Ok(())
}

fn find_effect(id: &str) -> Result<Box<dyn LiveEffect>, EffectError> {
    effects::find(id).ok_or_else(|| EffectError::UnknownEffect(id.to_string()))
}

fn load_params_json(path: &Path) -> Result<ParamBag, EffectError> {
    let text = std::fs::read_to_string(path)?;
    let bag: ParamBag = serde_json::from_str(&text)?;
    Ok(bag)
}

/// Split `key=value` and guess the value's type
///
/// `true`/`false` become booleans, numbers become ints or reals, anything
/// else (choices, `#rrggbb` colours) stays text for the schema to coerce.
fn parse_assignment(assignment: &str) -> Result<(String, ParamValue), EffectError> {
    let Some((key, raw)) = assignment.split_once('=') else {
        return Err(EffectError::Params(format!(
            "expected KEY=VALUE, got '{}'",
            assignment
        )));
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(EffectError::Params(format!("empty key in '{}'", assignment)));
    }

    let raw = raw.trim();
    let value = match raw {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        _ => {
            if let Ok(v) = raw.parse::<i64>() {
                ParamValue::Int(v)
            } else if let Ok(v) = raw.parse::<f64>() {
                ParamValue::Real(v)
            } else {
                ParamValue::Enum(raw.to_string())
            }
        }
    };
    Ok((key.to_string(), value))
}

fn default_output_path(input: &Path, effect_id: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
    let path = dir.join(format!("{}_{}_{}.png", stem, effect_id, timestamp));
    if path.exists() {
        warn!(path = %path.display(), "Output exists and will be overwritten");
    }
    path
}
