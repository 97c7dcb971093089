use std::{env, path::Path};

use anyhow::{anyhow, Context, Result};
use scout_engine::config::EngineConfig;
use serde_json::Value;
use tokio::fs;
use tracing::info;

pub const ENV_API_BASE: &str = "SCOUT_API_BASE";
pub const ENV_RPC_URL: &str = "SCOUT_RPC_URL";
pub const ENV_REGISTRY_ADDRESS: &str = "SCOUT_REGISTRY_ADDRESS";

/// Loads the engine config: built-in defaults, then the JSON file at
/// `config_path` (any subset of keys), then `SCOUT_*` environment overrides.
pub async fn load_config(config_path: &Path) -> Result<EngineConfig> {
    let mut cfg = match fs::read(config_path).await {
        Ok(raw) => {
            let disk: Value = serde_json::from_slice(&raw)
                .with_context(|| format!("parse config json: {}", config_path.display()))?;
            layer_over_defaults(disk)?
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(target: "app", path=%config_path.display(), "config file not found, using defaults");
            EngineConfig::default()
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("read config file: {}", config_path.display()))
        }
    };
    apply_env_overrides(&mut cfg, |key| env::var(key).ok());
    Ok(cfg)
}

fn layer_over_defaults(disk: Value) -> Result<EngineConfig> {
    if !disk.is_object() {
        return Err(anyhow!("config root must be a JSON object"));
    }
    let mut merged = serde_json::to_value(EngineConfig::default()).context("encode defaults")?;
    merge(&mut merged, disk);
    serde_json::from_value(merged).context("decode config")
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

pub fn apply_env_overrides<F>(cfg: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(v) = get(ENV_API_BASE) {
        cfg.http.base_url = v;
    }
    if let Some(v) = get(ENV_RPC_URL) {
        cfg.rpc.url = v;
    }
    if let Some(v) = get(ENV_REGISTRY_ADDRESS) {
        cfg.rpc.registry_address = v;
    }
}
