use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "microweb.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_native_bypass_hosts")]
    pub native_bypass_hosts: Vec<String>,
    #[serde(default = "default_min_area_size")]
    pub min_area_size: f64,
    #[serde(default = "default_reinject_retry_delay_ms")]
    pub reinject_retry_delay_ms: u64,
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_native_bypass_hosts() -> Vec<String> {
    vec!["x.com".to_string(), "twitter.com".to_string()]
}

fn default_min_area_size() -> f64 {
    10.0
}

fn default_reinject_retry_delay_ms() -> u64 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            native_bypass_hosts: default_native_bypass_hosts(),
            min_area_size: default_min_area_size(),
            reinject_retry_delay_ms: default_reinject_retry_delay_ms(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl EngineConfig {
    pub fn reinject_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reinject_retry_delay_ms)
    }
}

pub fn config_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(CONFIG_FILE_NAME))
}

pub fn resolve_config_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    config_path_from_exe_path(&exe_path)
}

pub fn load() -> Result<EngineConfig> {
    load_from_path(&resolve_config_path()?)
}

pub fn load_from_path(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(EngineConfig::default());
    }

    serde_json::from_str(&content)
        .with_context(|| format!("deserialize config file {}", path.display()))
}

pub fn save_to_path(path: &Path, config: &EngineConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create config parent folder {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config).context("serialize engine config")?;
    std::fs::write(path, json).with_context(|| format!("write config file {}", path.display()))
}
