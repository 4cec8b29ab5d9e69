use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "fieldplan.toml";
const CONFIG_ENV_VAR: &str = "FIELDPLAN_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory; defaults to `~/.fieldplan`.
    pub data: Option<String>,
    /// `on`/`off` (and the usual yes/no spellings).
    pub color: Option<String>,
    /// Default scope id for planner fetches.
    pub scope: Option<String>,
}

impl Config {
    /// Load from the explicit `--config` path, `$FIELDPLAN_CONFIG`, or the
    /// user config directory. A missing file is not an error; defaults
    /// apply.
    #[tracing::instrument(skip(override_path))]
    pub fn load(override_path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = resolve_config_path(override_path) else {
            warn!("no config path resolvable; using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!(file = %path.display(), "config file not found; using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        info!(file = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn color_enabled(&self) -> anyhow::Result<bool> {
        let value = self.color.as_deref().unwrap_or("on");
        match value.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => Ok(true),
            "off" | "no" | "false" | "0" => Ok(false),
            other => Err(anyhow!("invalid color setting: {other}")),
        }
    }

    pub fn default_scope(&self) -> &str {
        self.scope.as_deref().unwrap_or("default")
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.data.as_deref() {
        expand_tilde(Path::new(cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

fn resolve_config_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }

    if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(expand_tilde(Path::new(trimmed)));
        }
    }

    dirs::config_dir().map(|dir| dir.join("fieldplan").join(CONFIG_FILE))
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".fieldplan"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
