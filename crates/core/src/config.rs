use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::EngineSpec;
use crate::registry::ParserRegistry;

const BUILTIN_ENGINES: &str = include_str!("../engines.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginesConfig {
    /// Merge this file over the built-in catalogue instead of replacing it.
    #[serde(default = "default_include_builtin")]
    pub include_builtin: bool,
    #[serde(default)]
    pub engines: Vec<EngineSpec>,
}

fn default_include_builtin() -> bool {
    true
}

impl EnginesConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read engine config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parse engine config {}", path.display()))
    }
}

/// Engines shipped with the crate.
pub fn builtin_engines() -> anyhow::Result<Vec<EngineSpec>> {
    let config = EnginesConfig::from_toml_str(BUILTIN_ENGINES).context("parse built-in engines")?;
    Ok(config.engines)
}

/// Entries of `overrides` replace same-named entries of `base` in place;
/// the rest are appended in their original order.
pub fn merge_engines(mut base: Vec<EngineSpec>, overrides: Vec<EngineSpec>) -> Vec<EngineSpec> {
    for spec in overrides {
        let key = spec.identity.name.trim().to_lowercase();
        match base
            .iter_mut()
            .find(|b| b.identity.name.trim().to_lowercase() == key)
        {
            Some(slot) => *slot = spec,
            None => base.push(spec),
        }
    }
    base
}

/// Engine definitions from `path`, or the built-ins when the file does not exist.
pub fn load_engines(path: &Path) -> anyhow::Result<Vec<EngineSpec>> {
    if !path.exists() {
        tracing::warn!("Engine configuration not found at {:?}, using built-in engines", path);
        return builtin_engines();
    }
    let config = EnginesConfig::load_from_file(path)?;
    if config.include_builtin {
        Ok(merge_engines(builtin_engines()?, config.engines))
    } else {
        Ok(config.engines)
    }
}

pub fn build_registry(path: &Path) -> anyhow::Result<ParserRegistry> {
    let specs = load_engines(path)?;
    ParserRegistry::from_specs(&specs)
        .with_context(|| format!("build parser registry from {}", path.display()))
}

pub fn default_config_path() -> PathBuf {
    if let Ok(config_dir) = std::env::var("SERP_SCRAPER_CONFIG_DIR") {
        PathBuf::from(config_dir).join("engines.toml")
    } else {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("serp-scraper")
            .join("engines.toml")
    }
}

/// Development config next to the working directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from("config").join("engines.toml")
}
