// ============================================================
// Layer 6: Config Store
// ============================================================
// Saves and restores the model architecture as JSON.
//
// A TransformerConfig is everything needed to rebuild the same
// architecture (sizes, depth, heads, dropout). Storing it next
// to an experiment lets `inspect` and `generate` reconstruct
// the model without repeating every flag.
//
// File layout:
//   <dir>/
//     transformer_config.json   ← pretty-printed TransformerConfig
//
// Reference: Burn Book §3 (Config)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::TransformerConfig;

const CONFIG_FILE: &str = "transformer_config.json";

/// Reads and writes `transformer_config.json` in one directory.
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Validate, then write the config; creates the directory if needed.
    pub fn save(&self, config: &TransformerConfig) -> Result<PathBuf> {
        config.validate().context("Refusing to save an invalid config")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create directory '{}'", self.dir.display()))?;

        let path = self.path();
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(path)
    }

    /// Read the config back; it is validated before being returned.
    pub fn load(&self) -> Result<TransformerConfig> {
        load_from(&self.path())
    }
}

fn load_from(path: &Path) -> Result<TransformerConfig> {
    let json = fs::read_to_string(path).with_context(|| {
        format!(
            "Cannot read config from '{}'. Run 'init-config' first.",
            path.display()
        )
    })?;

    let config: TransformerConfig = serde_json::from_str(&json)
        .with_context(|| format!("'{}' is not a valid model config", path.display()))?;
    config
        .validate()
        .with_context(|| format!("'{}' holds an invalid model config", path.display()))?;

    Ok(config)
}
