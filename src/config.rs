use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "PASH_CONFIG";
const CONFIG_FILE: &str = ".pash.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ShellConfig {
    pub prompt: String,
    pub history_file: Option<PathBuf>,
    pub pipeline: PipelineSettings,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "$ ".to_string(),
            history_file: None,
            pipeline: PipelineSettings::default(),
        }
    }
}

/// Timing knobs for multi-stage pipelines.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineSettings {
    /// How long earlier stages may linger after the last stage exits.
    pub grace_period_ms: u64,
    /// Upper bound on waiting for relay threads to drain.
    pub relay_timeout_ms: u64,
    pub relay_chunk_size: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: 100,
            relay_timeout_ms: 1000,
            relay_chunk_size: 4096,
        }
    }
}

impl PipelineSettings {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }
}

/// Resolves which file to read: `--config`, then `$PASH_CONFIG`, then `~/.pash.toml`.
/// The boolean says whether the file has to exist.
fn config_location(explicit: Option<&Path>) -> Option<(PathBuf, bool)> {
    if let Some(path) = explicit {
        return Some((path.to_path_buf(), true));
    }
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Some((PathBuf::from(path), true));
    }
    env::var_os("HOME").map(|home| (PathBuf::from(home).join(CONFIG_FILE), false))
}

pub fn load_config(explicit: Option<&Path>) -> Result<ShellConfig> {
    let Some((path, required)) = config_location(explicit) else {
        return Ok(ShellConfig::default());
    };

    if !path.exists() {
        if required {
            bail!("Config file not found: {}", path.display());
        }
        return Ok(ShellConfig::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<ShellConfig> {
    let config: ShellConfig = toml::from_str(content)?;
    if config.pipeline.relay_chunk_size == 0 {
        bail!("pipeline.relay-chunk-size must be greater than zero");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.pipeline.grace_period(), Duration::from_millis(100));
        assert_eq!(config.pipeline.relay_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = parse_config(
            r#"
            prompt = "pash> "
            history-file = "/tmp/pash_history"

            [pipeline]
            grace-period-ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.prompt, "pash> ");
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/pash_history")));
        assert_eq!(config.pipeline.grace_period_ms, 250);
        assert_eq!(config.pipeline.relay_chunk_size, 4096);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(parse_config("prompt = 42").is_err());
        assert!(parse_config("[pipeline]\nrelay-chunk-size = 0").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pash.toml");
        fs::write(&path, "prompt = \"> \"\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().prompt, "> ");
    }
}
