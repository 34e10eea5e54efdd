//! Sidecar configuration, read from the TOML file named by `CLASSDESK_CONFIG`.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_ENV: &str = "CLASSDESK_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives.
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { debounce_ms: 200 }
    }
}

impl Config {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("invalid config TOML")
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        Self::parse(&raw)
    }

    /// Defaults when `CLASSDESK_CONFIG` is unset.
    pub fn load_from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from_path(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = Config::parse("[search]\ndebounce_ms = 350\n").expect("parse");
        assert_eq!(cfg.search.debounce_ms, 350);
        assert_eq!(cfg.log, LogConfig::default());
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::parse("").expect("parse"), Config::default());
        assert_eq!(Config::default().search.debounce_ms, 200);
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(Config::parse("[search]\ndebounce_ms = \"soon\"\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let p = std::env::temp_dir().join("classdesk-config-does-not-exist.toml");
        let e = Config::load_from_path(&p).expect_err("missing");
        assert!(format!("{e:#}").contains("failed to read config"));
    }
}
