//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (`<config dir>/codenote/config.toml`)
//! 3. Project config (.codenote/config.toml)
//! 4. Explicit `--config` file
//! 5. Environment variables (CODENOTE_* prefix, `__` between sections)
//! 6. Gateway variables (LITELLM_BASE_URL, LITELLM_API_KEY, LITELLM_MODEL)
//!
//! CLI flags are applied on top by the command layer.

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::Config;
use crate::constants::{llm, output};
use crate::types::{NoteError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → explicit file → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(NoteError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        // e.g. CODENOTE_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed("CODENOTE_").split("__"));

        let mut config: Config = figment
            .extract()
            .map_err(|e| NoteError::config(format!("Configuration error: {}", e)))?;

        Self::apply_gateway_env(&mut config, |key| std::env::var(key).ok());

        Ok(config)
    }

    /// Apply the LITELLM_* gateway variables, ignoring empty values
    pub fn apply_gateway_env<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_empty(llm::ENV_BASE_URL) {
            config.llm.base_url = base_url;
        }
        if let Some(model) = non_empty(llm::ENV_MODEL) {
            config.llm.model = model;
        }
        if let Some(api_key) = non_empty(llm::ENV_API_KEY) {
            config.llm.api_key = Some(api_key);
        }
    }

    /// Render the effective configuration as TOML (API key omitted)
    pub fn render(config: &Config) -> Result<String> {
        toml::to_string_pretty(config).map_err(|e| NoteError::config(e.to_string()))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (platform config dir + `codenote`)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "codenote").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(output::PROJECT_DIR).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("codenote.toml");
        std::fs::write(
            &path,
            r#"
[chunking]
max_files_per_module = 7

[scan]
module_strategy = "anchored"
include = ["src/**"]

[concurrency]
chunks = 1
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.chunking.max_files_per_module, 7);
        assert_eq!(config.chunking.max_chars_per_file, 10_000);
        assert_eq!(
            config.scan.module_strategy,
            crate::config::ModuleStrategy::Anchored
        );
        assert_eq!(config.scan.include, vec!["src/**".to_string()]);
        assert_eq!(config.concurrency.chunks, 1);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::load(Some(&temp_dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_gateway_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LITELLM_BASE_URL", "https://gateway.internal/openai"),
            ("LITELLM_MODEL", "local-model"),
            ("LITELLM_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        ConfigLoader::apply_gateway_env(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.base_url, "https://gateway.internal/openai");
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_gateway_env_ignores_blank_values() {
        let mut config = Config::default();
        ConfigLoader::apply_gateway_env(&mut config, |_| Some("  ".to_string()));
        assert_eq!(config.llm.base_url, llm::DEFAULT_BASE_URL);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_render_omits_api_key() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-hidden".to_string());
        let rendered = ConfigLoader::render(&config).unwrap();
        assert!(rendered.contains("[chunking]"));
        assert!(!rendered.contains("sk-hidden"));
    }
}
