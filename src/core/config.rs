//! Configuration management for uigrab
//!
//! Supports environment variables, config files, and runtime overrides.
//! Priority: CLI args > env vars > config file > defaults
//!
//! Config file location: ~/.config/uigrab/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{ExtractError, Result};
use crate::core::types::{Framework, Styling};

/// Main configuration for uigrab
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Verbose diagnostics
    #[serde(default)]
    pub debug: bool,
    /// LLM (Ollama) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Output defaults for generated components
    #[serde(default)]
    pub output: OutputConfig,
    /// Selector synthesis tuning
    #[serde(default)]
    pub selector: SelectorConfig,
    /// Interactive picker tuning
    #[serde(default)]
    pub picker: PickerConfig,
    /// Batch behaviour
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Ollama server and model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Model that picks the element ref from the accessibility tree
    pub locate_model: String,
    /// Model that rewrites HTML/CSS into a component
    pub transform_model: String,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Session name prefix for agent-browser
    pub session_name: String,
    /// Whether to run in headed mode (visible browser)
    pub headed: bool,
    /// Default timeout for browser operations in ms
    pub timeout_ms: u64,
}

/// Fallback values for jobs that don't set them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub framework: Framework,
    pub styling: Styling,
    pub output_dir: PathBuf,
    pub include_assets: bool,
}

/// Selector synthesis tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Maximum ancestor levels walked by the path strategy
    pub max_depth: usize,
    /// Classes at or above this length are not used in paths
    pub max_class_len: usize,
    /// Namespace reserved for the tool's own injected markup
    pub reserved_prefix: String,
}

/// Interactive picker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Debounce window for hover selector recomputation
    pub debounce_ms: u64,
    /// How often the host drains the page's event queue
    pub poll_interval_ms: u64,
}

/// Whether batch jobs share one browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Launch and close a fresh session for every job
    #[default]
    PerJob,
    /// Launch once, lease to each job, close after the batch
    Shared,
}

/// Batch behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchConfig {
    #[serde(default)]
    pub session_mode: SessionMode,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11434,
            timeout_secs: 120,
            locate_model: "qwen3:8b".to_string(),
            transform_model: "qwen2.5-coder:7b".to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            session_name: "uigrab".to_string(),
            headed: false,
            timeout_ms: 30000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            framework: Framework::React,
            styling: Styling::Tailwind,
            output_dir: PathBuf::from("./components"),
            include_assets: false,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_class_len: 30,
            reserved_prefix: "__uigrab".to_string(),
        }
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 16,
            poll_interval_ms: 50,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| v == "true" || v == "1")
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("uigrab")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default file (if any), then the environment
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from_file(&Self::config_file()).unwrap_or_default();
        config.apply_env();
        config
    }

    /// Load configuration from an explicit file, then the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file only
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExtractError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ExtractError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ExtractError::config(format!("Failed to parse config: {}", e)))
    }

    /// Overlay environment variables on top of the current values
    pub fn apply_env(&mut self) {
        if let Ok(host) = env::var("OLLAMA_HOST") {
            self.llm.host = host;
        }
        if let Some(port) = env::var("OLLAMA_PORT").ok().and_then(|p| p.parse().ok()) {
            self.llm.port = port;
        }
        if let Ok(model) = env::var("UIGRAB_LOCATE_MODEL") {
            self.llm.locate_model = model;
        }
        if let Ok(model) = env::var("UIGRAB_TRANSFORM_MODEL") {
            self.llm.transform_model = model;
        }
        if let Ok(session) = env::var("UIGRAB_BROWSER_SESSION") {
            self.browser.session_name = session;
        }
        if let Some(headed) = env_flag("UIGRAB_HEADED") {
            self.browser.headed = headed;
        }
        if let Some(framework) = env::var("UIGRAB_FRAMEWORK")
            .ok()
            .and_then(|f| f.parse().ok())
        {
            self.output.framework = framework;
        }
        if let Some(styling) = env::var("UIGRAB_STYLING").ok().and_then(|s| s.parse().ok()) {
            self.output.styling = styling;
        }
        if let Ok(dir) = env::var("UIGRAB_OUTPUT_DIR") {
            self.output.output_dir = PathBuf::from(dir);
        }
        if let Some(debug) = env_flag("UIGRAB_DEBUG") {
            self.debug = debug;
        }
    }

    /// Save configuration to the default file and return its path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ExtractError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ExtractError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| ExtractError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.llm.host, self.llm.port)
    }

    /// Render this configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.port, 11434);
        assert_eq!(config.selector.max_depth, 5);
        assert_eq!(config.picker.debounce_ms, 16);
        assert_eq!(config.batch.session_mode, SessionMode::PerJob);
        assert_eq!(config.output.framework, Framework::React);
    }

    #[test]
    fn test_ollama_url() {
        let config = Config::default();
        assert_eq!(config.ollama_url(), "http://localhost:11434");
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::default().to_toml();
        assert!(toml_str.contains("locate_model"));
        assert!(toml_str.contains("reserved_prefix"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [output]
            framework = "svelte"
            styling = "css-modules"
            output_dir = "src/lib"
            include_assets = true

            [batch]
            session_mode = "shared"
            "#,
        )
        .unwrap();

        assert_eq!(config.output.framework, Framework::Svelte);
        assert_eq!(config.output.styling, Styling::CssModules);
        assert_eq!(config.batch.session_mode, SessionMode::Shared);
        assert_eq!(config.llm.port, 11434);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml("[output\nframework=").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("uigrab"));
    }
}
