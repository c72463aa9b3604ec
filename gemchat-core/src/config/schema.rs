//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for gemchat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote model configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Chat session configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API credential, usually supplied through `GEMINI_API_KEY`
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the generative language API
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub system_instruction: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Directory scanned for session files and used for saves
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: String,
    /// Extension of binary session snapshots (without the dot)
    #[serde(default = "default_session_extension")]
    pub session_extension: String,
    /// Extension of JSON exports (without the dot)
    #[serde(default = "default_export_extension")]
    pub export_extension: String,
}

fn default_sessions_dir() -> String {
    ".".to_string()
}

fn default_session_extension() -> String {
    "cht".to_string()
}

fn default_export_extension() -> String {
    "json".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            session_extension: default_session_extension(),
            export_extension: default_export_extension(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.gemchat/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"provider":{"model":"gemini-2.0-flash"}}"#).unwrap();
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert_eq!(config.provider.timeout_secs, 120);
        assert_eq!(config.chat.session_extension, "cht");
        assert_eq!(config.logging.level, "warn");
    }
}
