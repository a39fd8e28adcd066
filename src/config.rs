//! Runtime configuration
//!
//! Resolved from the environment, with defaults that work out of the box
//! once `ANTHROPIC_API_KEY` is set.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fixed deadline for every inference call. Not configurable.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the inference gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API base URL
    pub api_url: String,

    /// API key (from environment)
    pub api_key: String,

    /// Model to use
    pub model: String,

    pub max_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    /// Where finalized briefs are stored
    pub data_dir: PathBuf,
    /// Optional JSON file overriding the built-in baseline questions
    pub questions_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut gateway = GatewayConfig::default();
        if let Ok(url) = std::env::var("BRIEF_API_URL") {
            gateway.api_url = url;
        }
        if let Ok(model) = std::env::var("BRIEF_MODEL") {
            gateway.model = model;
        }
        if let Ok(max_tokens) = std::env::var("BRIEF_MAX_TOKENS") {
            gateway.max_tokens = max_tokens
                .trim()
                .parse()
                .with_context(|| format!("BRIEF_MAX_TOKENS is not a number: {:?}", max_tokens))?;
        }

        let data_dir = std::env::var_os("BRIEF_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let questions_path = std::env::var_os("BRIEF_QUESTIONS").map(PathBuf::from);

        Ok(Self {
            gateway,
            data_dir,
            questions_path,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("briefs.db")
    }

    pub fn ensure_data_dir(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data dir {:?}", self.data_dir))?;
        Ok(self.data_dir.as_path())
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data dir on Linux, ~/Library/Application Support on macOS
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("strategic-brief")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let config = GatewayConfig::default();
        assert!(config.api_url.starts_with("https://"));
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(GATEWAY_TIMEOUT.as_secs(), 10);
    }

    #[test]
    fn test_db_path_lives_in_data_dir() {
        let config = Config {
            gateway: GatewayConfig::default(),
            data_dir: PathBuf::from("/tmp/briefs"),
            questions_path: None,
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/briefs/briefs.db"));
    }
}
