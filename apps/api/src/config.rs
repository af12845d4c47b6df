use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{GeneratorConfig, DEFAULT_MODEL};
use crate::returns::pipeline::{PipelineConfig, DEFAULT_COMPANY_NAME};
use crate::returns::policy::load_policy;

/// Application configuration loaded from environment variables (and `.env`).
/// Read once at startup and treated as read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub company_name: String,
    pub policy_file: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            model: or_default("RETURNS_MODEL", DEFAULT_MODEL),
            max_tokens: or_default("RETURNS_MAX_TOKENS", "1024")
                .parse::<u32>()
                .context("RETURNS_MAX_TOKENS must be a positive integer")?,
            temperature: or_default("RETURNS_TEMPERATURE", "0.0")
                .parse::<f32>()
                .context("RETURNS_TEMPERATURE must be a number")?,
            timeout_secs: or_default("RETURNS_TIMEOUT_SECS", "120")
                .parse::<u64>()
                .context("RETURNS_TIMEOUT_SECS must be a whole number of seconds")?,
            company_name: or_default("RETURNS_COMPANY_NAME", DEFAULT_COMPANY_NAME),
            policy_file: lookup("RETURNS_POLICY_FILE").map(PathBuf::from),
            port: or_default("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Resolves the policy text (file override or built-in) into a `PipelineConfig`.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            company_name: self.company_name.clone(),
            policy: load_policy(self.policy_file.as_deref())?,
        })
    }
}
