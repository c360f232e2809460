//! Configuration types and loading.
//!
//! Config comes from an optional JSON file (`--config` or `LINEBOT_CONFIG_PATH`) and the
//! environment. Environment variables always win over file values, so a deployment can run
//! with no file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_CONFIG_PATH: &str = "LINEBOT_CONFIG_PATH";
pub const ENV_LINE_ACCESS_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const ENV_LINE_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_PORT: &str = "PORT";

/// Reply sent to the chat when generation fails.
pub const DEFAULT_ERROR_MESSAGE: &str = "申し訳ございません。エラーが発生しました。";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Messaging channel settings (LINE).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Generative model settings (Gemini).
    #[serde(default)]
    pub llm: LlmConfig,

    /// Reply texts.
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub line: LineChannelConfig,
}

/// LINE Messaging API credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChannelConfig {
    /// Long-lived channel access token. Overridden by LINE_CHANNEL_ACCESS_TOKEN env.
    pub channel_access_token: Option<String>,
    /// Channel secret used to verify x-line-signature. Overridden by LINE_CHANNEL_SECRET env.
    pub channel_secret: Option<String>,
    /// Messaging API base URL (tests, proxies). Default https://api.line.me.
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini generateContent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API key. Overridden by GEMINI_API_KEY env.
    pub api_key: Option<String>,
    /// Model id, with or without the `models/` prefix. Overridden by GEMINI_MODEL env.
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// API base URL. Default https://generativelanguage.googleapis.com/v1beta.
    pub base_url: Option<String>,
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyConfig {
    /// Text replied when the model call fails. Never contains error detail.
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            error_message: default_error_message(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0} (set the environment variable or the config file)")]
    Missing(&'static str),
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Fully resolved settings, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub line_access_token: String,
    pub line_channel_secret: String,
    pub line_api_base: Option<String>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub bind: String,
    pub port: u16,
    pub error_message: String,
}

impl Settings {
    /// Resolve settings from config and the process environment.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings from config and an arbitrary env lookup (env wins over file).
    pub fn resolve<F>(config: &Config, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let line = &config.channels.line;
        let gemini = &config.llm.gemini;
        let line_access_token = resolve_value(
            env(ENV_LINE_ACCESS_TOKEN),
            line.channel_access_token.as_deref(),
        )
        .ok_or(ConfigError::Missing(ENV_LINE_ACCESS_TOKEN))?;
        let line_channel_secret =
            resolve_value(env(ENV_LINE_CHANNEL_SECRET), line.channel_secret.as_deref())
                .ok_or(ConfigError::Missing(ENV_LINE_CHANNEL_SECRET))?;
        let gemini_api_key = resolve_value(env(ENV_GEMINI_API_KEY), gemini.api_key.as_deref())
            .ok_or(ConfigError::Missing(ENV_GEMINI_API_KEY))?;
        let gemini_model = resolve_value(env(ENV_GEMINI_MODEL), Some(gemini.model.as_str()))
            .unwrap_or_else(default_gemini_model);
        let port = resolve_port(config, env(ENV_PORT))?;
        Ok(Self {
            line_access_token,
            line_channel_secret,
            line_api_base: non_empty(line.api_base.as_deref()),
            gemini_api_key,
            gemini_model,
            gemini_base_url: non_empty(gemini.base_url.as_deref()),
            bind: config.gateway.bind.trim().to_string(),
            port,
            error_message: config.reply.error_message.clone(),
        })
    }

    /// `bind:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Env value (trimmed, non-empty) or else the file value (trimmed, non-empty).
pub fn resolve_value(env_value: Option<String>, file_value: Option<&str>) -> Option<String> {
    env_value
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| non_empty(file_value))
}

/// PORT env overrides gateway.port. An unparsable PORT is an error rather than a silent default.
pub fn resolve_port(config: &Config, env_port: Option<String>) -> Result<u16, ConfigError> {
    match env_port.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(p) => p.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: ENV_PORT,
            value: p.to_string(),
        }),
        None => Ok(config.gateway.port),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Config path from the argument or LINEBOT_CONFIG_PATH. None means env-only.
pub fn config_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.or_else(|| {
        std::env::var(ENV_CONFIG_PATH)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    })
}

/// Load config from the given path (or LINEBOT_CONFIG_PATH). No path => defaults.
/// An explicitly named file that does not exist is an error.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    let Some(path) = config_path(path) else {
        log::debug!("no config file given, using defaults and environment");
        return Ok((Config::default(), None));
    };
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let config: Config = serde_json::from_str(&s)
        .with_context(|| format!("parsing config from {}", path.display()))?;
    Ok((config, Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_LINE_ACCESS_TOKEN, "access"),
            (ENV_LINE_CHANNEL_SECRET, "secret"),
            (ENV_GEMINI_API_KEY, "key"),
        ]
    }

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 3000);
        assert_eq!(g.bind, "0.0.0.0");
    }

    #[test]
    fn settings_from_env_only() {
        let settings = Settings::resolve(&Config::default(), env_from(&full_env())).unwrap();
        assert_eq!(settings.line_access_token, "access");
        assert_eq!(settings.line_channel_secret, "secret");
        assert_eq!(settings.gemini_api_key, "key");
        assert_eq!(settings.gemini_model, "gemini-pro");
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.error_message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(settings.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config.channels.line.channel_secret = Some("from-file".to_string());
        config.llm.gemini.model = "file-model".to_string();
        let mut env = full_env();
        env.push((ENV_GEMINI_MODEL, "env-model"));
        env.push((ENV_PORT, "8080"));
        let settings = Settings::resolve(&config, env_from(&env)).unwrap();
        assert_eq!(settings.line_channel_secret, "secret");
        assert_eq!(settings.gemini_model, "env-model");
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn file_values_used_when_env_blank() {
        let mut config = Config::default();
        config.channels.line.channel_access_token = Some(" file-token ".to_string());
        config.channels.line.channel_secret = Some("file-secret".to_string());
        config.llm.gemini.api_key = Some("file-key".to_string());
        config.gateway.port = 4000;
        let env = env_from(&[(ENV_LINE_ACCESS_TOKEN, "   ")]);
        let settings = Settings::resolve(&config, env).unwrap();
        assert_eq!(settings.line_access_token, "file-token");
        assert_eq!(settings.port, 4000);
    }

    #[test]
    fn missing_secret_is_reported_by_env_name() {
        let env = env_from(&[
            (ENV_LINE_ACCESS_TOKEN, "access"),
            (ENV_LINE_CHANNEL_SECRET, "secret"),
        ]);
        let err = Settings::resolve(&Config::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_GEMINI_API_KEY)));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut env = full_env();
        env.push((ENV_PORT, "http"));
        let err = Settings::resolve(&Config::default(), env_from(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_PORT, .. }));
    }

    #[test]
    fn parses_camel_case_file() {
        let json = r#"{
            "gateway": { "port": 8000 },
            "channels": { "line": { "channelSecret": "s", "apiBase": "http://localhost:1" } },
            "llm": { "gemini": { "apiKey": "k" } },
            "reply": { "errorMessage": "sorry" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.channels.line.channel_secret.as_deref(), Some("s"));
        assert_eq!(config.llm.gemini.model, "gemini-pro");
        assert_eq!(config.reply.error_message, "sorry");
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let path = std::env::temp_dir().join("linebot-config-does-not-exist.json");
        assert!(load_config(Some(path)).is_err());
    }
}
