use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Remote task API host, with or without scheme
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// JSON tool catalog; the built-in catalog is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Credential material required before any invocation is served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub server_host: String,
}

impl Credentials {
    /// Fails naming every missing variable
    pub fn resolve(api_key: Option<String>, server_host: Option<String>) -> Result<Self> {
        let api_key = api_key.filter(|v| !v.trim().is_empty());
        let server_host = server_host.filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        if api_key.is_none() {
            missing.push("API_KEY");
        }
        if server_host.is_none() {
            missing.push("SERVER_HOST");
        }

        match (api_key, server_host) {
            (Some(api_key), Some(server_host)) => Ok(Self {
                api_key,
                server_host,
            }),
            _ => Err(anyhow::anyhow!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// `API_KEY` from the environment; host from `SERVER_HOST`, falling back
    /// to `server.host`
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::resolve(
            env::var("API_KEY").ok(),
            env::var("SERVER_HOST").ok().or_else(|| self.server.host.clone()),
        )
    }
}
