//! Configuration for the mcpscope CLI.
//!
//! Loaded from several sources, later ones overriding earlier ones:
//! 1. Global config: `~/.config/mcpscope/mcpscope.jsonc` (or `.json`)
//! 2. Environment variable: `MCPSCOPE_CONFIG_CONTENT`
//! 3. Project config: `mcpscope.jsonc` or `mcpscope.json` in the working directory
//! 4. Environment overrides: `MCPSCOPE_CLIENT_SECRET`, `MCPSCOPE_GATEWAY_URL`
//!
//! Files may contain `//` and `/* */` comments, `{env:VAR_NAME}` and
//! `{file:path}` references.
//!
//! ```jsonc
//! {
//!   "oauth": {
//!     "authorizationEndpoint": "https://idp.example.com/oauth2/v1/authorize",
//!     "tokenEndpoint": "https://idp.example.com/oauth2/v1/token",
//!     "clientId": "0oa1example",
//!     "scopes": ["openid", "profile", "email", "offline_access"]
//!   },
//!   "gateway": { "port": 3000, "clientSecret": "{env:IDP_CLIENT_SECRET}" },
//!   "endpoint": "https://mcp.example.com/mcp"
//! }
//! ```

use mcpscope_auth::{MonitorSettings, OAuthConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GATEWAY_PORT: u16 = 3000;
const FILE_NAMES: [&str; 2] = ["mcpscope.jsonc", "mcpscope.json"];

static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(env|file):([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {message}")]
    InvalidJson { path: String, message: String },

    #[error("Environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    #[error("File reference not found: {path}")]
    FileRefNotFound { path: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Identity provider settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// MCP endpoint used when a command is given none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Where the gateway runs, or where to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// An already-running gateway. When unset, token and MCP requests are
    /// made in-process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Confidential client secret. Keep it out of committed files; use
    /// `{env:...}` or `MCPSCOPE_CLIENT_SECRET`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_secs: Option<u64>,
}

impl Config {
    /// Load from every source.
    pub async fn load(project_dir: Option<&Path>) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let inline = std::env::var("MCPSCOPE_CONFIG_CONTENT").ok();
        let (mut config, sources) =
            Self::load_from(Self::global_config_dir().as_deref(), inline.as_deref(), project_dir)
                .await?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok((config, sources))
    }

    async fn load_from(
        global_dir: Option<&Path>,
        inline: Option<&str>,
        project_dir: Option<&Path>,
    ) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        if let Some(dir) = global_dir {
            if let Some(path) = Self::find_file(dir) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Some(content) = inline {
            config = config.merge(Self::parse_jsonc(content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            if let Some(path) = Self::find_file(dir) {
                config = config.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        Ok((config, sources))
    }

    fn find_file(dir: &Path) -> Option<PathBuf> {
        FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Global config directory. Prefers `~/.config/mcpscope` on Unix.
    pub fn global_config_dir() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            if let Some(home) = dirs::home_dir() {
                let xdg_config = home.join(".config").join("mcpscope");
                if xdg_config.exists() {
                    return Some(xdg_config);
                }
            }
        }

        dirs::config_dir().map(|d| d.join("mcpscope"))
    }

    /// Where credentials are kept.
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("mcpscope"))
    }

    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let content = Self::substitute_variables(&content, path)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    fn parse_jsonc(content: &str, source: &str) -> Result<Self, ConfigError> {
        let stripped = strip_comments(content);
        serde_json::from_str(&stripped).map_err(|e| ConfigError::InvalidJson {
            path: source.to_string(),
            message: e.to_string(),
        })
    }

    /// Replace `{env:NAME}` and `{file:path}` references. File paths are
    /// relative to the config file.
    fn substitute_variables(content: &str, config_path: &Path) -> Result<String, ConfigError> {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let mut result = content.to_string();

        for cap in var_regex().captures_iter(content) {
            let (Some(full), Some(kind), Some(value)) = (cap.get(0), cap.get(1), cap.get(2)) else {
                continue;
            };
            let value = value.as_str();

            let replacement = match kind.as_str() {
                "env" => std::env::var(value).map_err(|_| ConfigError::EnvVarNotFound {
                    name: value.to_string(),
                })?,
                "file" => {
                    let file_path = config_dir.join(value);
                    std::fs::read_to_string(&file_path)
                        .map(|v| v.trim().to_string())
                        .map_err(|_| ConfigError::FileRefNotFound {
                            path: file_path.display().to_string(),
                        })?
                }
                _ => continue,
            };

            result = result.replace(full.as_str(), &escape_json_fragment(&replacement));
        }

        Ok(result)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("MCPSCOPE_CLIENT_SECRET").filter(|s| !s.is_empty()) {
            self.gateway.client_secret = Some(secret);
        }
        if let Some(url) = lookup("MCPSCOPE_GATEWAY_URL").filter(|s| !s.is_empty()) {
            self.gateway.url = Some(url);
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        self.oauth = other.oauth.or(self.oauth);
        self.endpoint = other.endpoint.or(self.endpoint);
        self.gateway = GatewayConfig {
            url: other.gateway.url.or(self.gateway.url),
            host: other.gateway.host.or(self.gateway.host),
            port: other.gateway.port.or(self.gateway.port),
            client_secret: other.gateway.client_secret.or(self.gateway.client_secret),
        };
        self.monitor = MonitorConfig {
            interval_secs: other.monitor.interval_secs.or(self.monitor.interval_secs),
            threshold_secs: other.monitor.threshold_secs.or(self.monitor.threshold_secs),
        };
        self
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway.port.unwrap_or(DEFAULT_GATEWAY_PORT)
    }

    pub fn gateway_host(&self) -> &str {
        self.gateway.host.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        let defaults = MonitorSettings::default();
        MonitorSettings {
            interval: self
                .monitor
                .interval_secs
                .map_or(defaults.interval, Duration::from_secs),
            threshold: self
                .monitor
                .threshold_secs
                .map_or(defaults.threshold, Duration::from_secs),
        }
    }
}

/// Substituted values land inside JSON strings.
fn escape_json_fragment(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Strip `//` and `/* */` comments outside of strings.
fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => {
                result.push(c);
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
                result.push(c);
            }
            '/' if !in_string && chars.peek() == Some(&'/') => {
                chars.next();
                for c in chars.by_ref() {
                    if c == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if !in_string && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // keep line numbers stable for parse errors
                    if c == '\n' {
                        result.push('\n');
                    }
                    prev = c;
                }
            }
            _ => result.push(c),
        }
    }

    result
}
