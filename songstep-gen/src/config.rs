//! Service configuration
//!
//! Built once at startup from command-line flags, environment variables,
//! the optional TOML file and compiled defaults (in that priority order),
//! then shared read-only by `Arc` with the transport and adapters.

use clap::Parser;
use songstep_common::config::{resolve_data_root, TomlConfig, DATA_ROOT_ENV};
use songstep_common::secrets::{looks_complete, mask_key, sanitize_key};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 5173;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_MUSIC_BASE_URL: &str = "https://api.defapi.org";
pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 120;

/// How the music provider key is presented on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    #[default]
    Bearer,
    /// `X-API-Key: <key>`
    ApiKeyHeader,
}

impl AuthStyle {
    /// Parse "bearer" / "x-api-key"; anything else falls back to bearer
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "x-api-key" | "api-key" | "apikey" | "x_api_key" => AuthStyle::ApiKeyHeader,
            "bearer" | "" => AuthStyle::Bearer,
            other => {
                warn!("Unknown music auth style '{}', using bearer", other);
                AuthStyle::Bearer
            }
        }
    }
}

/// Command-line arguments for songstep-gen
#[derive(Parser, Debug, Default)]
#[command(name = "songstep-gen")]
#[command(about = "Learning-step song, lyrics and illustration generation service")]
#[command(version)]
pub struct CliArgs {
    /// Path to songstep.toml
    #[arg(short, long, env = "SONGSTEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "SONGSTEP_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "SONGSTEP_BIND")]
    pub bind: Option<String>,

    /// Folder holding session directories and history
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Folder of static UI files served as a fallback
    #[arg(long, env = "SONGSTEP_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Music provider base endpoint
    #[arg(long, env = "BASE_URL")]
    pub music_base_url: Option<String>,

    /// Music provider API key
    #[arg(long, env = "SONGSTEP_MUSIC_API_KEY", hide_env_values = true)]
    pub music_api_key: Option<String>,

    /// Music provider auth header style: bearer or x-api-key
    #[arg(long, env = "SONGSTEP_MUSIC_AUTH_STYLE")]
    pub music_auth_style: Option<String>,

    /// Callback URL sent with music submissions
    #[arg(long, env = "SONGSTEP_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// DashScope API key (image and text generation)
    #[arg(long, env = "DASHSCOPE_API_KEY", hide_env_values = true)]
    pub dashscope_api_key: Option<String>,

    /// DashScope base endpoint
    #[arg(long, env = "DASHSCOPE_BASE_URL")]
    pub dashscope_base_url: Option<String>,

    /// Per-request upstream timeout in seconds
    #[arg(long, env = "SONGSTEP_UPSTREAM_TIMEOUT")]
    pub upstream_timeout_secs: Option<u64>,
}

/// Immutable service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_root: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub music_base_url: String,
    pub music_api_key: String,
    pub music_auth_style: AuthStyle,
    pub callback_url: Option<String>,
    pub dashscope_api_key: String,
    pub dashscope_base_url: String,
    pub upstream_timeout: Duration,
}

impl ServiceConfig {
    /// Defaults rooted at the given data folder, with no credentials
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            data_root: data_root.into(),
            static_dir: None,
            music_base_url: DEFAULT_MUSIC_BASE_URL.to_string(),
            music_api_key: String::new(),
            music_auth_style: AuthStyle::Bearer,
            callback_url: None,
            dashscope_api_key: String::new(),
            dashscope_base_url: DEFAULT_DASHSCOPE_BASE_URL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }

    /// Merge CLI/env values over the TOML file over compiled defaults
    pub fn from_sources(args: &CliArgs, toml: &TomlConfig) -> Self {
        let data_root = resolve_data_root(
            args.data_root.as_deref(),
            DATA_ROOT_ENV,
            toml.data_root.as_deref(),
        );

        // SUNO_API_KEY is accepted as a legacy alias
        let music_api_key = args
            .music_api_key
            .clone()
            .or_else(|| std::env::var("SUNO_API_KEY").ok())
            .or_else(|| toml.music_api_key.clone())
            .map(|k| sanitize_key(&k))
            .unwrap_or_default();

        let dashscope_api_key = args
            .dashscope_api_key
            .clone()
            .or_else(|| toml.dashscope_api_key.clone())
            .map(|k| sanitize_key(&k))
            .unwrap_or_default();

        let music_auth_style = args
            .music_auth_style
            .as_deref()
            .or(toml.music_auth_style.as_deref())
            .map(AuthStyle::parse)
            .unwrap_or_default();

        let mut config = Self::new(data_root);
        config.port = args.port.or(toml.port).unwrap_or(DEFAULT_PORT);
        config.bind_address = args
            .bind
            .clone()
            .or_else(|| toml.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        config.static_dir = args.static_dir.clone().or_else(|| toml.static_dir.clone());
        config.music_base_url = trim_base_url(
            args.music_base_url
                .as_deref()
                .or(toml.music_base_url.as_deref())
                .unwrap_or(DEFAULT_MUSIC_BASE_URL),
        );
        config.music_api_key = music_api_key;
        config.music_auth_style = music_auth_style;
        config.callback_url = args
            .callback_url
            .clone()
            .or_else(|| toml.callback_url.clone())
            .filter(|u| !u.trim().is_empty());
        config.dashscope_api_key = dashscope_api_key;
        config.dashscope_base_url = trim_base_url(
            args.dashscope_base_url
                .as_deref()
                .or(toml.dashscope_base_url.as_deref())
                .unwrap_or(DEFAULT_DASHSCOPE_BASE_URL),
        );
        config.upstream_timeout = Duration::from_secs(
            args.upstream_timeout_secs
                .or(toml.upstream_timeout_secs)
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        );
        config
    }

    pub fn music_key_configured(&self) -> bool {
        !self.music_api_key.is_empty()
    }

    pub fn dashscope_key_configured(&self) -> bool {
        !self.dashscope_api_key.is_empty()
    }

    /// Report credential state at startup without revealing the keys
    pub fn log_credential_status(&self) {
        if looks_complete(&self.music_api_key) {
            info!(
                "Music API key loaded: {} ({:?})",
                mask_key(&self.music_api_key),
                self.music_auth_style
            );
        } else {
            warn!(
                "Music API key missing or too short; music submissions will be rejected upstream"
            );
        }

        if looks_complete(&self.dashscope_api_key) {
            if !self.dashscope_api_key.starts_with("sk-") {
                warn!(
                    "DashScope API key {} does not start with 'sk-'",
                    mask_key(&self.dashscope_api_key)
                );
            }
            info!("DashScope API key loaded: {}", mask_key(&self.dashscope_api_key));
        } else {
            warn!("DashScope API key missing or too short; image and text generation disabled");
        }
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_style_parse() {
        assert_eq!(AuthStyle::parse("x-api-key"), AuthStyle::ApiKeyHeader);
        assert_eq!(AuthStyle::parse("Bearer"), AuthStyle::Bearer);
        assert_eq!(AuthStyle::parse("something"), AuthStyle::Bearer);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let args = CliArgs {
            port: Some(9000),
            data_root: Some(PathBuf::from("/tmp/songstep-cli")),
            music_base_url: Some("https://cn.getgoapi.com/".to_string()),
            music_api_key: Some("  \"key-0123456789\" ".to_string()),
            ..Default::default()
        };
        let toml = TomlConfig {
            port: Some(8000),
            dashscope_api_key: Some("sk-from-toml-123".to_string()),
            upstream_timeout_secs: Some(30),
            ..Default::default()
        };

        let config = ServiceConfig::from_sources(&args, &toml);
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_root, PathBuf::from("/tmp/songstep-cli"));
        assert_eq!(config.music_base_url, "https://cn.getgoapi.com");
        assert_eq!(config.music_api_key, "key-0123456789");
        assert_eq!(config.dashscope_api_key, "sk-from-toml-123");
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert_eq!(config.dashscope_base_url, DEFAULT_DASHSCOPE_BASE_URL);
    }
}
