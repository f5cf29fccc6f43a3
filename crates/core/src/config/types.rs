use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

use crate::manager::TransferManagerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub premiumize: PremiumizeConfig,
    pub transfers: TransferManagerConfig,
    /// Library managers, consulted in this order when recovering errored transfers.
    #[serde(default)]
    pub arrs: Vec<ArrConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8182
}

/// Premiumize.me connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PremiumizeConfig {
    /// Account API key.
    pub api_key: String,
    /// API base URL (overridable for testing).
    #[serde(default = "default_premiumize_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Name of the remote folder completed downloads land in.
    #[serde(default = "default_downloads_folder")]
    pub downloads_folder: String,
}

impl PremiumizeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_premiumize_url(),
            timeout_secs: default_timeout(),
            downloads_folder: default_downloads_folder(),
        }
    }
}

fn default_premiumize_url() -> String {
    "https://www.premiumize.me/api".to_string()
}

fn default_downloads_folder() -> String {
    "arrDownloads".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Which library manager an [`ArrConfig`] points at.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArrKind {
    Sonarr,
    Radarr,
    Lidarr,
}

impl ArrKind {
    /// API path prefix for this manager.
    pub fn api_prefix(&self) -> &'static str {
        match self {
            ArrKind::Sonarr | ArrKind::Radarr => "/api/v3",
            ArrKind::Lidarr => "/api/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArrKind::Sonarr => "sonarr",
            ArrKind::Radarr => "radarr",
            ArrKind::Lidarr => "lidarr",
        }
    }
}

/// A Sonarr, Radarr or Lidarr instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArrConfig {
    /// Display name, unique across instances.
    pub name: String,
    pub kind: ArrKind,
    /// Base URL (e.g., "http://localhost:8989")
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Number of history records fetched per refresh.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
    /// How long fetched history is reused before refreshing.
    #[serde(default = "default_history_cache_secs")]
    pub history_cache_secs: u64,
}

impl ArrConfig {
    pub fn new(
        name: impl Into<String>,
        kind: ArrKind,
        url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            url: url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout(),
            history_page_size: default_history_page_size(),
            history_cache_secs: default_history_cache_secs(),
        }
    }
}

fn default_history_page_size() -> u32 {
    250
}

fn default_history_cache_secs() -> u64 {
    60
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub premiumize: SanitizedPremiumizeConfig,
    pub transfers: TransferManagerConfig,
    pub arrs: Vec<SanitizedArrConfig>,
}

/// Sanitized Premiumize config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPremiumizeConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub downloads_folder: String,
}

/// Sanitized *arr config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedArrConfig {
    pub name: String,
    pub kind: ArrKind,
    pub url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            premiumize: SanitizedPremiumizeConfig {
                base_url: config.premiumize.base_url.clone(),
                api_key_configured: !config.premiumize.api_key.is_empty(),
                timeout_secs: config.premiumize.timeout_secs,
                downloads_folder: config.premiumize.downloads_folder.clone(),
            },
            transfers: config.transfers.clone(),
            arrs: config
                .arrs
                .iter()
                .map(|a| SanitizedArrConfig {
                    name: a.name.clone(),
                    kind: a.kind,
                    url: a.url.clone(),
                    api_key_configured: !a.api_key.is_empty(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[server]
host = "127.0.0.1"
port = 9000

[premiumize]
api_key = "secret-pm"
downloads_folder = "done"

[transfers]
poll_interval_ms = 2000
simultaneous_downloads = 3
downloads_dir = "/media/downloads"
unzip_dir = "/tmp/debridarr"

[[arrs]]
name = "Sonarr"
kind = "sonarr"
url = "http://localhost:8989"
api_key = "sonarr-key"

[[arrs]]
name = "Lidarr"
kind = "lidarr"
url = "http://localhost:8686"
api_key = "lidarr-key"
history_cache_secs = 5
"#;

    #[test]
    fn test_deserialize_full_config() {
        let config: Config = toml::from_str(FULL).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.premiumize.downloads_folder, "done");
        assert_eq!(config.premiumize.base_url, "https://www.premiumize.me/api");
        assert_eq!(config.transfers.poll_interval_ms, 2000);
        assert_eq!(config.transfers.simultaneous_downloads, 3);
        assert_eq!(config.arrs.len(), 2);
        assert_eq!(config.arrs[0].name, "Sonarr");
        assert_eq!(config.arrs[1].kind, ArrKind::Lidarr);
        assert_eq!(config.arrs[1].history_cache_secs, 5);
        assert_eq!(config.arrs[0].history_page_size, 250);
    }

    #[test]
    fn test_deserialize_with_default_server() {
        let toml = r#"
[premiumize]
api_key = "k"

[transfers]
downloads_dir = "/media/downloads"
unzip_dir = "/tmp/debridarr"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8182);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_deserialize_unknown_arr_kind_fails() {
        let toml = r#"
[premiumize]
api_key = "k"

[transfers]
downloads_dir = "/media/downloads"
unzip_dir = "/tmp/debridarr"

[[arrs]]
name = "Readarr"
kind = "readarr"
url = "http://localhost:8787"
api_key = "k"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_arr_kind_api_prefix() {
        assert_eq!(ArrKind::Sonarr.api_prefix(), "/api/v3");
        assert_eq!(ArrKind::Radarr.api_prefix(), "/api/v3");
        assert_eq!(ArrKind::Lidarr.api_prefix(), "/api/v1");
    }

    #[test]
    fn test_sanitized_config_hides_keys() {
        let config: Config = toml::from_str(FULL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.premiumize.api_key_configured);
        assert_eq!(sanitized.arrs.len(), 2);
        assert!(sanitized.arrs[0].api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-pm"));
        assert!(!json.contains("sonarr-key"));
    }
}
