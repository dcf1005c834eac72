//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (AQUANEV_SW_*)
//! 2. TOML config file (if AQUANEV_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is built once at startup and shared by reference; nothing
//! mutates it at runtime.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::PartitionNames;

mod validation;

pub use validation::ConfigError;

/// How origin markers are compared against a request hostname.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMatch {
    /// Marker may appear anywhere in the hostname.
    #[default]
    Substring,
    /// Hostname equals the marker or ends with `.marker`.
    Domain,
}

impl HostMatch {
    /// Check a hostname against a single marker.
    pub fn matches(self, hostname: &str, marker: &str) -> bool {
        match self {
            HostMatch::Substring => hostname.contains(marker),
            HostMatch::Domain => {
                hostname == marker
                    || hostname
                        .strip_suffix(marker)
                        .is_some_and(|head| head.ends_with('.'))
            }
        }
    }

    /// Check a hostname against any marker in a list.
    pub fn matches_any(self, hostname: &str, markers: &[String]) -> bool {
        markers.iter().any(|m| self.matches(hostname, m))
    }
}

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (AQUANEV_SW_*)
/// 2. TOML config file (if AQUANEV_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Display name used for default notification titles and the offline page.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Prefix of every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token. Bumping it is the only upgrade mechanism.
    ///
    /// Set via AQUANEV_SW_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Absolute URL of the application scope; its origin is the first-party origin.
    ///
    /// Set via AQUANEV_SW_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Shell assets pre-cached on install, relative to `scope`.
    #[serde(default = "default_shell_assets")]
    pub shell_assets: Vec<String>,

    /// Hostname markers served stale-while-revalidate.
    #[serde(default = "default_external_origins")]
    pub external_origins: Vec<String>,

    /// Hostname markers that must always go to the network.
    #[serde(default = "default_network_only_origins")]
    pub network_only_origins: Vec<String>,

    /// Marker comparison mode.
    #[serde(default)]
    pub host_match: HostMatch,

    /// Background sync tag that triggers a client broadcast.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// URL fragments identifying an application window on notification click.
    #[serde(default = "default_client_url_markers")]
    pub client_url_markers: Vec<String>,

    /// Tab opened when a notification carries none.
    #[serde(default = "default_tab")]
    pub default_tab: String,

    /// Icon and badge used for notifications.
    #[serde(default = "default_icon")]
    pub notification_icon: String,

    /// Path to SQLite cache database.
    ///
    /// Set via AQUANEV_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional network timeout in milliseconds. Unset leaves requests unbounded.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_app_name() -> String {
    "AQUANEV".into()
}

fn default_cache_prefix() -> String {
    "aquanev".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_shell_assets() -> Vec<String> {
    ["./", "./index.html", "./manifest.json", "./icon-192.png", "./icon-512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_external_origins() -> Vec<String> {
    [
        "cdnjs.cloudflare.com",
        "fonts.googleapis.com",
        "fonts.gstatic.com",
        "kit.fontawesome.com",
        "ka-f.fontawesome.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_network_only_origins() -> Vec<String> {
    ["script.google.com", "script.googleusercontent.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_sync_tag() -> String {
    "aquanev-sync".into()
}

fn default_client_url_markers() -> Vec<String> {
    vec!["index.html".into(), "aquanev".into()]
}

fn default_tab() -> String {
    "dashboard".into()
}

fn default_icon() -> String {
    "./icon-192.png".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./aquanev-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "aquanev-sw/0.1".into()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            scope: default_scope(),
            shell_assets: default_shell_assets(),
            external_origins: default_external_origins(),
            network_only_origins: default_network_only_origins(),
            host_match: HostMatch::default(),
            sync_tag: default_sync_tag(),
            client_url_markers: default_client_url_markers(),
            default_tab: default_tab(),
            notification_icon: default_icon(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("AQUANEV_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let figment = figment.merge(
            Env::prefixed("AQUANEV_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Partition names derived from the current version token.
    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames::derive(&self.cache_prefix, &self.version)
    }

    /// Parsed application scope.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `scope` is not an absolute URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })
    }

    /// Network timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
