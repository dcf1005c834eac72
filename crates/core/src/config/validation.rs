//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version`, `cache_prefix` or `user_agent` is empty
    /// - `scope` is not an absolute http(s) URL
    /// - `shell_assets` is empty
    /// - any origin or client marker is empty
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("version", &self.version),
            ("cache_prefix", &self.cache_prefix),
            ("user_agent", &self.user_agent),
            ("sync_tag", &self.sync_tag),
            ("default_tab", &self.default_tab),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        let scope = self.scope_url()?;
        if !matches!(scope.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "scope".into(),
                reason: format!("unsupported scheme: {}", scope.scheme()),
            });
        }

        if self.shell_assets.is_empty() {
            return Err(ConfigError::Invalid { field: "shell_assets".into(), reason: "must list at least one asset".into() });
        }

        for (field, markers) in [
            ("external_origins", &self.external_origins),
            ("network_only_origins", &self.network_only_origins),
            ("client_url_markers", &self.client_url_markers),
        ] {
            if markers.iter().any(|m| m.trim().is_empty()) {
                return Err(ConfigError::Invalid { field: field.into(), reason: "markers must not be empty".into() });
            }
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        let overlap: Vec<&String> = self
            .network_only_origins
            .iter()
            .filter(|m| self.external_origins.contains(m))
            .collect();
        if !overlap.is_empty() {
            tracing::warn!(
                ?overlap,
                "Markers listed as both network-only and external; network-only takes precedence"
            );
        }

        Ok(())
    }
}
