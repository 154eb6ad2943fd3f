//! Database connection settings loaded via OrthoConfig.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::handle::ConnectionSettings;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_APPLICATION_NAME: &str = "user-store";

/// Errors raised while loading or validating database settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Configuration sources could not be merged.
    #[error("failed to load database settings: {message}")]
    Load {
        /// Loader diagnostic.
        message: String,
    },
    /// No database URL was supplied by any source.
    #[error("database url is not configured; set USER_STORE_DATABASE_URL")]
    MissingUrl,
}

/// Connection settings for the user store.
///
/// Values merge from configuration files, `USER_STORE_DATABASE_*` environment
/// variables and command-line flags.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USER_STORE_DATABASE")]
pub struct DatabaseSettings {
    /// PostgreSQL connection URL.
    pub url: Option<String>,
    /// Seconds to wait for the initial connection.
    pub connect_timeout_secs: Option<u64>,
    /// Application name reported to the server.
    pub application_name: Option<String>,
}

impl DatabaseSettings {
    /// Load settings without reading process arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a configuration source is
    /// malformed.
    pub fn from_environment() -> Result<Self, SettingsError> {
        Self::load_from_iter([OsString::from(DEFAULT_APPLICATION_NAME)]).map_err(|error| {
            SettingsError::Load {
                message: error.to_string(),
            }
        })
    }

    /// Return the configured connect timeout, falling back to the default.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Return the configured application name, falling back to the default.
    pub fn application_name(&self) -> &str {
        self.application_name
            .as_deref()
            .unwrap_or(DEFAULT_APPLICATION_NAME)
    }

    /// Build validated [`ConnectionSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingUrl`] when no URL is configured.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, SettingsError> {
        let url = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingUrl)?;
        Ok(ConnectionSettings::new(url)
            .with_connect_timeout(self.connect_timeout())
            .with_application_name(self.application_name()))
    }
}
