//! Caller-owned handle over a single PostgreSQL connection.
//!
//! The handle is cheap to clone and safe to share between threads. Clones
//! refer to the same connection and take turns using it; the connection
//! closes when the last clone is dropped.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use postgres::{Client, Config, NoTls};
use tracing::debug;

/// Errors raised while opening or checking a [`DbHandle`].
///
/// Messages never include the connection URL because it may carry
/// credentials.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    /// The connection URL could not be parsed.
    #[error("invalid database url")]
    InvalidUrl {
        /// Parser error.
        #[source]
        source: postgres::Error,
    },
    /// The server could not be reached or rejected the session.
    #[error("failed to connect to database")]
    Connect {
        /// Driver error.
        #[source]
        source: postgres::Error,
    },
    /// The connection check round trip failed.
    #[error("database connection check failed")]
    Ping {
        /// Driver error.
        #[source]
        source: postgres::Error,
    },
}

/// Parameters for opening a [`DbHandle`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use user_store::outbound::persistence::ConnectionSettings;
///
/// let settings = ConnectionSettings::new("postgresql://app@localhost/users")
///     .with_connect_timeout(Duration::from_secs(3));
/// assert_eq!(settings.connect_timeout(), Some(Duration::from_secs(3)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    url: String,
    connect_timeout: Option<Duration>,
    application_name: Option<String>,
}

impl ConnectionSettings {
    /// Create settings for the given URL with no timeout or application name.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
            application_name: None,
        }
    }

    /// Set the timeout for establishing the connection.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the application name reported to the server.
    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Get the connection URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the connect timeout, if any.
    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Get the application name, if any.
    pub fn application_name(&self) -> Option<&str> {
        self.application_name.as_deref()
    }

    fn to_config(&self) -> Result<Config, HandleError> {
        let mut config: Config = self
            .url
            .parse()
            .map_err(|source| HandleError::InvalidUrl { source })?;
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }
        if let Some(name) = self.application_name.as_deref() {
            config.application_name(name);
        }
        Ok(config)
    }
}

/// Shared handle over one open PostgreSQL client.
#[derive(Clone)]
pub struct DbHandle {
    client: Arc<Mutex<Client>>,
}

impl DbHandle {
    /// Open a connection using the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidUrl`] for unparsable URLs and
    /// [`HandleError::Connect`] when the server cannot be reached.
    pub fn connect(settings: &ConnectionSettings) -> Result<Self, HandleError> {
        let config = settings.to_config()?;
        let client = config
            .connect(NoTls)
            .map_err(|source| HandleError::Connect { source })?;
        debug!(
            application_name = settings.application_name(),
            "opened database connection"
        );
        Ok(Self::from_client(client))
    }

    /// Wrap a client that was opened elsewhere.
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
        }
    }

    /// Run `operation` with exclusive access to the client.
    ///
    /// Callers use this to run explicit transactions. Repository methods must
    /// not be called from inside `operation`: the handle is already held.
    ///
    /// A lock poisoned by a panicking caller is recovered; the client itself
    /// reports any broken connection on its next use.
    pub fn with_client<T>(&self, operation: impl FnOnce(&mut Client) -> T) -> T {
        let mut guard = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        operation(&mut *guard)
    }

    /// Check that the connection still answers queries.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Ping`] when the round trip fails.
    pub fn ping(&self) -> Result<(), HandleError> {
        self.with_client(|client| client.batch_execute("SELECT 1"))
            .map_err(|source| HandleError::Ping { source })
    }

    /// True once the underlying connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.with_client(|client| client.is_closed())
    }
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle").finish_non_exhaustive()
    }
}
