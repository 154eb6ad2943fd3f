//! PostgreSQL persistence adapters using the synchronous `postgres` client.
//!
//! # Architecture
//!
//! - **Thin adapters**: repository implementations only translate between
//!   result rows and domain types. No business logic resides here.
//! - **Caller-owned handle**: [`DbHandle`] wraps one open connection. The
//!   caller decides when it is opened and closed; repositories hold clones.
//! - **Parameterized SQL only**: every value, numeric or textual, travels as a
//!   bind parameter.
//! - **Strongly typed errors**: store failures are classified into
//!   [`UserRepositoryError`](crate::domain::ports::UserRepositoryError)
//!   variants with the driver error kept as the source.
//!
//! # Example
//!
//! ```no_run
//! use user_store::domain::ports::UserRepository;
//! use user_store::outbound::persistence::{DatabaseSettings, DbHandle, PostgresUserRepository};
//!
//! let settings = DatabaseSettings::from_environment()?;
//! let handle = DbHandle::connect(&settings.connection_settings()?)?;
//! let repository = PostgresUserRepository::new(handle);
//! let total = repository.count_users()?;
//! # let _ = total;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error_mapping;
mod handle;
mod postgres_user_repository;
mod settings;

pub use handle::{ConnectionSettings, DbHandle, HandleError};
pub use postgres_user_repository::PostgresUserRepository;
pub use settings::{DatabaseSettings, SettingsError};
