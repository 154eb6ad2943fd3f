//! PostgreSQL data-access layer for user records.
//!
//! The crate follows a ports-and-adapters split:
//!
//! - [`domain`] holds the [`User`](domain::User) entity and the synchronous
//!   [`UserRepository`](domain::ports::UserRepository) port with its error
//!   taxonomy.
//! - [`outbound::persistence`] provides the PostgreSQL adapter, the shared
//!   database handle, and connection settings.
//!
//! # Example
//!
//! ```no_run
//! use user_store::domain::ports::UserRepository;
//! use user_store::outbound::persistence::{ConnectionSettings, DbHandle, PostgresUserRepository};
//!
//! let settings = ConnectionSettings::new("postgresql://postgres@localhost/users");
//! let handle = DbHandle::connect(&settings)?;
//! handle.ping()?;
//!
//! let repository = PostgresUserRepository::new(handle.clone());
//! let user = repository.create("carol@example.com", "Carol Jones")?;
//! assert_eq!(repository.get_by_id(user.id)?.email, "carol@example.com");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
