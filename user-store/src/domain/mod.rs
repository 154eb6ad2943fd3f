//! Domain entities and ports for user persistence.
//!
//! Nothing in this module knows about PostgreSQL. Adapters in
//! [`crate::outbound`] implement the ports and translate store failures into
//! [`ports::UserRepositoryError`].

pub mod ports;
pub mod user;

pub use self::user::User;
