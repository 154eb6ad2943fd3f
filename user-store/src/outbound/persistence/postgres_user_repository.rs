//! PostgreSQL-backed `UserRepository` adapter.
//!
//! Every statement is parameterized, including numeric values such as the
//! day window for recent users. Multi-row reads stream through a `RowIter`
//! that is released on every exit path when it goes out of scope.

use postgres::fallible_iterator::FallibleIterator;
use postgres::types::ToSql;
use postgres::{Client, Row};
use tracing::debug;

use crate::domain::User;
use crate::domain::ports::{RepositoryOperation, UserLookup, UserRepository, UserRepositoryError};

use super::error_mapping::{map_iteration_error, map_postgres_error};
use super::handle::DbHandle;

const SELECT_BY_ID: &str = "SELECT id, email, name, created_at FROM users WHERE id = $1";
const SELECT_BY_EMAIL: &str = "SELECT id, email, name, created_at FROM users WHERE email = $1";
const INSERT_USER: &str = concat!(
    "INSERT INTO users (email, name) ",
    "VALUES ($1, $2) ",
    "RETURNING id, email, name, created_at"
);
const UPDATE_USER: &str = "UPDATE users SET email = $1, name = $2 WHERE id = $3";
const DELETE_USER: &str = "DELETE FROM users WHERE id = $1";
const SELECT_ALL: &str = "SELECT id, email, name, created_at FROM users ORDER BY id";
const SELECT_BY_NAME_PATTERN: &str =
    "SELECT id, email, name, created_at FROM users WHERE name ILIKE $1 ORDER BY id";
const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";
const SELECT_RECENT: &str = concat!(
    "SELECT id, email, name, created_at ",
    "FROM users ",
    "WHERE NOW() - created_at <= make_interval(days => $1) ",
    "ORDER BY created_at DESC, id DESC"
);

/// PostgreSQL implementation of [`UserRepository`].
///
/// # Examples
///
/// ```no_run
/// use user_store::domain::ports::UserRepository;
/// use user_store::outbound::persistence::{ConnectionSettings, DbHandle, PostgresUserRepository};
///
/// let handle = DbHandle::connect(&ConnectionSettings::new("postgresql://localhost/users"))?;
/// let repository = PostgresUserRepository::new(handle);
///
/// for user in repository.find_by_name_pattern("%smith%")? {
///     println!("{} <{}>", user.name, user.email);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    handle: DbHandle,
}

impl PostgresUserRepository {
    /// Create a repository over an open handle.
    pub const fn new(handle: DbHandle) -> Self {
        Self { handle }
    }

    fn fetch_one(
        &self,
        operation: RepositoryOperation,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
        lookup: impl FnOnce() -> UserLookup,
    ) -> Result<User, UserRepositoryError> {
        let row = self
            .handle
            .with_client(|client| client.query_opt(statement, params))
            .map_err(|error| map_postgres_error(operation, error))?
            .ok_or_else(|| UserRepositoryError::not_found(operation, lookup()))?;
        user_from_row(&row).map_err(|error| map_postgres_error(operation, error))
    }

    fn fetch_all(
        &self,
        operation: RepositoryOperation,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<User>, UserRepositoryError> {
        self.handle
            .with_client(|client| collect_users(client, operation, statement, params))
    }

    fn execute_on_existing(
        &self,
        operation: RepositoryOperation,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
        id: i64,
    ) -> Result<(), UserRepositoryError> {
        let affected = self
            .handle
            .with_client(|client| client.execute(statement, params))
            .map_err(|error| map_postgres_error(operation, error))?;
        if affected == 0 {
            return Err(UserRepositoryError::not_found(
                operation,
                UserLookup::Id(id),
            ));
        }
        debug!(%operation, id, "user row changed");
        Ok(())
    }
}

/// Stream rows into users. The iterator is dropped, and its portal closed,
/// whether the loop completes or returns early.
fn collect_users(
    client: &mut Client,
    operation: RepositoryOperation,
    statement: &str,
    params: &[&(dyn ToSql + Sync)],
) -> Result<Vec<User>, UserRepositoryError> {
    let mut rows = client
        .query_raw(statement, params.iter().copied())
        .map_err(|error| map_postgres_error(operation, error))?;

    let mut users = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|error| map_iteration_error(operation, error))?
    {
        users.push(user_from_row(&row).map_err(|error| map_iteration_error(operation, error))?);
    }
    Ok(users)
}

fn user_from_row(row: &Row) -> Result<User, postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

impl UserRepository for PostgresUserRepository {
    fn get_by_id(&self, id: i64) -> Result<User, UserRepositoryError> {
        self.fetch_one(RepositoryOperation::GetById, SELECT_BY_ID, &[&id], || {
            UserLookup::Id(id)
        })
    }

    fn get_by_email(&self, email: &str) -> Result<User, UserRepositoryError> {
        self.fetch_one(
            RepositoryOperation::GetByEmail,
            SELECT_BY_EMAIL,
            &[&email],
            || UserLookup::Email(email.to_owned()),
        )
    }

    fn create(&self, email: &str, name: &str) -> Result<User, UserRepositoryError> {
        let operation = RepositoryOperation::Create;
        let row = self
            .handle
            .with_client(|client| client.query_one(INSERT_USER, &[&email, &name]))
            .map_err(|error| map_postgres_error(operation, error))?;
        let user = user_from_row(&row).map_err(|error| map_postgres_error(operation, error))?;
        debug!(id = user.id, "created user");
        Ok(user)
    }

    fn update(&self, id: i64, email: &str, name: &str) -> Result<(), UserRepositoryError> {
        self.execute_on_existing(
            RepositoryOperation::Update,
            UPDATE_USER,
            &[&email, &name, &id],
            id,
        )
    }

    fn delete(&self, id: i64) -> Result<(), UserRepositoryError> {
        self.execute_on_existing(RepositoryOperation::Delete, DELETE_USER, &[&id], id)
    }

    fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        self.fetch_all(RepositoryOperation::List, SELECT_ALL, &[])
    }

    fn find_by_name_pattern(&self, pattern: &str) -> Result<Vec<User>, UserRepositoryError> {
        self.fetch_all(
            RepositoryOperation::FindByNamePattern,
            SELECT_BY_NAME_PATTERN,
            &[&pattern],
        )
    }

    fn count_users(&self) -> Result<i64, UserRepositoryError> {
        let operation = RepositoryOperation::CountUsers;
        let row = self
            .handle
            .with_client(|client| client.query_one(COUNT_USERS, &[]))
            .map_err(|error| map_postgres_error(operation, error))?;
        row.try_get(0)
            .map_err(|error| map_postgres_error(operation, error))
    }

    /// A zero-day window is rejected rather than answered with an empty list,
    /// as is any window wider than the store's `int4` interval argument.
    ///
    /// The window is compared as an interval. Shifting `NOW()` back by the
    /// whole window would leave the `timestamptz` range for large day counts.
    fn get_recent_users(&self, days: u32) -> Result<Vec<User>, UserRepositoryError> {
        let operation = RepositoryOperation::GetRecentUsers;
        if days == 0 {
            return Err(UserRepositoryError::invalid_argument(
                operation,
                "days must be at least 1",
            ));
        }
        let days = i32::try_from(days).map_err(|_| {
            UserRepositoryError::invalid_argument(
                operation,
                format!("days must not exceed {}", i32::MAX),
            )
        })?;
        self.fetch_all(operation, SELECT_RECENT, &[&days])
    }
}
