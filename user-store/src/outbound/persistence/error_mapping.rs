//! Mapping from `postgres` driver errors to repository errors.

use std::error::Error as _;
use std::io;

use postgres::error::{DbError, SqlState};
use tracing::debug;

use crate::domain::ports::{RepositoryOperation, UserRepositoryError};

/// Broad category of a statement failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FailureClass {
    Constraint,
    Connectivity,
    Query,
}

/// Classify a failure from its SQLSTATE and whether the connection is gone.
pub(super) fn classify(code: Option<&SqlState>, connection_lost: bool) -> FailureClass {
    if connection_lost {
        return FailureClass::Connectivity;
    }
    let Some(code) = code else {
        return FailureClass::Query;
    };
    if *code == SqlState::UNIQUE_VIOLATION
        || *code == SqlState::NOT_NULL_VIOLATION
        || *code == SqlState::CHECK_VIOLATION
    {
        return FailureClass::Constraint;
    }
    if code.code().starts_with("08")
        || *code == SqlState::ADMIN_SHUTDOWN
        || *code == SqlState::CRASH_SHUTDOWN
        || *code == SqlState::CANNOT_CONNECT_NOW
    {
        return FailureClass::Connectivity;
    }
    FailureClass::Query
}

fn connection_lost(error: &postgres::Error) -> bool {
    error.is_closed() || error.source().is_some_and(|source| source.is::<io::Error>())
}

/// Map a failed statement into the matching repository error.
pub(super) fn map_postgres_error(
    operation: RepositoryOperation,
    error: postgres::Error,
) -> UserRepositoryError {
    let class = classify(error.code(), connection_lost(&error));
    debug!(
        %operation,
        sqlstate = error.code().map(SqlState::code),
        ?class,
        %error,
        "postgres operation failed"
    );

    match class {
        FailureClass::Constraint => {
            let constraint = error
                .as_db_error()
                .and_then(DbError::constraint)
                .map(str::to_owned);
            UserRepositoryError::constraint_violation(operation, constraint, error)
        }
        FailureClass::Connectivity => UserRepositoryError::connectivity(operation, error),
        FailureClass::Query => UserRepositoryError::query(operation, error),
    }
}

/// Map a failure raised while streaming or decoding result rows.
pub(super) fn map_iteration_error(
    operation: RepositoryOperation,
    error: postgres::Error,
) -> UserRepositoryError {
    debug!(%operation, %error, "postgres row iteration failed");
    UserRepositoryError::iteration(operation, error)
}
