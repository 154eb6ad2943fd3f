//! Port abstraction for user persistence adapters and their errors.

use std::fmt;

use crate::domain::User;

/// Low-level cause attached to repository errors.
///
/// Adapters box the driver error so callers can still downcast it, for
/// example to `postgres::Error`, without the domain depending on a driver.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Repository operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Primary key lookup.
    GetById,
    /// Alternate key lookup by email.
    GetByEmail,
    /// Row insertion.
    Create,
    /// Full replacement of email and name.
    Update,
    /// Row removal.
    Delete,
    /// Listing every row.
    List,
    /// Case-insensitive name pattern search.
    FindByNamePattern,
    /// Row count.
    CountUsers,
    /// Rows created within a trailing window of days.
    GetRecentUsers,
}

impl RepositoryOperation {
    /// Stable snake-case name used in messages and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetById => "get_by_id",
            Self::GetByEmail => "get_by_email",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::FindByNamePattern => "find_by_name_pattern",
            Self::CountUsers => "count_users",
            Self::GetRecentUsers => "get_recent_users",
        }
    }
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key used by an operation that targeted a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// Lookup by surrogate key.
    Id(i64),
    /// Lookup by unique email.
    Email(String),
}

impl fmt::Display for UserLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Email(email) => write!(f, "email {email}"),
        }
    }
}

/// Persistence errors raised by user repository adapters.
///
/// Every variant records the [`RepositoryOperation`] that failed. Variants
/// wrapping a store failure expose it through
/// [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    /// The targeted row does not exist.
    #[error("{operation}: user not found ({lookup})")]
    NotFound {
        /// Failing operation.
        operation: RepositoryOperation,
        /// Key that matched no row.
        lookup: UserLookup,
    },
    /// The write would break a uniqueness or required-field constraint.
    #[error("{operation}: constraint violation{}", constraint_suffix(.constraint.as_deref()))]
    ConstraintViolation {
        /// Failing operation.
        operation: RepositoryOperation,
        /// Name of the violated constraint when the store reports it.
        constraint: Option<String>,
        /// Store error.
        #[source]
        source: BoxedSource,
    },
    /// The store could not be reached or dropped the connection.
    #[error("{operation}: database connection failed")]
    Connectivity {
        /// Failing operation.
        operation: RepositoryOperation,
        /// Store error.
        #[source]
        source: BoxedSource,
    },
    /// Streaming a multi-row result failed after the query started.
    #[error("{operation}: failed while reading result rows")]
    Iteration {
        /// Failing operation.
        operation: RepositoryOperation,
        /// Store or decoding error.
        #[source]
        source: BoxedSource,
    },
    /// The statement failed for any other reason.
    #[error("{operation}: query failed")]
    Query {
        /// Failing operation.
        operation: RepositoryOperation,
        /// Store error.
        #[source]
        source: BoxedSource,
    },
    /// An argument was rejected before reaching the store.
    #[error("{operation}: invalid argument: {message}")]
    InvalidArgument {
        /// Failing operation.
        operation: RepositoryOperation,
        /// Why the argument was rejected.
        message: String,
    },
}

fn constraint_suffix(constraint: Option<&str>) -> String {
    constraint.map_or_else(String::new, |name| format!(" ({name})"))
}

impl UserRepositoryError {
    /// Construct a not-found error.
    pub const fn not_found(operation: RepositoryOperation, lookup: UserLookup) -> Self {
        Self::NotFound { operation, lookup }
    }

    /// Construct a constraint violation.
    pub fn constraint_violation(
        operation: RepositoryOperation,
        constraint: Option<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::ConstraintViolation {
            operation,
            constraint,
            source: source.into(),
        }
    }

    /// Construct a connectivity failure.
    pub fn connectivity(operation: RepositoryOperation, source: impl Into<BoxedSource>) -> Self {
        Self::Connectivity {
            operation,
            source: source.into(),
        }
    }

    /// Construct a row streaming failure.
    pub fn iteration(operation: RepositoryOperation, source: impl Into<BoxedSource>) -> Self {
        Self::Iteration {
            operation,
            source: source.into(),
        }
    }

    /// Construct a generic query failure.
    pub fn query(operation: RepositoryOperation, source: impl Into<BoxedSource>) -> Self {
        Self::Query {
            operation,
            source: source.into(),
        }
    }

    /// Construct an argument rejection.
    pub fn invalid_argument(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            message: message.into(),
        }
    }

    /// Operation that produced the error.
    pub const fn operation(&self) -> RepositoryOperation {
        match self {
            Self::NotFound { operation, .. }
            | Self::ConstraintViolation { operation, .. }
            | Self::Connectivity { operation, .. }
            | Self::Iteration { operation, .. }
            | Self::Query { operation, .. }
            | Self::InvalidArgument { operation, .. } => *operation,
        }
    }

    /// True when the operation targeted a row that does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the store rejected a write on a constraint.
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

/// Port for reading and writing user records.
///
/// Calls are synchronous and independent. Implementations hold no mutable
/// state of their own, so one instance may be shared across threads.
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by surrogate key.
    ///
    /// Returns [`UserRepositoryError::NotFound`] when no row matches.
    fn get_by_id(&self, id: i64) -> Result<User, UserRepositoryError>;

    /// Fetch a user by email.
    ///
    /// Returns [`UserRepositoryError::NotFound`] when no row matches.
    fn get_by_email(&self, email: &str) -> Result<User, UserRepositoryError>;

    /// Insert a user and return the stored row with its assigned id and
    /// creation time.
    fn create(&self, email: &str, name: &str) -> Result<User, UserRepositoryError>;

    /// Replace the email and name of an existing user.
    fn update(&self, id: i64, email: &str, name: &str) -> Result<(), UserRepositoryError>;

    /// Remove a user.
    fn delete(&self, id: i64) -> Result<(), UserRepositoryError>;

    /// Every user in ascending id order.
    fn list(&self) -> Result<Vec<User>, UserRepositoryError>;

    /// Users whose name matches a `LIKE` pattern, ignoring case, in ascending
    /// id order. The caller supplies the `%` and `_` wildcards.
    fn find_by_name_pattern(&self, pattern: &str) -> Result<Vec<User>, UserRepositoryError>;

    /// Total number of users.
    fn count_users(&self) -> Result<i64, UserRepositoryError>;

    /// Users created within the last `days` days of store time, newest first.
    fn get_recent_users(&self, days: u32) -> Result<Vec<User>, UserRepositoryError>;
}
