//! Test utilities for the user store.
//!
//! Compiled for unit tests and, through the `test-support` feature, for the
//! integration suites under `tests/`.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::domain::User;
use crate::domain::ports::{UserRepository, UserRepositoryError};

/// Create a user, run `body` with it, then delete it.
///
/// The delete runs whether `body` returns or panics. A panic is re-raised
/// after cleanup. A row already removed by `body` is not an error.
///
/// # Errors
///
/// Returns the creation error without running `body`, or the cleanup error
/// when `body` returned normally but the row could not be removed.
///
/// # Examples
///
/// ```no_run
/// use user_store::domain::ports::UserRepository;
/// use user_store::outbound::persistence::{ConnectionSettings, DbHandle, PostgresUserRepository};
/// use user_store::test_support::with_created_user;
///
/// let handle = DbHandle::connect(&ConnectionSettings::new("postgresql://localhost/users"))?;
/// let repository = PostgresUserRepository::new(handle);
///
/// let email = with_created_user(&repository, "temp@example.com", "Temporary User", |user| {
///     user.email.clone()
/// })?;
/// assert_eq!(email, "temp@example.com");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn with_created_user<R, T>(
    repository: &R,
    email: &str,
    name: &str,
    body: impl FnOnce(&User) -> T,
) -> Result<T, UserRepositoryError>
where
    R: UserRepository + ?Sized,
{
    let user = repository.create(email, name)?;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&user)));
    let cleanup = remove_user(repository, user.id);

    match outcome {
        Ok(value) => cleanup.map(|()| value),
        Err(payload) => {
            if let Err(error) = cleanup {
                warn!(id = user.id, %error, "cleanup failed after test body panicked");
            }
            panic::resume_unwind(payload)
        }
    }
}

fn remove_user<R>(repository: &R, id: i64) -> Result<(), UserRepositoryError>
where
    R: UserRepository + ?Sized,
{
    match repository.delete(id) {
        Err(error) if error.is_not_found() => {
            debug!(id, "scoped user already removed");
            Ok(())
        }
        other => other,
    }
}
