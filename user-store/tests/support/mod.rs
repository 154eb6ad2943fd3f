//! Shared helper utilities for user store integration tests.
//!
//! Integration tests compile as separate crates under `tests/`, which makes it
//! awkward to share helpers without copy/paste. Each suite declares
//! `mod support;` and picks what it needs.

pub mod atexit_cleanup;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::TestDatabase;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test-writer tracing subscriber once per test binary.
///
/// Honours `RUST_LOG`; defaults to `user_store=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("user_store=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Render a `postgres` error with enough detail to be useful in CI logs.
///
/// The `postgres::Error` `Display` implementation often collapses database
/// errors to a generic `db error`, which hides the message and SQLSTATE.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {}: {}",
        db_error.code().code(),
        db_error.message()
    );

    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }

    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }

    summary
}
