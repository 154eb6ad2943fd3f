//! User data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user record.
///
/// `id` and `created_at` are assigned by the store when the row is inserted
/// and never change afterwards. `email` is unique across live rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Unique address, usable as an alternate lookup key.
    pub email: String,
    /// Free-text display name.
    pub name: String,
    /// Creation instant taken from the store clock.
    pub created_at: DateTime<Utc>,
}
