use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::review::ReviewSummary;

/// A full user row. The password hash never leaves the storage layer.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user shape returned by login, register and /me, including the
/// user's own reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviews: Vec<ReviewSummary>,
}
