use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::book::BookStats;

/// A review row as listed by GET /reviews and GET /reviews/{id}, joined
/// with its author's name and the book's aggregate stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    pub id: i64,
    pub isbn: String,
    pub user_id: i64,
    pub title: String,
    pub author: String,
    pub rating: i64,
    pub review: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: ReviewAuthor,
    pub book: BookStats,
    pub is_review_given: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub first_name: String,
    pub last_name: String,
}

/// The compact shape embedded in a user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub rating: i64,
    pub review: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
