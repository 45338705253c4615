use serde::{Deserialize, Serialize};

/// Running totals for one ISBN. `average_rating` is derived on read and
/// absent while the book has no reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub total_rating: i64,
    pub total_reviews: i64,
    pub average_rating: Option<f64>,
}

impl BookStats {
    pub fn new(total_rating: i64, total_reviews: i64) -> Self {
        let average_rating = if total_reviews > 0 {
            Some((total_rating as f64 / total_reviews as f64 * 100.0).round() / 100.0)
        } else {
            None
        };
        Self {
            total_rating,
            total_reviews,
            average_rating,
        }
    }
}
