use serde::Serialize;

/// Number of rating-distribution buckets in the ratings table
pub const RATING_BUCKETS: usize = 5;

/// A row of the ratings table exactly as stored. Every column is read as text
/// so that malformed values can be discarded during cleaning.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct RawRatingRow {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<String>,
    pub rating_dist1: Option<String>,
    pub rating_dist2: Option<String>,
    pub rating_dist3: Option<String>,
    pub rating_dist4: Option<String>,
    pub rating_dist5: Option<String>,
}

impl RawRatingRow {
    pub fn distribution(&self) -> [Option<&str>; RATING_BUCKETS] {
        [
            self.rating_dist1.as_deref(),
            self.rating_dist2.as_deref(),
            self.rating_dist3.as_deref(),
            self.rating_dist4.as_deref(),
            self.rating_dist5.as_deref(),
        ]
    }
}

/// A cleaned ratings row with its derived average
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingRecord {
    pub name: String,
    /// Lower-cased; `None` when the source had no genre
    pub genre: Option<String>,
    pub rating_distribution: [f64; RATING_BUCKETS],
    pub average_rating: f64,
}

/// A single recommended book
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedBook {
    pub name: String,
}
