use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::RawRatingRow,
};

/// Bulk read access to the externally loaded ratings table
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingsSource: Send + Sync {
    /// Reads every row of the table in source order.
    ///
    /// Any failure to reach the table is reported as `AppError::DataSource`.
    async fn fetch_all(&self) -> AppResult<Vec<RawRatingRow>>;
}

/// Ratings table stored in Postgres, as produced by the CSV bulk loader
#[derive(Clone)]
pub struct PgRatingsSource {
    pool: PgPool,
    query: String,
}

impl PgRatingsSource {
    /// Creates a source reading from `table`.
    ///
    /// The table name is spliced into SQL, so only plain identifiers are accepted.
    pub fn new(pool: PgPool, table: &str) -> AppResult<Self> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table.starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(AppError::InvalidInput(format!(
                "Invalid ratings table name: {:?}",
                table
            )));
        }

        // The loader keeps the CSV headers as quoted column names and may store
        // numbers as text, so everything is cast and coerced after reading.
        let query = format!(
            r#"
            SELECT "Name"::text AS name,
                   "Genre"::text AS genre,
                   "Rating"::text AS rating,
                   "RatingDist1"::text AS rating_dist1,
                   "RatingDist2"::text AS rating_dist2,
                   "RatingDist3"::text AS rating_dist3,
                   "RatingDist4"::text AS rating_dist4,
                   "RatingDist5"::text AS rating_dist5
            FROM "{table}"
            "#
        );

        Ok(Self { pool, query })
    }
}

#[async_trait::async_trait]
impl RatingsSource for PgRatingsSource {
    async fn fetch_all(&self) -> AppResult<Vec<RawRatingRow>> {
        sqlx::query_as::<_, RawRatingRow>(&self.query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to read ratings table");
                AppError::DataSource(e.to_string())
            })
    }
}

/// Fixed set of rows held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticRatingsSource {
    rows: Vec<RawRatingRow>,
}

impl StaticRatingsSource {
    pub fn new(rows: Vec<RawRatingRow>) -> Self {
        Self { rows }
    }
}

#[async_trait::async_trait]
impl RatingsSource for StaticRatingsSource {
    async fn fetch_all(&self) -> AppResult<Vec<RawRatingRow>> {
        Ok(self.rows.clone())
    }
}
