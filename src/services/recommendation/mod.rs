//! Genre-based book recommendations
//!
//! The engine reads the ratings table once, cleans it into per-book average
//! ratings, and answers queries by genre substring match and a minimum
//! average rating. A random forest trained on the same table supplies the
//! expected rating of the matched genres as a secondary signal.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::{
    db::RatingsSource,
    error::{AppError, AppResult},
    models::{RatingRecord, RecommendedBook},
};

pub mod cleaning;
pub mod model;

pub use model::{GenreRatingModel, ModelSummary};

/// Lifecycle of the engine's cached state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Uninitialized,
    Loaded,
    Trained,
}

/// Answer to a recommendation query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Recommendation {
    Found {
        books: Vec<RecommendedBook>,
        /// Model estimate of the average rating for the matched genres
        predicted_rating: Option<f64>,
    },
    /// No book's genre contains the requested genre
    NoGenreMatch,
    /// The genre matched, but no book reached the minimum rating
    NoRatingMatch,
}

impl Recommendation {
    /// Names of the recommended books, empty for the no-result outcomes
    #[cfg(test)]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Recommendation::Found { books, .. } => books.iter().map(|b| b.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Point-in-time view of the engine for operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineReport {
    pub status: EngineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSummary>,
}

/// The cleaned ratings table as of one load
#[derive(Debug)]
pub struct RatingsSnapshot {
    pub records: Vec<RatingRecord>,
    pub dropped: usize,
    pub loaded_at: DateTime<Utc>,
    generation: u64,
}

#[derive(Default)]
struct EngineState {
    snapshot: Option<Arc<RatingsSnapshot>>,
    /// Model together with the snapshot generation it was fit on
    model: Option<(u64, Arc<GenreRatingModel>)>,
    generations: u64,
}

pub struct RecommendationEngine {
    source: Arc<dyn RatingsSource>,
    max_age: Option<Duration>,
    state: RwLock<EngineState>,
    /// Serializes reads of the source so concurrent first callers share one load
    load_guard: Mutex<()>,
    train_guard: Mutex<()>,
}

impl RecommendationEngine {
    pub fn new(source: Arc<dyn RatingsSource>) -> Self {
        Self {
            source,
            max_age: None,
            state: RwLock::new(EngineState::default()),
            load_guard: Mutex::new(()),
            train_guard: Mutex::new(()),
        }
    }

    /// Reload the table on the next use once it is older than `max_age`
    pub fn with_max_age(mut self, max_age: std::time::Duration) -> Self {
        self.max_age = Duration::from_std(max_age).ok();
        self
    }

    pub async fn status(&self) -> EngineStatus {
        self.report().await.status
    }

    /// Describes the loaded table and the model fit on it, without loading anything
    pub async fn report(&self) -> EngineReport {
        let state = self.state.read().await;
        let snapshot = state.snapshot.as_ref();
        let model = state
            .model
            .as_ref()
            .filter(|(generation, _)| snapshot.is_some_and(|s| s.generation == *generation))
            .map(|(_, model)| model.summary().clone());

        let status = match (snapshot, &model) {
            (None, _) => EngineStatus::Uninitialized,
            (Some(_), None) => EngineStatus::Loaded,
            (Some(_), Some(_)) => EngineStatus::Trained,
        };

        EngineReport {
            status,
            records: snapshot.map(|s| s.records.len()),
            dropped: snapshot.map(|s| s.dropped),
            loaded_at: snapshot.map(|s| s.loaded_at),
            model,
        }
    }

    fn is_fresh(&self, snapshot: &RatingsSnapshot) -> bool {
        match self.max_age {
            Some(max_age) => Utc::now() - snapshot.loaded_at <= max_age,
            None => true,
        }
    }

    async fn current_snapshot(&self) -> Option<Arc<RatingsSnapshot>> {
        let state = self.state.read().await;
        state
            .snapshot
            .as_ref()
            .filter(|snapshot| self.is_fresh(snapshot))
            .cloned()
    }

    /// Loads and cleans the ratings table once, reusing the result afterwards.
    ///
    /// Fails with `AppError::DataSource` if the table cannot be read.
    pub async fn load_data(&self) -> AppResult<Arc<RatingsSnapshot>> {
        if let Some(snapshot) = self.current_snapshot().await {
            return Ok(snapshot);
        }

        let _guard = self.load_guard.lock().await;

        // Another caller may have finished loading while we waited
        if let Some(snapshot) = self.current_snapshot().await {
            return Ok(snapshot);
        }

        self.reload().await
    }

    /// Re-reads the ratings table unconditionally and discards the trained model
    pub async fn refresh(&self) -> AppResult<Arc<RatingsSnapshot>> {
        let _guard = self.load_guard.lock().await;
        self.reload().await
    }

    /// Must be called with `load_guard` held
    async fn reload(&self) -> AppResult<Arc<RatingsSnapshot>> {
        let rows = self.source.fetch_all().await?;
        let raw_rows = rows.len();
        let cleaned = cleaning::clean(rows);

        let mut state = self.state.write().await;
        state.generations += 1;

        let snapshot = Arc::new(RatingsSnapshot {
            records: cleaned.records,
            dropped: cleaned.dropped,
            loaded_at: Utc::now(),
            generation: state.generations,
        });

        state.snapshot = Some(snapshot.clone());
        state.model = None;

        tracing::info!(
            raw_rows,
            records = snapshot.records.len(),
            dropped = snapshot.dropped,
            generation = snapshot.generation,
            "Ratings table loaded"
        );

        Ok(snapshot)
    }

    async fn fit(&self, snapshot: Arc<RatingsSnapshot>) -> AppResult<Arc<GenreRatingModel>> {
        let generation = snapshot.generation;
        let model = tokio::task::spawn_blocking(move || GenreRatingModel::train(&snapshot.records))
            .await
            .map_err(|e| AppError::Internal(format!("Training task failed: {}", e)))??;
        let model = Arc::new(model);

        let mut state = self.state.write().await;
        let still_current = state
            .snapshot
            .as_ref()
            .is_some_and(|current| current.generation == generation);
        if still_current {
            state.model = Some((generation, model.clone()));
        }

        Ok(model)
    }

    /// Fits a new model on the loaded table, replacing any held model
    pub async fn train_model(&self) -> AppResult<Arc<GenreRatingModel>> {
        let snapshot = self.load_data().await?;
        let _guard = self.train_guard.lock().await;
        self.fit(snapshot).await
    }

    /// Returns the model for the current table, training it on first use
    async fn ensure_trained(
        &self,
        snapshot: &Arc<RatingsSnapshot>,
    ) -> AppResult<Arc<GenreRatingModel>> {
        let held = |state: &EngineState| {
            state
                .model
                .as_ref()
                .filter(|(generation, _)| *generation == snapshot.generation)
                .map(|(_, model)| model.clone())
        };

        if let Some(model) = held(&*self.state.read().await) {
            return Ok(model);
        }

        let _guard = self.train_guard.lock().await;
        if let Some(model) = held(&*self.state.read().await) {
            return Ok(model);
        }

        self.fit(snapshot.clone()).await
    }

    /// Books whose genre contains `genre` (case-insensitively) and whose
    /// average rating is at least `min_rating`, in source order.
    pub async fn recommend_books(&self, genre: &str, min_rating: f64) -> AppResult<Recommendation> {
        let snapshot = self.load_data().await?;

        let model = if snapshot.records.is_empty() {
            None
        } else {
            match self.ensure_trained(&snapshot).await {
                Ok(model) => Some(model),
                Err(e) => {
                    tracing::warn!(error = %e, "Recommending without a trained model");
                    None
                }
            }
        };

        let genre = genre.to_lowercase();
        let genre_matches: Vec<&RatingRecord> = snapshot
            .records
            .iter()
            .filter(|record| {
                record
                    .genre
                    .as_deref()
                    .is_some_and(|stored| stored.contains(genre.as_str()))
            })
            .collect();

        if genre_matches.is_empty() {
            tracing::info!(genre = %genre, "No books found for genre");
            return Ok(Recommendation::NoGenreMatch);
        }

        let books: Vec<RecommendedBook> = genre_matches
            .iter()
            .filter(|record| record.average_rating >= min_rating)
            .map(|record| RecommendedBook {
                name: record.name.clone(),
            })
            .collect();

        if books.is_empty() {
            tracing::info!(
                genre = %genre,
                min_rating,
                genre_matches = genre_matches.len(),
                "No books met the minimum rating"
            );
            return Ok(Recommendation::NoRatingMatch);
        }

        let matched_genres: BTreeSet<&str> = genre_matches
            .iter()
            .filter_map(|record| record.genre.as_deref())
            .collect();
        let predicted_rating = model.and_then(|model| model.predict_mean(matched_genres));

        tracing::info!(
            genre = %genre,
            min_rating,
            recommended = books.len(),
            predicted_rating = ?predicted_rating,
            "Recommendations computed"
        );

        Ok(Recommendation::Found {
            books,
            predicted_rating,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ratings::MockRatingsSource;
    use crate::db::StaticRatingsSource;
    use crate::models::RawRatingRow;

    fn row(name: &str, genre: &str, dist: [f64; 5]) -> RawRatingRow {
        let cell = |v: f64| Some(v.to_string());
        RawRatingRow {
            name: Some(name.to_string()),
            genre: Some(genre.to_string()),
            rating: Some("4.0".to_string()),
            rating_dist1: cell(dist[0]),
            rating_dist2: cell(dist[1]),
            rating_dist3: cell(dist[2]),
            rating_dist4: cell(dist[3]),
            rating_dist5: cell(dist[4]),
        }
    }

    fn engine_with(rows: Vec<RawRatingRow>) -> RecommendationEngine {
        RecommendationEngine::new(Arc::new(StaticRatingsSource::new(rows)))
    }

    fn two_fantasy_books() -> Vec<RawRatingRow> {
        vec![
            row("Book A", "Fantasy", [5.0; 5]),
            row("Book B", "Fantasy", [1.0; 5]),
        ]
    }

    #[tokio::test]
    async fn test_recommends_books_above_threshold() {
        let engine = engine_with(two_fantasy_books());

        let result = engine.recommend_books("fantasy", 3.0).await.unwrap();

        assert_eq!(result.names(), vec!["Book A"]);
        assert!(matches!(
            result,
            Recommendation::Found {
                predicted_rating: Some(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_genre_match_is_case_insensitive_substring() {
        let engine = engine_with(vec![
            row("The Hobbit", "Fantasy Fiction", [4.0; 5]),
            row("Dracula", "Horror", [4.0; 5]),
        ]);

        let result = engine.recommend_books("FANTASY", 0.0).await.unwrap();
        assert_eq!(result.names(), vec!["The Hobbit"]);
    }

    #[tokio::test]
    async fn test_unknown_genre_is_no_genre_match() {
        let engine = engine_with(two_fantasy_books());

        let result = engine.recommend_books("unknown-genre-xyz", 0.0).await.unwrap();
        assert_eq!(result, Recommendation::NoGenreMatch);
    }

    #[tokio::test]
    async fn test_threshold_above_all_data_is_no_rating_match() {
        let engine = engine_with(two_fantasy_books());

        let result = engine.recommend_books("fantasy", 999.0).await.unwrap();
        assert_eq!(result, Recommendation::NoRatingMatch);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let engine = engine_with(vec![row("Exactly Three", "Poetry", [1.0, 2.0, 3.0, 4.0, 5.0])]);

        let result = engine.recommend_books("poetry", 3.0).await.unwrap();
        assert_eq!(result.names(), vec!["Exactly Three"]);
    }

    #[tokio::test]
    async fn test_results_keep_source_order() {
        let engine = engine_with(vec![
            row("Zeta", "Fantasy", [4.0; 5]),
            row("Alpha", "Fantasy", [4.5; 5]),
            row("Mid", "Fantasy", [4.2; 5]),
        ]);

        let result = engine.recommend_books("fantasy", 4.0).await.unwrap();
        assert_eq!(result.names(), vec!["Zeta", "Alpha", "Mid"]);
    }

    #[tokio::test]
    async fn test_dirty_rows_never_recommended() {
        let mut malformed = row("Malformed", "Fantasy", [5.0; 5]);
        malformed.rating_dist3 = Some("5:1024".to_string());
        let mut unrated = row("Unrated", "Fantasy", [5.0; 5]);
        unrated.rating = None;

        let engine = engine_with(vec![malformed, unrated, row("Clean", "Fantasy", [5.0; 5])]);

        let result = engine.recommend_books("fantasy", 0.0).await.unwrap();
        assert_eq!(result.names(), vec!["Clean"]);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let mut source = MockRatingsSource::new();
        source
            .expect_fetch_all()
            .times(1)
            .returning(|| Ok(two_fantasy_books()));
        let engine = RecommendationEngine::new(Arc::new(source));

        let first = engine.load_data().await.unwrap();
        let second = engine.load_data().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.records.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let mut source = MockRatingsSource::new();
        source
            .expect_fetch_all()
            .times(1)
            .returning(|| Ok(two_fantasy_books()));
        let engine = Arc::new(RecommendationEngine::new(Arc::new(source)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.recommend_books("fantasy", 3.0).await })
            })
            .collect();

        for task in tasks {
            let result = task.await.unwrap().unwrap();
            assert_eq!(result.names(), vec!["Book A"]);
        }
    }

    #[tokio::test]
    async fn test_unreachable_source_is_data_source_error() {
        let mut source = MockRatingsSource::new();
        source
            .expect_fetch_all()
            .returning(|| Err(AppError::DataSource("connection refused".to_string())));
        let engine = RecommendationEngine::new(Arc::new(source));

        let result = engine.recommend_books("fantasy", 3.0).await;
        assert!(matches!(result, Err(AppError::DataSource(_))));
        assert_eq!(engine.status().await, EngineStatus::Uninitialized);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let engine = engine_with(two_fantasy_books());
        assert_eq!(engine.status().await, EngineStatus::Uninitialized);

        engine.load_data().await.unwrap();
        assert_eq!(engine.status().await, EngineStatus::Loaded);

        engine.train_model().await.unwrap();
        assert_eq!(engine.status().await, EngineStatus::Trained);

        engine.load_data().await.unwrap();
        assert_eq!(engine.status().await, EngineStatus::Trained);
    }

    #[tokio::test]
    async fn test_refresh_rereads_source_and_drops_model() {
        let mut source = MockRatingsSource::new();
        source
            .expect_fetch_all()
            .times(2)
            .returning(|| Ok(two_fantasy_books()));
        let engine = RecommendationEngine::new(Arc::new(source));

        engine.train_model().await.unwrap();
        assert_eq!(engine.status().await, EngineStatus::Trained);

        let refreshed = engine.refresh().await.unwrap();
        assert_eq!(refreshed.records.len(), 2);
        assert_eq!(engine.status().await, EngineStatus::Loaded);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_reloaded() {
        let mut source = MockRatingsSource::new();
        source
            .expect_fetch_all()
            .times(2)
            .returning(|| Ok(two_fantasy_books()));
        let engine = RecommendationEngine::new(Arc::new(source))
            .with_max_age(std::time::Duration::from_millis(0));

        let first = engine.load_data().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = engine.load_data().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_first_query_on_large_table_returns_promptly() {
        let rows: Vec<RawRatingRow> = (0..5_000)
            .map(|i| {
                let rating = (i % 5 + 1) as f64;
                row(&format!("Book {i}"), &format!("Genre {:03}", i % 400), [rating; 5])
            })
            .collect();
        let engine = engine_with(rows);

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            engine.recommend_books("genre 007", 3.0),
        )
        .await
        .expect("first query did not return in time")
        .unwrap();

        assert!(matches!(
            result,
            Recommendation::Found {
                predicted_rating: Some(_),
                ..
            }
        ));
        assert_eq!(result.names().len(), 13);
    }

    #[tokio::test]
    async fn test_model_fit_on_replaced_table_is_not_installed() {
        let engine = engine_with(two_fantasy_books());
        let replaced = engine.load_data().await.unwrap();

        // The table is reloaded before the fit on the old one completes
        engine.refresh().await.unwrap();
        let model = engine.fit(replaced).await.unwrap();

        assert!(model.predict_mean(["fantasy"]).is_some());
        assert_eq!(engine.status().await, EngineStatus::Loaded);
        assert_eq!(engine.report().await.model, None);

        engine.train_model().await.unwrap();
        assert_eq!(engine.status().await, EngineStatus::Trained);
    }

    #[tokio::test]
    async fn test_report_describes_table_and_model() {
        let engine = engine_with(two_fantasy_books());

        let report = engine.report().await;
        assert_eq!(report.status, EngineStatus::Uninitialized);
        assert_eq!(report.records, None);

        engine.recommend_books("fantasy", 3.0).await.unwrap();

        let report = engine.report().await;
        assert_eq!(report.status, EngineStatus::Trained);
        assert_eq!(report.records, Some(2));
        assert_eq!(report.dropped, Some(0));
        let model = report.model.unwrap();
        assert_eq!(model.genres, 1);
        assert_eq!(model.samples, 2);
    }

    #[tokio::test]
    async fn test_empty_table_is_no_genre_match() {
        let engine = engine_with(Vec::new());

        let result = engine.recommend_books("fantasy", 0.0).await.unwrap();
        assert_eq!(result, Recommendation::NoGenreMatch);
        assert_eq!(engine.status().await, EngineStatus::Loaded);
    }

    #[test]
    fn test_outcome_serialization() {
        let found = Recommendation::Found {
            books: vec![RecommendedBook {
                name: "Book A".to_string(),
            }],
            predicted_rating: None,
        };
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["outcome"], "found");
        assert_eq!(json["books"][0]["name"], "Book A");

        let json = serde_json::to_value(Recommendation::NoGenreMatch).unwrap();
        assert_eq!(json["outcome"], "no_genre_match");

        let json = serde_json::to_value(Recommendation::NoRatingMatch).unwrap();
        assert_eq!(json["outcome"], "no_rating_match");
    }
}
