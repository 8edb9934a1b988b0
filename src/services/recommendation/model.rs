use std::collections::{BTreeMap, BTreeSet};

use aprender::model_selection::train_test_split;
use aprender::primitives::{Matrix, Vector};
use aprender::tree::RandomForestRegressor;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::RatingRecord,
};

const N_ESTIMATORS: usize = 100;
const RANDOM_STATE: u64 = 42;
const TEST_SIZE: f32 = 0.2;

/// Maps each distinct genre to an integer id in sorted order.
///
/// Ids depend on the genres present at fit time and change between fits.
#[derive(Debug, Clone, PartialEq)]
struct GenreEncoder {
    classes: Vec<String>,
}

impl GenreEncoder {
    fn fit<'a>(genres: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: BTreeSet<&str> = genres.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    fn encode(&self, genre: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(genre))
            .ok()
    }

    fn len(&self) -> usize {
        self.classes.len()
    }
}

/// Facts about a trained model, as reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    /// Distinct genres the forest was fit on
    pub genres: usize,
    /// Rating records those genres cover
    pub samples: usize,
    /// R² on the held-out genres; `None` when there were too few to split
    pub holdout_r2: Option<f32>,
    pub trained_at: DateTime<Utc>,
}

/// Random forest predicting a book's average rating from its genre
pub struct GenreRatingModel {
    encoder: GenreEncoder,
    forest: RandomForestRegressor,
    summary: ModelSummary,
}

impl std::fmt::Debug for GenreRatingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenreRatingModel")
            .field("summary", &self.summary)
            .finish()
    }
}

impl GenreRatingModel {
    /// Fits the forest on one sample per genre, targeting the genre's mean
    /// average rating.
    ///
    /// Training cost follows the number of genres, not the table size. An
    /// 80/20 split of the genres is used to report a holdout score. Too few
    /// genres to split are fit whole.
    pub fn train(records: &[RatingRecord]) -> AppResult<Self> {
        let mut by_genre: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for record in records {
            if let Some(genre) = record.genre.as_deref() {
                let entry = by_genre.entry(genre).or_insert((0.0, 0));
                entry.0 += record.average_rating;
                entry.1 += 1;
            }
        }

        if by_genre.is_empty() {
            return Err(AppError::Training(
                "No rating records with a genre to train on".to_string(),
            ));
        }

        let samples: usize = by_genre.values().map(|(_, count)| count).sum();
        let encoder = GenreEncoder::fit(by_genre.keys().copied());

        // BTreeMap iteration order matches the encoder's sorted ids
        let (codes, targets): (Vec<f32>, Vec<f32>) = by_genre
            .values()
            .enumerate()
            .map(|(code, (sum, count))| (code as f32, (sum / *count as f64) as f32))
            .unzip();
        let genres = codes.len();

        let x = Matrix::from_vec(genres, 1, codes).map_err(|e| AppError::Training(e.to_string()))?;
        let y = Vector::from_slice(&targets);

        let mut forest = RandomForestRegressor::new(N_ESTIMATORS).with_random_state(RANDOM_STATE);

        let holdout_r2 = match train_test_split(&x, &y, TEST_SIZE, Some(RANDOM_STATE)) {
            Ok((x_train, x_test, y_train, y_test)) => {
                forest
                    .fit(&x_train, &y_train)
                    .map_err(|e| AppError::Training(e.to_string()))?;
                Some(forest.score(&x_test, &y_test))
            }
            Err(reason) => {
                tracing::debug!(genres, reason = %reason, "Holdout split skipped, fitting all genres");
                forest
                    .fit(&x, &y)
                    .map_err(|e| AppError::Training(e.to_string()))?;
                None
            }
        };

        tracing::info!(
            samples,
            genres,
            holdout_r2 = ?holdout_r2,
            "Genre rating model trained"
        );

        Ok(Self {
            encoder,
            forest,
            summary: ModelSummary {
                genres,
                samples,
                holdout_r2,
                trained_at: Utc::now(),
            },
        })
    }

    /// Mean predicted rating across the given genres.
    ///
    /// Genres unseen during training are ignored; `None` if none are known.
    pub fn predict_mean<'a>(&self, genres: impl IntoIterator<Item = &'a str>) -> Option<f64> {
        let codes: Vec<f32> = genres
            .into_iter()
            .filter_map(|genre| self.encoder.encode(genre))
            .map(|code| code as f32)
            .collect();

        if codes.is_empty() {
            return None;
        }

        let x = Matrix::from_vec(codes.len(), 1, codes).ok()?;
        let predictions = self.forest.predict(&x);
        let values = predictions.as_slice();

        Some(values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64)
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }
}
