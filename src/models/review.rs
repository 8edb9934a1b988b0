use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MIN_REVIEW_RATING: f64 = 1.0;
pub const MAX_REVIEW_RATING: f64 = 5.0;

/// A user's review of a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub book_id: i64,
    pub user_id: i64,
    pub review_text: String,
    pub rating: f64,
}

/// Review payload as posted by the client; the book comes from the path
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub user_id: i64,
    pub review_text: String,
    pub rating: f64,
}

/// A review ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub book_id: i64,
    pub user_id: i64,
    pub review_text: String,
    pub rating: f64,
}

impl ReviewRequest {
    pub fn for_book(self, book_id: i64) -> NewReview {
        NewReview {
            book_id,
            user_id: self.user_id,
            review_text: self.review_text,
            rating: self.rating,
        }
    }
}

impl NewReview {
    pub fn validate(&self) -> AppResult<()> {
        if !(MIN_REVIEW_RATING..=MAX_REVIEW_RATING).contains(&self.rating) {
            return Err(AppError::InvalidInput(format!(
                "rating must be between {} and {}, got {}",
                MIN_REVIEW_RATING, MAX_REVIEW_RATING, self.rating
            )));
        }
        Ok(())
    }
}

/// Summary text of a book together with its aggregated review rating
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookSummary {
    pub book_id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub average_review_rating: Option<f64>,
    pub review_count: usize,
}

/// Mean rating across reviews, `None` when there are none
pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: f64 = reviews.iter().map(|r| r.rating).sum();
    Some(total / reviews.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: f64) -> Review {
        Review {
            id: 1,
            book_id: 1,
            user_id: 42,
            review_text: "Loved it".to_string(),
            rating,
        }
    }

    #[test]
    fn test_average_rating() {
        let reviews = vec![review(4.0), review(5.0), review(3.0)];
        assert_eq!(average_rating(&reviews), Some(4.0));
    }

    #[test]
    fn test_average_rating_without_reviews() {
        assert_eq!(average_rating(&[]), None);
    }

    #[test]
    fn test_rating_out_of_range_is_rejected() {
        let new_review = ReviewRequest {
            user_id: 7,
            review_text: "Meh".to_string(),
            rating: 6.5,
        }
        .for_book(3);

        assert_eq!(new_review.book_id, 3);
        assert!(matches!(new_review.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rating_bounds_are_inclusive() {
        for rating in [MIN_REVIEW_RATING, MAX_REVIEW_RATING] {
            let new_review = NewReview {
                book_id: 1,
                user_id: 1,
                review_text: String::new(),
                rating,
            };
            assert!(new_review.validate().is_ok());
        }
    }
}
