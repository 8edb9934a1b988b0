mod book;
mod rating;
mod review;

pub use book::{Book, BookPatch, NewBook};
pub use rating::{RatingRecord, RawRatingRow, RecommendedBook, RATING_BUCKETS};
pub use review::{
    average_rating, BookSummary, NewReview, Review, ReviewRequest, MAX_REVIEW_RATING,
    MIN_REVIEW_RATING,
};
