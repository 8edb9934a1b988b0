pub mod books;
pub mod providers;
pub mod recommendation;

pub use providers::SummaryProvider;
pub use recommendation::{Recommendation, RecommendationEngine};
