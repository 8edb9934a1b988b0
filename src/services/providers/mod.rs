//! Text-generation providers used to write book summaries
//!
//! The model is an opaque capability: a prompt goes in, text comes out.
//! Providers are pluggable so the HTTP backend can be wrapped with a cache
//! or swapped for a mock in tests.

use crate::error::AppResult;

pub mod cached;
pub mod text_generation;

pub use cached::CachedSummaryProvider;
pub use text_generation::TextGenerationProvider;

/// Trait for summary providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Generates text continuing `prompt`.
    ///
    /// Failures are returned as-is; callers decide whether they are fatal.
    async fn generate(&self, prompt: &str) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
