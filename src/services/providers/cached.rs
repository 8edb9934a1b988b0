use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    services::providers::SummaryProvider,
};

/// Wraps a provider so that text generated for a prompt is reused from Redis
pub struct CachedSummaryProvider {
    inner: Arc<dyn SummaryProvider>,
    cache: Cache,
    ttl: u64,
}

impl CachedSummaryProvider {
    pub fn new(inner: Arc<dyn SummaryProvider>, cache: Cache, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait::async_trait]
impl SummaryProvider for CachedSummaryProvider {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        cached!(
            self.cache,
            CacheKey::Summary(prompt.to_string()),
            self.ttl,
            async move {
                tracing::debug!(provider = self.inner.name(), "Summary cache miss");
                self.inner.generate(prompt).await
            }
        )
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_redis_client;
    use crate::services::providers::MockSummaryProvider;

    #[tokio::test]
    async fn test_unreachable_cache_falls_back_to_provider() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);

        let mut mock = MockSummaryProvider::new();
        mock.expect_generate()
            .withf(|prompt: &str| prompt == "The book Dune by Frank Herbert")
            .times(1)
            .returning(|_| Ok("A desert planet".to_string()));
        mock.expect_name().return_const("mock");

        let provider = CachedSummaryProvider::new(Arc::new(mock), cache, 60);

        let summary = provider.generate("The book Dune by Frank Herbert").await;
        assert_eq!(summary.unwrap(), "A desert planet");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_second_generation_is_served_from_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        let (cache, _handle) = Cache::new(client);

        let prompt = format!("cached provider test {}", uuid::Uuid::new_v4());

        let mut mock = MockSummaryProvider::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Ok("Generated once".to_string()));
        mock.expect_name().return_const("mock");

        let provider = CachedSummaryProvider::new(Arc::new(mock), cache, 60);

        assert_eq!(provider.generate(&prompt).await.unwrap(), "Generated once");
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        assert_eq!(provider.generate(&prompt).await.unwrap(), "Generated once");
    }
}
