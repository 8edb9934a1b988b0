/// Read-through caching against a [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues the result for storage with `$ttl` seconds to live and
/// returns it. A failed cache read is logged and treated as a miss; errors
/// from the block are propagated with `?`, so the macro must be used inside a
/// function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let summary: String = cached!(cache, CacheKey::Summary(prompt.clone()), 3600, async {
///     provider.generate(&prompt).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, bypassing cache");
                None
            }
        };
        if let Some(cached) = hit {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
