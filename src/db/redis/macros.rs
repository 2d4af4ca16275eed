/// A macro to simplify caching logic using Redis.
///
/// Checks the cache first and returns the stored value on a hit. On a miss,
/// runs the provided block, stores the result via the background writer,
/// and returns it.
///
/// # Arguments
/// * `$cache`: The cache instance; must provide `get_from_cache` and
///   `set_in_background`.
/// * `$key`: The `CacheKey` under which the value lives.
/// * `$ttl`: Time-to-live for the cached value in seconds.
/// * `$block`: The async block computing the value on a miss.
///
/// # Example
/// ```ignore
/// let ranking = cached!(cache, cache_key, 300, async move {
///     fetch_expensive_ranking().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
