pub mod catalogue;
pub mod postgres;
pub mod ratings;
pub mod redis;

pub use catalogue::{CatalogueStore, InMemoryCatalogue, PgCatalogue};
pub use postgres::create_pool;
pub use ratings::{PgRatingsSource, RatingsSource, StaticRatingsSource};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
