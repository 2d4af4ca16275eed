//! Store seams consumed by the recommendation engine
//!
//! Each backing collection is reached through a narrow trait so the engine
//! can be wired against Postgres in production and against the in-memory
//! store in tests. Per-row upserts are atomic in the backing store; the
//! engine itself takes no locks.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CurrentBox, Product, Rating, UserPreference, UserProfile},
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PostgresStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};

/// Read access to the product catalog
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns all in-stock products in one of the given categories priced
    /// at or under the ceiling.
    ///
    /// Ordering is newest-first with the product id as a tie-break, so a
    /// single call always returns the same order.
    async fn find_candidates(
        &self,
        categories: &[String],
        max_price: i64,
    ) -> AppResult<Vec<Product>>;

    /// Looks up a single product by id
    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>>;
}

/// Read/write access to learned preferences and star ratings
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Returns the user's preference rows, strongest affinity first
    async fn preferences_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserPreference>>;

    /// Returns all of the user's ratings
    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<Rating>>;

    /// Writes the preference row for (user, category, item name)
    ///
    /// Creates the row with frequency 1 when absent; otherwise replaces the
    /// score, increments the frequency and stamps the purchase time.
    async fn upsert_preference(
        &self,
        user_id: Uuid,
        category: &str,
        item_name: &str,
        preference: f64,
    ) -> AppResult<()>;

    /// Writes the rating row for (user, product), overwriting any prior one
    async fn upsert_rating(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        review: Option<String>,
    ) -> AppResult<()>;
}

/// Read access to onboarding profiles
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>>;
}

/// Read access to the user's current box
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BoxStore: Send + Sync {
    async fn current_box(&self, user_id: Uuid) -> AppResult<Option<CurrentBox>>;
}
