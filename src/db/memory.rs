use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{BoxStore, CatalogStore, PreferenceStore, ProfileStore},
    error::AppResult,
    models::{CurrentBox, Product, Rating, UserPreference, UserProfile},
};

/// In-memory implementation of every store seam
///
/// Backs integration tests and local runs without a database. Ordering
/// contracts match the Postgres implementation so either backend produces
/// identical recommendation output for identical data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    products: Vec<Product>,
    preferences: Vec<UserPreference>,
    ratings: Vec<Rating>,
    profiles: HashMap<Uuid, UserProfile>,
    boxes: HashMap<Uuid, CurrentBox>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        self.inner.write().await.products.push(product);
    }

    pub async fn put_profile(&self, profile: UserProfile) {
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile);
    }

    pub async fn put_box(&self, user_id: Uuid, current_box: CurrentBox) {
        self.inner.write().await.boxes.insert(user_id, current_box);
    }

    pub async fn add_preference(&self, preference: UserPreference) {
        self.inner.write().await.preferences.push(preference);
    }

    pub async fn add_rating(&self, rating: Rating) {
        self.inner.write().await.ratings.push(rating);
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn find_candidates(
        &self,
        categories: &[String],
        max_price: i64,
    ) -> AppResult<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut candidates: Vec<Product> = inner
            .products
            .iter()
            .filter(|p| p.in_stock && p.price <= max_price && categories.contains(&p.category))
            .cloned()
            .collect();

        // Same order as the Postgres query: newest first, id as tie-break
        candidates.sort_by_key(|p| (Reverse(p.created_at), p.id));
        Ok(candidates)
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == product_id).cloned())
    }
}

#[async_trait::async_trait]
impl PreferenceStore for MemoryStore {
    async fn preferences_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserPreference>> {
        let inner = self.inner.read().await;
        let mut preferences: Vec<UserPreference> = inner
            .preferences
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();

        preferences.sort_by(|a, b| {
            b.preference
                .partial_cmp(&a.preference)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.item_name.cmp(&b.item_name))
        });
        Ok(preferences)
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_preference(
        &self,
        user_id: Uuid,
        category: &str,
        item_name: &str,
        preference: f64,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        match inner
            .preferences
            .iter_mut()
            .find(|p| p.user_id == user_id && p.category == category && p.item_name == item_name)
        {
            Some(existing) => {
                existing.preference = preference;
                existing.frequency += 1;
                existing.last_purchased = Utc::now();
            }
            None => inner.preferences.push(UserPreference {
                user_id,
                category: category.to_string(),
                item_name: item_name.to_string(),
                preference,
                frequency: 1,
                last_purchased: Utc::now(),
            }),
        }
        Ok(())
    }

    async fn upsert_rating(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        review: Option<String>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        match inner
            .ratings
            .iter_mut()
            .find(|r| r.user_id == user_id && r.product_id == product_id)
        {
            Some(existing) => {
                existing.rating = rating;
                existing.review = review;
            }
            None => inner.ratings.push(Rating {
                user_id,
                product_id,
                rating,
                review,
            }),
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&user_id).cloned())
    }
}

#[async_trait::async_trait]
impl BoxStore for MemoryStore {
    async fn current_box(&self, user_id: Uuid) -> AppResult<Option<CurrentBox>> {
        let inner = self.inner.read().await;
        Ok(inner.boxes.get(&user_id).cloned())
    }
}
