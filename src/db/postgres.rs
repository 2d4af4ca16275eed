use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::{BoxStore, CatalogStore, PreferenceStore, ProfileStore},
    error::AppResult,
    models::{BoxItem, CurrentBox, Product, Rating, UserPreference, UserProfile},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Postgres-backed implementation of every store seam
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresStore {
    async fn find_candidates(
        &self,
        categories: &[String],
        max_price: i64,
    ) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, category, subcategory, price, unit,
                   in_stock, is_organic, is_local, is_seasonal,
                   carbon_footprint, stock_level, image_url, created_at
            FROM products
            WHERE in_stock AND price <= $1 AND category = ANY($2)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(max_price)
        .bind(categories)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn find_product(&self, product_id: Uuid) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, category, subcategory, price, unit,
                   in_stock, is_organic, is_local, is_seasonal,
                   carbon_footprint, stock_level, image_url, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }
}

#[async_trait::async_trait]
impl PreferenceStore for PostgresStore {
    async fn preferences_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserPreference>> {
        let preferences = sqlx::query_as::<_, UserPreference>(
            r#"
            SELECT user_id, category, item_name, preference, frequency, last_purchased
            FROM user_preferences
            WHERE user_id = $1
            ORDER BY preference DESC, category, item_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(preferences)
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            r#"
            SELECT user_id, product_id, rating, review
            FROM ratings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }

    async fn upsert_preference(
        &self,
        user_id: Uuid,
        category: &str,
        item_name: &str,
        preference: f64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, category, item_name, preference, frequency, last_purchased)
            VALUES ($1, $2, $3, $4, 1, now())
            ON CONFLICT (user_id, category, item_name)
            DO UPDATE SET preference = EXCLUDED.preference,
                          frequency = user_preferences.frequency + 1,
                          last_purchased = now()
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(item_name)
        .bind(preference)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_rating(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        review: Option<String>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, product_id, rating, review)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET rating = EXCLUDED.rating, review = EXCLUDED.review
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(review)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgresStore {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, dietary_restrictions, allergies,
                   sustainability_importance, weekly_budget
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}

#[async_trait::async_trait]
impl BoxStore for PostgresStore {
    async fn current_box(&self, user_id: Uuid) -> AppResult<Option<CurrentBox>> {
        let items = sqlx::query_as::<_, BoxItem>(
            r#"
            SELECT name, quantity, category
            FROM box_items
            WHERE user_id = $1
            ORDER BY name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if items.is_empty() {
            return Ok(None);
        }

        Ok(Some(CurrentBox { items }))
    }
}
