use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Learned affinity for one (user, category, item name) pair
///
/// Created the first time an item is rated and re-derived on every
/// subsequent rating of a matching item. The score stays in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPreference {
    pub user_id: Uuid,
    pub category: String,
    pub item_name: String,
    /// Affinity score in [0,1]
    pub preference: f64,
    /// How many times a matching item has been rated
    pub frequency: i32,
    pub last_purchased: DateTime<Utc>,
}

/// A star rating for one (user, product) pair
///
/// At most one row exists per pair; a new submission overwrites the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub user_id: Uuid,
    pub product_id: Uuid,
    /// Stars, 1-5
    pub rating: i32,
    pub review: Option<String>,
}
