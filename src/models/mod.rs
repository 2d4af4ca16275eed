use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod preference;

pub use preference::{Rating, UserPreference};

/// A catalog product eligible for recommendation
///
/// Owned by the catalog; the recommender never mutates products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// Unit price in cents
    pub price: i64,
    pub unit: Option<String>,
    pub in_stock: bool,
    pub is_organic: bool,
    pub is_local: bool,
    pub is_seasonal: bool,
    /// Estimated kg CO2e per unit, when known
    pub carbon_footprint: Option<f64>,
    pub stock_level: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user profile constraints, managed by onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub dietary_restrictions: Vec<String>,
    pub allergies: Vec<String>,
    /// 1 (indifferent) to 10 (very important)
    pub sustainability_importance: i32,
    /// Weekly budget in cents
    pub weekly_budget: i64,
}

/// One line of the user's current box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoxItem {
    pub name: String,
    pub quantity: i32,
    pub category: String,
}

/// The user's current box, used only as ranking context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentBox {
    pub items: Vec<BoxItem>,
}

/// A single ranked recommendation returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub product_id: Uuid,
    pub name: String,
    pub category: String,
    /// Unit price in cents
    pub price: i64,
    /// 0-100
    pub confidence: u8,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub carbon_footprint: Option<f64>,
    #[serde(default)]
    pub ai_recommended: bool,
}

/// Input to a recommendation run
#[derive(Debug, Clone)]
pub struct RecommendationParams {
    pub user_id: Uuid,
    /// Inclusive price ceiling in cents
    pub budget: i64,
    pub max_items: usize,
    pub dietary_restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub sustainability_importance: i32,
}
