use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthenticatedUser,
    models::{RecommendationItem, RecommendationParams},
    routes::AppState,
};

/// Items returned when the client does not ask for a specific count
const DEFAULT_LIMIT: usize = 12;

#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub limit: Option<usize>,
    /// Optional post-hoc narrowing to one category
    pub category: Option<String>,
}

/// Profile context the recommendations were generated against
#[derive(Debug, Serialize)]
pub struct ProfileContext {
    pub dietary_restrictions: Vec<String>,
    pub sustainability_importance: i32,
    /// Weekly budget in cents
    pub weekly_budget: i64,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<RecommendationItem>,
    pub profile: ProfileContext,
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<RecommendationsQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let profile = state
        .profiles
        .find_by_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user profile not found".to_string()))?;

    let params = RecommendationParams {
        user_id: user.user_id,
        budget: profile.weekly_budget,
        max_items: query.limit.unwrap_or(DEFAULT_LIMIT),
        dietary_restrictions: profile.dietary_restrictions.clone(),
        allergies: profile.allergies.clone(),
        sustainability_importance: profile.sustainability_importance,
    };

    let mut recommendations = state.engine.generate_recommendations(params).await?;

    if let Some(category) = query.category {
        recommendations.retain(|item| item.category == category);
    }

    Ok(Json(RecommendationsResponse {
        recommendations,
        profile: ProfileContext {
            dietary_restrictions: profile.dietary_restrictions,
            sustainability_importance: profile.sustainability_importance,
            weekly_budget: profile.weekly_budget,
        },
    }))
}
