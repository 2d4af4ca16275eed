use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppResult, middleware::AuthenticatedUser, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub product_id: Uuid,
    /// Stars, 1-5
    pub rating: i32,
    pub feedback: Option<String>,
}

/// Handler recording product feedback
///
/// Unknown products are accepted and skipped; the client cannot tell a
/// stale product id from a recorded rating, and does not need to.
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<StatusCode> {
    state
        .engine
        .update_user_preferences(
            user.user_id,
            request.product_id,
            request.rating,
            request.feedback,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
