use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{BoxStore, CatalogStore, PreferenceStore, ProfileStore},
    error::{AppError, AppResult},
    models::{Product, RecommendationItem, RecommendationParams},
    services::rankers::{Ranker, RankingContext},
    services::scoring::{filter_allergens, relevant_categories},
};

/// Generates personalized grocery recommendations
///
/// Composes the store seams and ranking sources: gathers the user's
/// signals, derives a candidate set, runs every configured ranker and
/// merges their output into one capped, confidence-ordered list.
///
/// Constructed once per process with its dependencies injected; holds no
/// mutable state of its own.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    preferences: Arc<dyn PreferenceStore>,
    profiles: Arc<dyn ProfileStore>,
    boxes: Arc<dyn BoxStore>,
    rankers: Vec<Arc<dyn Ranker>>,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        preferences: Arc<dyn PreferenceStore>,
        profiles: Arc<dyn ProfileStore>,
        boxes: Arc<dyn BoxStore>,
        rankers: Vec<Arc<dyn Ranker>>,
    ) -> Self {
        Self {
            catalog,
            preferences,
            profiles,
            boxes,
            rankers,
        }
    }

    /// Produces the ranked recommendation list for one user
    ///
    /// Fails only when the user has no profile; every ranking-source
    /// failure degrades to whatever the remaining sources produced. An
    /// empty candidate set yields an empty list, not an error.
    pub async fn generate_recommendations(
        &self,
        params: RecommendationParams,
    ) -> AppResult<Vec<RecommendationItem>> {
        // Independent reads, issued concurrently
        let (preferences, ratings, profile, current_box) = tokio::try_join!(
            self.preferences.preferences_for_user(params.user_id),
            self.preferences.ratings_for_user(params.user_id),
            self.profiles.find_by_user(params.user_id),
            self.boxes.current_box(params.user_id),
        )?;

        // A missing profile means onboarding never completed; without its
        // context the scoring weights are meaningless
        if profile.is_none() {
            return Err(AppError::NotFound(format!(
                "user profile not found for {}",
                params.user_id
            )));
        }

        let categories = relevant_categories(&preferences);
        let candidates = self
            .catalog
            .find_candidates(&categories, params.budget)
            .await?;
        let candidates = filter_allergens(candidates, &params.allergies);

        tracing::debug!(
            user_id = %params.user_id,
            categories = categories.len(),
            candidates = candidates.len(),
            "Candidate set prepared"
        );

        let ctx = Arc::new(RankingContext {
            user_id: params.user_id,
            candidates,
            preferences,
            ratings,
            current_box: current_box.unwrap_or_default(),
            dietary_restrictions: params.dietary_restrictions,
            allergies: params.allergies,
            sustainability_importance: params.sustainability_importance,
            budget: params.budget,
            max_items: params.max_items,
        });

        // Every ranker runs concurrently; the merge waits on all of them
        let mut tasks = Vec::new();
        for ranker in &self.rankers {
            let ranker = Arc::clone(ranker);
            let ctx = Arc::clone(&ctx);
            tasks.push(tokio::spawn(async move {
                (ranker.name(), ranker.rank(&ctx).await)
            }));
        }

        let mut rankings = Vec::new();
        for task in tasks {
            match task.await {
                Ok((name, outcome)) => rankings.push(outcome.into_items(name)),
                Err(e) => {
                    tracing::error!(error = %e, "Ranker task failed to complete");
                    rankings.push(Vec::new());
                }
            }
        }

        let merged = merge_rankings(rankings, &ctx.candidates, params.max_items);

        tracing::info!(
            user_id = %params.user_id,
            returned = merged.len(),
            "Recommendations generated"
        );

        Ok(merged)
    }

    /// Records a rating and folds it into the learned preference score
    ///
    /// Unknown products are skipped silently; there is nothing to learn
    /// from an item the catalog does not know. Both writes are upserts,
    /// so repeated feedback for the same pair keeps exactly one row each.
    pub async fn update_user_preferences(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        feedback: Option<String>,
    ) -> AppResult<()> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let Some(product) = self.catalog.find_product(product_id).await? else {
            tracing::debug!(product_id = %product_id, "Feedback for unknown product ignored");
            return Ok(());
        };

        let preference = (rating as f64 / 5.0).clamp(0.0, 1.0);

        self.preferences
            .upsert_preference(user_id, &product.category, &product.name, preference)
            .await?;
        self.preferences
            .upsert_rating(user_id, product_id, rating, feedback)
            .await?;

        Ok(())
    }
}

/// Merges ranked lists into one capped, confidence-ordered list
///
/// The first list seeds the result; later lists merge into it. When two
/// sources rank the same product, the reasons are joined, the higher
/// confidence wins and the AI flag is kept if either source set it. Items
/// referencing a product outside the candidate set are dropped; that is
/// the defense against an external source inventing identifiers.
pub fn merge_rankings(
    rankings: Vec<Vec<RecommendationItem>>,
    candidates: &[Product],
    cap: usize,
) -> Vec<RecommendationItem> {
    let known: HashSet<Uuid> = candidates.iter().map(|p| p.id).collect();

    let mut order: Vec<Uuid> = Vec::new();
    let mut merged: HashMap<Uuid, RecommendationItem> = HashMap::new();

    for items in rankings {
        for item in items {
            if !known.contains(&item.product_id) {
                tracing::warn!(
                    product_id = %item.product_id,
                    "Dropping ranked item outside the candidate set"
                );
                continue;
            }

            match merged.get_mut(&item.product_id) {
                Some(existing) => {
                    if existing.reason.is_empty() {
                        existing.reason = item.reason;
                    } else if !item.reason.is_empty() {
                        existing.reason = format!("{}. {}", existing.reason, item.reason);
                    }
                    existing.confidence = existing.confidence.max(item.confidence);
                    existing.ai_recommended = existing.ai_recommended || item.ai_recommended;
                }
                None => {
                    order.push(item.product_id);
                    merged.insert(item.product_id, item);
                }
            }
        }
    }

    let mut result: Vec<RecommendationItem> = order
        .into_iter()
        .filter_map(|id| merged.remove(&id))
        .collect();

    // Stable sort: equal confidences keep first-ranked order
    result.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    result.truncate(cap);
    result
}
