//! Ranking sources
//!
//! A `Ranker` turns a prepared ranking context into an ordered list of
//! recommendation items. The orchestrator runs every configured ranker and
//! merges their output, so adding a ranking source never touches the
//! orchestration logic.

use uuid::Uuid;

use crate::models::{CurrentBox, Product, Rating, RecommendationItem, UserPreference};

pub mod gemini;
pub mod heuristic;

pub use gemini::GeminiRanker;
pub use heuristic::HeuristicRanker;

/// Everything a ranking source may draw on for one recommendation run
#[derive(Debug, Clone)]
pub struct RankingContext {
    pub user_id: Uuid,
    /// Candidates surviving the catalog query and allergen filter.
    /// Every ranked item must reference one of these.
    pub candidates: Vec<Product>,
    pub preferences: Vec<UserPreference>,
    pub ratings: Vec<Rating>,
    pub current_box: CurrentBox,
    pub dietary_restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub sustainability_importance: i32,
    /// Weekly budget in cents
    pub budget: i64,
    pub max_items: usize,
}

/// Result of one ranking source
///
/// A degraded source produced nothing but must not fail the run; the cause
/// is kept for logging and never reaches the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RankerOutcome {
    Ranked(Vec<RecommendationItem>),
    Degraded { cause: String },
}

impl RankerOutcome {
    /// Collapses the outcome to a plain item list, logging degradation
    pub fn into_items(self, ranker: &str) -> Vec<RecommendationItem> {
        match self {
            RankerOutcome::Ranked(items) => items,
            RankerOutcome::Degraded { cause } => {
                tracing::warn!(ranker = %ranker, cause = %cause, "Ranking source degraded, continuing without it");
                Vec::new()
            }
        }
    }
}

/// A source of ranked recommendations
#[async_trait::async_trait]
pub trait Ranker: Send + Sync {
    /// Ranker name for logging and debugging
    fn name(&self) -> &'static str;

    /// Ranks the context's candidates
    ///
    /// Must never reference a product outside `ctx.candidates`; the merge
    /// step drops such items defensively.
    async fn rank(&self, ctx: &RankingContext) -> RankerOutcome;
}
