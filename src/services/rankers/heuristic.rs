use crate::{
    models::RecommendationItem,
    services::rankers::{Ranker, RankerOutcome, RankingContext},
    services::scoring::{confidence, score_product, ProductScore},
};

/// The traditional ranking source
///
/// Scores every candidate with the fixed-weight heuristic, sorts by score
/// and truncates. Pure computation over already-fetched data; it cannot
/// degrade.
pub struct HeuristicRanker;

#[async_trait::async_trait]
impl Ranker for HeuristicRanker {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn rank(&self, ctx: &RankingContext) -> RankerOutcome {
        let mut scored: Vec<(f64, RecommendationItem)> = ctx
            .candidates
            .iter()
            .map(|product| {
                let ProductScore { score, reason } = score_product(
                    product,
                    &ctx.preferences,
                    &ctx.ratings,
                    ctx.sustainability_importance,
                );

                let item = RecommendationItem {
                    product_id: product.id,
                    name: product.name.clone(),
                    category: product.category.clone(),
                    price: product.price,
                    confidence: confidence(score),
                    reason,
                    image_url: product.image_url.clone(),
                    carbon_footprint: product.carbon_footprint,
                    ai_recommended: false,
                };

                (score, item)
            })
            .collect();

        // Stable sort: equal scores keep catalog order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        RankerOutcome::Ranked(
            scored
                .into_iter()
                .take(ctx.max_items)
                .map(|(_, item)| item)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CurrentBox, Product};
    use chrono::Utc;
    use uuid::Uuid;

    fn product(name: &str, category: &str, price: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            subcategory: None,
            price,
            unit: None,
            in_stock: true,
            is_organic: false,
            is_local: false,
            is_seasonal: false,
            carbon_footprint: None,
            stock_level: 10,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn context(candidates: Vec<Product>, max_items: usize) -> RankingContext {
        RankingContext {
            user_id: Uuid::new_v4(),
            candidates,
            preferences: Vec::new(),
            ratings: Vec::new(),
            current_box: CurrentBox::default(),
            dietary_restrictions: Vec::new(),
            allergies: Vec::new(),
            sustainability_importance: 5,
            budget: 5000,
            max_items,
        }
    }

    #[tokio::test]
    async fn test_ranks_cheaper_products_higher_without_other_signals() {
        let ctx = context(
            vec![
                product("Saffron", "grains", 900),
                product("Lentils", "grains", 100),
            ],
            10,
        );

        let items = HeuristicRanker.rank(&ctx).await.into_items("heuristic");
        assert_eq!(items[0].name, "Lentils");
        assert_eq!(items[1].name, "Saffron");
    }

    #[tokio::test]
    async fn test_equal_scores_keep_candidate_order() {
        let ctx = context(
            vec![
                product("First", "grains", 500),
                product("Second", "grains", 500),
                product("Third", "grains", 500),
            ],
            10,
        );

        let items = HeuristicRanker.rank(&ctx).await.into_items("heuristic");
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_truncates_to_max_items() {
        let ctx = context(
            vec![
                product("A", "grains", 100),
                product("B", "grains", 200),
                product("C", "grains", 300),
            ],
            2,
        );

        let items = HeuristicRanker.rank(&ctx).await.into_items("heuristic");
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_candidates_rank_to_empty_list() {
        let ctx = context(Vec::new(), 5);
        let items = HeuristicRanker.rank(&ctx).await.into_items("heuristic");
        assert!(items.is_empty());
    }
}
