/// Gemini ranking source
///
/// Sends a bounded description of the user's current box, constraints and
/// candidate products to the Gemini generateContent endpoint and parses a
/// JSON ranking out of the free-text reply. The model is untrusted: its
/// output shape is validated entry by entry and any product id it invents
/// is discarded before the merge step ever sees it. Every failure mode
/// (transport, quota, malformed reply) degrades to an empty ranking; the
/// recommendation run itself never fails on this path.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Product, RecommendationItem},
    services::rankers::{Ranker, RankerOutcome, RankingContext},
};

/// How many candidates the prompt describes
const PROMPT_CANDIDATE_LIMIT: usize = 10;

/// TTL for cached model replies, in seconds
const RANKING_CACHE_TTL: u64 = 300;

#[derive(Clone)]
pub struct GeminiRanker {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    cache: Cache,
}

impl GeminiRanker {
    /// Creates a Gemini ranker with a bounded per-call timeout
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        model: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            model,
            cache,
        })
    }

    /// Builds the ranking prompt from box contents, constraints and candidates
    fn build_prompt(ctx: &RankingContext) -> String {
        let box_lines: Vec<String> = ctx
            .current_box
            .items
            .iter()
            .map(|item| format!("- {}x {} ({})", item.quantity, item.name, item.category))
            .collect();

        let candidate_lines: Vec<String> = ctx
            .candidates
            .iter()
            .take(PROMPT_CANDIDATE_LIMIT)
            .map(|product| {
                format!(
                    "- {} [{}] ({}) - ${:.2}{}{}",
                    product.name,
                    product.id,
                    product.category,
                    product.price as f64 / 100.0,
                    if product.is_organic { " - Organic" } else { "" },
                    if product.is_local { ", Local" } else { "" },
                )
            })
            .collect();

        format!(
            "As a smart grocery recommendation system, analyze the following information and suggest products:\n\n\
             Current Box Contents:\n{}\n\n\
             User Preferences:\n\
             - Dietary Restrictions: {}\n\
             - Allergies: {}\n\
             - Sustainability Importance: {}/10\n\
             - Weekly Budget: ${:.2}\n\n\
             Available Products (showing first {} for context):\n{}\n\n\
             Based on this information, recommend 5 products that would complement the current box while:\n\
             1. Respecting dietary restrictions and allergies\n\
             2. Staying within budget\n\
             3. Matching sustainability preferences\n\
             4. Creating a balanced meal plan\n\n\
             Format your response as a JSON array of objects with properties:\n\
             - productId: string (the bracketed id of the product)\n\
             - reason: string (why this product is recommended)\n\
             - confidence: number (0-1, how confident you are in this recommendation)\n",
            box_lines.join("\n"),
            ctx.dietary_restrictions.join(", "),
            ctx.allergies.join(", "),
            ctx.sustainability_importance,
            ctx.budget as f64 / 100.0,
            PROMPT_CANDIDATE_LIMIT,
            candidate_lines.join("\n"),
        )
    }

    /// Fetches the model reply, consulting the per-user cache first
    async fn fetch_ranking_text(&self, user_id: Uuid, prompt: String) -> AppResult<String> {
        cached!(
            self.cache,
            CacheKey::ExternalRanking(user_id),
            RANKING_CACHE_TTL,
            async move { self.call_model(&prompt).await }
        )
    }

    /// Calls the generateContent endpoint and concatenates the reply text
    async fn call_model(&self, prompt: &str) -> AppResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.7, "maxOutputTokens": 1024 }
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let reply: GenerateContentResponse = response.json().await?;

        let text: String = reply
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(AppError::ExternalApi(
                "Gemini reply contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait::async_trait]
impl Ranker for GeminiRanker {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn rank(&self, ctx: &RankingContext) -> RankerOutcome {
        if ctx.candidates.is_empty() {
            return RankerOutcome::Ranked(Vec::new());
        }

        let prompt = Self::build_prompt(ctx);

        let text = match self.fetch_ranking_text(ctx.user_id, prompt).await {
            Ok(text) => text,
            Err(e) => {
                return RankerOutcome::Degraded {
                    cause: e.to_string(),
                }
            }
        };

        let items = parse_ranking(&text, &ctx.candidates);

        tracing::info!(
            user_id = %ctx.user_id,
            ranked = items.len(),
            ranker = "gemini",
            "External ranking parsed"
        );

        RankerOutcome::Ranked(items)
    }
}

/// Minimal generateContent response shape
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ReplyCandidate>,
}

#[derive(Debug, Deserialize)]
struct ReplyCandidate {
    content: ReplyContent,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: String,
}

/// One entry of the model's JSON ranking
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalSuggestion {
    product_id: Uuid,
    reason: String,
    confidence: f64,
}

/// Extracts the first JSON array from the reply and maps valid entries
///
/// Entries that are not well-formed objects with all required fields are
/// dropped, as is anything referencing a product outside the candidate
/// set. A reply with no parseable array yields an empty ranking.
fn parse_ranking(text: &str, candidates: &[Product]) -> Vec<RecommendationItem> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        tracing::warn!("No JSON array found in Gemini reply");
        return Vec::new();
    };

    if end < start {
        tracing::warn!("Malformed JSON array bounds in Gemini reply");
        return Vec::new();
    }

    let raw: Vec<serde_json::Value> = match serde_json::from_str(&text[start..=end]) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse JSON array from Gemini reply");
            return Vec::new();
        }
    };

    raw.into_iter()
        .filter_map(|value| serde_json::from_value::<ExternalSuggestion>(value).ok())
        .filter_map(|suggestion| {
            let Some(product) = candidates.iter().find(|p| p.id == suggestion.product_id) else {
                tracing::warn!(
                    product_id = %suggestion.product_id,
                    "Gemini ranking referenced a product outside the candidate set, dropping"
                );
                return None;
            };

            Some(RecommendationItem {
                product_id: product.id,
                name: product.name.clone(),
                category: product.category.clone(),
                price: product.price,
                confidence: (suggestion.confidence.clamp(0.0, 1.0) * 100.0).round() as u8,
                reason: suggestion.reason,
                image_url: product.image_url.clone(),
                // The model knows nothing about footprints; placeholder only
                carbon_footprint: Some(0.0),
                ai_recommended: true,
            })
        })
        .collect()
}
