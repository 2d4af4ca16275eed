//! Pure scoring and filtering functions
//!
//! Everything here is deterministic over its inputs, so recommendation
//! output stays explainable and directly testable.

use crate::models::{Product, Rating, UserPreference};

/// Categories offered to users with no preference history
pub const BASELINE_CATEGORIES: [&str; 6] = [
    "proteins",
    "vegetables",
    "fruits",
    "dairy",
    "grains",
    "snacks",
];

/// Derives the candidate category set from the user's preference rows
///
/// Preferred categories come first, in the order they appear in the rows
/// (the store returns strongest affinity first); baseline categories not
/// already present are appended. Always non-empty. The user's dietary
/// restriction strings do not narrow categories; restrictions act on
/// individual candidates, not whole categories.
pub fn relevant_categories(preferences: &[UserPreference]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();

    for pref in preferences {
        if !categories.iter().any(|c| c == &pref.category) {
            categories.push(pref.category.clone());
        }
    }

    for baseline in BASELINE_CATEGORIES {
        if !categories.iter().any(|c| c == baseline) {
            categories.push(baseline.to_string());
        }
    }

    categories
}

/// Whether any declared allergy appears in the product's name or description
///
/// Coarse substring matching, case-insensitive. Over-exclusion is fine;
/// admitting an unsafe item is not.
pub fn contains_allergen(product: &Product, allergies: &[String]) -> bool {
    if allergies.is_empty() {
        return false;
    }

    let name = product.name.to_lowercase();
    let description = product.description.to_lowercase();

    allergies.iter().any(|allergy| {
        let allergy = allergy.to_lowercase();
        name.contains(&allergy) || description.contains(&allergy)
    })
}

/// Removes candidates matching any of the user's allergies
pub fn filter_allergens(products: Vec<Product>, allergies: &[String]) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| !contains_allergen(p, allergies))
        .collect()
}

/// A scored candidate with its human-readable justification
#[derive(Debug, Clone, PartialEq)]
pub struct ProductScore {
    /// Relevance in [0,1]
    pub score: f64,
    /// Comma-joined labels of the signals that fired
    pub reason: String,
}

/// Scores one candidate against the user's signals
///
/// Fixed additive weights over a 0.5 base, clamped to [0,1]. The base and
/// the price bonus always apply but contribute no reason text.
pub fn score_product(
    product: &Product,
    preferences: &[UserPreference],
    ratings: &[Rating],
    sustainability_importance: i32,
) -> ProductScore {
    let mut score = 0.5;
    let mut reasons: Vec<String> = Vec::new();

    let preference = preferences
        .iter()
        .find(|p| p.category == product.category && names_overlap(&p.item_name, &product.name));

    if let Some(preference) = preference {
        score += preference.preference * 0.3;
        reasons.push("Based on your preferences".to_string());
    }

    if let Some(user_rating) = ratings.iter().find(|r| r.product_id == product.id) {
        score += (user_rating.rating as f64 / 5.0) * 0.2;
        reasons.push(format!("You rated this {}/5", user_rating.rating));
    }

    if product.is_organic && sustainability_importance > 5 {
        score += 0.1;
        reasons.push("Organic option".to_string());
    }

    if product.is_local && sustainability_importance > 5 {
        score += 0.1;
        reasons.push("Locally sourced".to_string());
    }

    if product.is_seasonal {
        score += 0.05;
        reasons.push("Seasonal item".to_string());
    }

    // Cheaper items score higher; anything at $10 or above gets no bonus
    let price_bonus = (1.0 - product.price as f64 / 1000.0).max(0.0);
    score += price_bonus * 0.1;

    ProductScore {
        score: score.clamp(0.0, 1.0),
        reason: reasons.join(", "),
    }
}

/// Confidence exposed to callers, derived from the internal score
pub fn confidence(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Case-insensitive containment in either direction
///
/// "organic apples" matches the preference row "apples" and vice versa.
/// Deliberately fuzzy; see DESIGN.md on tokenized matching.
fn names_overlap(item_name: &str, product_name: &str) -> bool {
    let item = item_name.to_lowercase();
    let product = product_name.to_lowercase();
    item.contains(&product) || product.contains(&item)
}
