use std::sync::Arc;

use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

use greenbox_api::{
    db::MemoryStore,
    middleware::{Claims, JwtVerifier},
    models::{Product, UserProfile},
    routes::{create_router, AppState},
    services::{rankers::HeuristicRanker, RecommendationEngine},
};

const TEST_SECRET: &str = "api-test-secret";

fn create_test_server(store: &MemoryStore) -> TestServer {
    let engine = Arc::new(RecommendationEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        vec![Arc::new(HeuristicRanker)],
    ));

    let state = AppState {
        engine,
        profiles: Arc::new(store.clone()),
        verifier: Arc::new(JwtVerifier::new(TEST_SECRET)),
    };

    TestServer::new(create_router(state)).unwrap()
}

fn bearer_token(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        email: "shopper@example.com".to_string(),
        exp: Utc::now().timestamp() + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

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

fn profile(user_id: Uuid) -> UserProfile {
    UserProfile {
        user_id,
        dietary_restrictions: vec!["vegetarian".to_string()],
        allergies: Vec::new(),
        sustainability_importance: 7,
        weekly_budget: 2000,
    }
}

#[tokio::test]
async fn test_health_check() {
    let store = MemoryStore::new();
    let server = create_test_server(&store);

    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_recommendations_require_token() {
    let store = MemoryStore::new();
    let server = create_test_server(&store);

    let response = server.get("/api/v1/recommendations").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recommendations_reject_garbage_token() {
    let store = MemoryStore::new();
    let server = create_test_server(&store);

    let response = server
        .get("/api/v1/recommendations")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Bearer not.a.token"),
        )
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recommendations_without_profile_is_not_found() {
    let store = MemoryStore::new();
    let server = create_test_server(&store);
    let user_id = Uuid::new_v4();

    let response = server
        .get("/api/v1/recommendations")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_flow() {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.put_profile(profile(user_id)).await;
    store.add_product(product("Kale", "vegetables", 399)).await;
    store.add_product(product("Oat Milk", "dairy", 449)).await;
    store.add_product(product("Brown Rice", "grains", 249)).await;

    let server = create_test_server(&store);

    let response = server
        .get("/api/v1/recommendations")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 3);

    // Ordered by confidence, best first
    let confidences: Vec<u64> = recommendations
        .iter()
        .map(|r| r["confidence"].as_u64().unwrap())
        .collect();
    assert!(confidences.windows(2).all(|w| w[0] >= w[1]));

    // The profile context used for generation is echoed back
    assert_eq!(body["profile"]["weekly_budget"], 2000);
    assert_eq!(body["profile"]["sustainability_importance"], 7);
    assert_eq!(body["profile"]["dietary_restrictions"][0], "vegetarian");
}

#[tokio::test]
async fn test_recommendations_honor_limit_and_category() {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.put_profile(profile(user_id)).await;
    store.add_product(product("Kale", "vegetables", 399)).await;
    store.add_product(product("Spinach", "vegetables", 349)).await;
    store.add_product(product("Oat Milk", "dairy", 449)).await;

    let server = create_test_server(&store);

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("limit", "2")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 2);

    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("category", "vegetables")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 2);
    assert!(recommendations
        .iter()
        .all(|r| r["category"] == "vegetables"));
}

#[tokio::test]
async fn test_feedback_flow_influences_recommendations() {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.put_profile(profile(user_id)).await;
    let yogurt = product("Greek Yogurt", "dairy", 449);
    let yogurt_id = yogurt.id;
    store.add_product(yogurt).await;
    store.add_product(product("Oat Milk", "dairy", 449)).await;

    let server = create_test_server(&store);

    let response = server
        .post("/api/v1/recommendations/feedback")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .json(&json!({
            "product_id": yogurt_id,
            "rating": 5,
            "feedback": "creamy and fresh"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);

    let response = server
        .get("/api/v1/recommendations")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations[0]["product_id"], yogurt_id.to_string());
    assert!(recommendations[0]["reason"]
        .as_str()
        .unwrap()
        .contains("You rated this 5/5"));
}

#[tokio::test]
async fn test_feedback_rejects_out_of_range_rating() {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let server = create_test_server(&store);

    let response = server
        .post("/api/v1/recommendations/feedback")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .json(&json!({
            "product_id": Uuid::new_v4(),
            "rating": 9
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feedback_accepts_unknown_product() {
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let server = create_test_server(&store);

    let response = server
        .post("/api/v1/recommendations/feedback")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_str(&bearer_token(user_id)).unwrap(),
        )
        .json(&json!({
            "product_id": Uuid::new_v4(),
            "rating": 4
        }))
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);
}
