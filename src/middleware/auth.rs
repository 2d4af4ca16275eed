use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, routes::AppState};

/// The verified identity attached to a request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Bearer-token verification seam
///
/// Token issuance lives in the account service; this side only checks
/// signatures and extracts the identity.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<AuthenticatedUser>;
}

/// JWT claims carried by access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

/// HMAC-signed JWT verifier
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Option<AuthenticatedUser> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).ok()?;
        let user_id = Uuid::parse_str(&data.claims.sub).ok()?;

        Some(AuthenticatedUser {
            user_id,
            email: data.claims.email,
        })
    }
}

/// Middleware requiring a valid bearer token
///
/// On success the `AuthenticatedUser` lands in the request extensions for
/// handlers to extract.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    let user = state
        .verifier
        .verify(token)
        .ok_or_else(|| AppError::Unauthorized("invalid token".to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: "shopper@example.com".to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_accepts_valid_token() {
        let user_id = Uuid::new_v4();
        let verifier = JwtVerifier::new("test-secret");
        let token = token_for("test-secret", &user_id.to_string(), 3600);

        let user = verifier.verify(&token).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "shopper@example.com");
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let verifier = JwtVerifier::new("test-secret");
        let token = token_for("other-secret", &Uuid::new_v4().to_string(), 3600);
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        let verifier = JwtVerifier::new("test-secret");
        let token = token_for("test-secret", &Uuid::new_v4().to_string(), -3600);
        assert!(verifier.verify(&token).is_none());
    }

    #[test]
    fn test_verify_rejects_non_uuid_subject() {
        let verifier = JwtVerifier::new("test-secret");
        let token = token_for("test-secret", "not-a-uuid", 3600);
        assert!(verifier.verify(&token).is_none());
    }
}
