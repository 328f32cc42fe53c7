//! Bearer token verification
//!
//! Tokens are issued elsewhere; this service only checks the HS256
//! signature and expiry, then hands the claims to the handler.

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
struct AuthErrorResponse {
    message: String,
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(Validation::new(Algorithm::HS256)),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthErrorResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Rejects requests without a valid bearer token; inserts [`Claims`] otherwise
pub async fn require_auth(
    State(verifier): State<JwtVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return unauthorized("Unauthorized - No token provided");
    };

    match verifier.verify(token) {
        Ok(claims) => {
            debug!(user_id = %claims.user_id, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            unauthorized("Unauthorized - Invalid token")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp_offset: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset) as usize;
        let claims = Claims {
            user_id: "64f1c2".to_string(),
            role: Some("admin".to_string()),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_claims() {
        let verifier = JwtVerifier::new("secret");
        let claims = verifier.verify(&token("secret", 3600)).unwrap();
        assert_eq!(claims.user_id, "64f1c2");
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = JwtVerifier::new("secret");
        assert!(verifier.verify(&token("other", 3600)).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = JwtVerifier::new("secret");
        assert!(verifier.verify(&token("secret", -3600)).is_err());
    }
}
