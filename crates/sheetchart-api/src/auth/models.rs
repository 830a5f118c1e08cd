use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // owner id
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated caller, inserted into request extensions by `auth_middleware`.
#[derive(Debug, Clone, Copy)]
pub struct OwnerContext {
    pub user_id: Uuid,
}

// Read from parts directly so it composes with Multipart.
impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OwnerContext>()
            .copied()
            .ok_or_else(|| {
                let mut body = ErrorResponse::new("Missing owner context", "UNAUTHORIZED");
                body.suggested_action = Some("Check authentication token".to_string());
                (StatusCode::UNAUTHORIZED, Json(body))
            })
    }
}
