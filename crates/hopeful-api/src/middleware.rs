use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use hopeful_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Who is calling. Built once per request by `require_session` and handed
/// to handlers as an `Extension`; nothing else reads the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl Session {
    /// Validate an identity-provider token (HS256, `exp` required).
    pub fn from_token(token: &str, secret: &str) -> Result<Self, ApiError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::Unauthorized(format!("invalid session token: {}", e)))?;

        Ok(Self {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Extract and validate the bearer token from the Authorization header.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

    let session = Session::from_token(token, &state.jwt_secret)?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
