use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use mindmate_core::AppState;

use crate::error::ApiError;

/// Bearer-authenticated caller whose token subject is a known account.
pub struct AuthUser {
    pub user_id: i64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))?;

        let claims = mindmate_core::auth::validate_token(token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        let account = mindmate_db::accounts::get_account(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User or Caretaker not found".into()))?;

        Ok(AuthUser {
            user_id: account.id,
        })
    }
}
