use axum::{extract::State, Json};
use mindmate_core::directory;
use mindmate_core::AppState;
use mindmate_models::account::{CountResponse, PartnerIds};

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Distinct chat partners, all time.
pub async fn interactions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CountResponse>, ApiError> {
    let partners = directory::partners(&state.db, auth.user_id, None).await?;
    Ok(Json(CountResponse {
        count: partners.len() as i64,
    }))
}

pub async fn interactions_today(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CountResponse>, ApiError> {
    let since = directory::local_midnight();
    let partners = directory::partners(&state.db, auth.user_id, Some(since)).await?;
    Ok(Json(CountResponse {
        count: partners.len() as i64,
    }))
}

pub async fn interactions_today_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PartnerIds>, ApiError> {
    let since = directory::local_midnight();
    let user_ids = directory::partners(&state.db, auth.user_id, Some(since)).await?;
    Ok(Json(PartnerIds { user_ids }))
}

pub async fn messages_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = directory::sent_count(&state.db, auth.user_id).await?;
    Ok(Json(CountResponse { count }))
}
