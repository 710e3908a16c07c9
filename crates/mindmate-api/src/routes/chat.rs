use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use mindmate_core::error::CoreError;
use mindmate_core::relay::{self, RejectReason};
use mindmate_core::AppState;
use mindmate_models::account::{CounterpartSummary, InteractionCounts, ProfileCounters};
use mindmate_models::gateway::SendMessage;
use mindmate_models::message::Message;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub receiver_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn list_counterparts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CounterpartSummary>>, ApiError> {
    let counterparts = mindmate_core::directory::list_counterparts(&state.db, auth.user_id).await?;
    Ok(Json(counterparts))
}

pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(counterpart_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let counterpart = mindmate_util::validation::parse_identity(&counterpart_id)
        .map_err(|_| ApiError::BadRequest("Invalid counterpart id".into()))?;
    let messages =
        mindmate_core::directory::conversation(&state.db, auth.user_id, counterpart).await?;
    Ok(Json(messages))
}

/// Non-push send. Persists like the relay does and also delivers to any
/// live connections of either side.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let Json(body) = body?;
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
    if !present(&body.receiver_id) || !present(&body.message) || !present(&body.receiver_type) {
        return Err(ApiError::BadRequest(
            "receiverId, message, and receiverType are required".into(),
        ));
    }

    let payload = SendMessage {
        receiver: body.receiver_id,
        receiver_type: body.receiver_type,
        message: body.message,
    };
    let outgoing = relay::validate(&payload).map_err(|reason| match reason {
        RejectReason::EmptyBody => ApiError::BadRequest("Message cannot be empty".into()),
        RejectReason::InvalidRecipient | RejectReason::MissingRecipient => {
            ApiError::BadRequest("Invalid receiverId".into())
        }
        other => ApiError::BadRequest(other.to_string()),
    })?;

    let message = match relay::persist(&state.db, auth.user_id, &outgoing).await {
        Ok(message) => message,
        Err(CoreError::NotFound) => return Err(ApiError::NotFound("Receiver not found".into())),
        Err(e) => return Err(e.into()),
    };
    let reached = relay::deliver(&state.channels, &message);
    tracing::debug!(
        sender = auth.user_id,
        message_id = message.id,
        reached,
        "message sent over REST"
    );
    Ok(Json(message))
}

/// Gamification side call made after every send.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileCounters>, ApiError> {
    let counters = mindmate_db::accounts::record_message_sent(&state.db, auth.user_id).await?;
    Ok(Json(counters))
}

pub async fn interactions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<InteractionCounts>, ApiError> {
    let counts = mindmate_core::directory::interaction_counts(
        &state.db,
        auth.user_id,
        mindmate_core::directory::local_midnight(),
    )
    .await?;
    Ok(Json(counts))
}
