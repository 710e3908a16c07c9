//! Validate, persist, deliver: one logical send.
//!
//! The push path never reports back to the sender. Every attempt ends in a
//! [`SendOutcome`] that the caller logs and tests can inspect.

use crate::error::CoreError;
use crate::events::{channel_name, ChannelRegistry, ServerEvent};
use crate::{AppState, WORKER_ID};
use mindmate_db::DbPool;
use mindmate_models::gateway::{SendMessage, EVENT_RECEIVE_MESSAGE};
use mindmate_models::message::{Message, RecipientKind};
use mindmate_util::validation::{parse_identity, validate_message_content};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingRecipient,
    EmptyBody,
    InvalidRecipient,
    UnknownRecipientKind(String),
    AssistantRecipient,
    UnknownRecipient,
    UnknownSender,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRecipient => f.write_str("missing recipient"),
            Self::EmptyBody => f.write_str("empty message body"),
            Self::InvalidRecipient => f.write_str("malformed recipient identity"),
            Self::UnknownRecipientKind(kind) => write!(f, "unknown recipient kind '{kind}'"),
            Self::AssistantRecipient => f.write_str("assistant recipients are not relayed"),
            Self::UnknownRecipient => f.write_str("recipient does not exist"),
            Self::UnknownSender => f.write_str("sender does not exist"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Persisted and emitted; `reached` counts live subscribers across the
    /// recipient and sender channels. Zero is a delivery miss.
    Delivered { message: Message, reached: usize },
    Rejected(RejectReason),
    /// The store failed; already logged.
    Failed,
}

/// A send that passed the stateless checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub receiver: i64,
    pub receiver_type: RecipientKind,
    pub body: String,
}

pub fn validate(payload: &SendMessage) -> Result<OutgoingMessage, RejectReason> {
    let receiver = payload
        .receiver
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(RejectReason::MissingRecipient)?;
    let body = payload.message.as_deref().unwrap_or_default();
    validate_message_content(body).map_err(|_| RejectReason::EmptyBody)?;

    let receiver = parse_identity(receiver).map_err(|_| RejectReason::InvalidRecipient)?;
    let receiver_type = match payload.receiver_type.as_deref() {
        None => RecipientKind::User,
        Some(raw) => raw
            .parse::<RecipientKind>()
            .map_err(|e| RejectReason::UnknownRecipientKind(e.0))?,
    };
    if !receiver_type.is_persistable() {
        return Err(RejectReason::AssistantRecipient);
    }

    Ok(OutgoingMessage {
        receiver,
        receiver_type,
        body: body.to_string(),
    })
}

/// Store the message with a fresh id and server timestamp. Both sides must
/// be known accounts.
pub async fn persist(
    pool: &DbPool,
    sender: i64,
    outgoing: &OutgoingMessage,
) -> Result<Message, CoreError> {
    if !mindmate_db::accounts::account_exists(pool, outgoing.receiver).await? {
        return Err(CoreError::NotFound);
    }
    if !mindmate_db::accounts::account_exists(pool, sender).await? {
        return Err(CoreError::BadRequest("unknown sender".into()));
    }

    let row = mindmate_db::messages::create_message(
        pool,
        mindmate_util::snowflake::generate(WORKER_ID),
        sender,
        outgoing.receiver,
        outgoing.receiver_type,
        &outgoing.body,
        chrono::Utc::now(),
    )
    .await?;
    Ok(row.into())
}

/// Emit `receive_message` to the recipient's channel and the sender's own
/// channel. When sender and recipient share a channel the two emits collapse
/// into one, so every tab of that identity sees the message exactly once.
pub fn deliver(channels: &ChannelRegistry, message: &Message) -> usize {
    let payload = match serde_json::to_value(message) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("failed to encode message {}: {}", message.id, e);
            return 0;
        }
    };
    let event = Arc::new(ServerEvent::new(EVENT_RECEIVE_MESSAGE, payload));

    let mut reached = channels.emit(&channel_name(message.receiver), event.clone());
    if message.sender != message.receiver {
        reached += channels.emit(&channel_name(message.sender), event);
    }
    reached
}

/// Full push-path pipeline for one `send_message` event.
pub async fn relay_send(state: &AppState, sender: i64, payload: &SendMessage) -> SendOutcome {
    let outgoing = match validate(payload) {
        Ok(outgoing) => outgoing,
        Err(reason) => {
            tracing::debug!(sender, %reason, "send rejected");
            return SendOutcome::Rejected(reason);
        }
    };

    let message = match persist(&state.db, sender, &outgoing).await {
        Ok(message) => message,
        Err(CoreError::NotFound) => {
            tracing::debug!(sender, receiver = outgoing.receiver, "send to unknown recipient");
            return SendOutcome::Rejected(RejectReason::UnknownRecipient);
        }
        Err(CoreError::BadRequest(_)) => {
            tracing::debug!(sender, "send from unknown account");
            return SendOutcome::Rejected(RejectReason::UnknownSender);
        }
        Err(e) => {
            tracing::error!(sender, receiver = outgoing.receiver, "failed to persist message: {}", e);
            return SendOutcome::Failed;
        }
    };

    let reached = deliver(&state.channels, &message);
    if reached == 0 {
        tracing::debug!(message_id = message.id, "no live subscribers for message");
    }
    SendOutcome::Delivered { message, reached }
}
