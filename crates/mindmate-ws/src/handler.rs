use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use mindmate_core::auth::{self, AuthError};
use mindmate_core::relay::{self, SendOutcome};
use mindmate_core::AppState;
use mindmate_models::gateway::*;
use serde_json::json;
use tokio::time::Duration;

use crate::session::Session;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(20);

const NO_TOKEN: &str = "No token provided";
const INVALID_TOKEN: &str = "Invalid token";

pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let handshake = tokio::time::timeout(
        HANDSHAKE_TIMEOUT,
        wait_for_handshake(&mut receiver, &state.config.jwt_secret),
    )
    .await
    .unwrap_or(Err(AuthError::MissingToken));

    let identity = match handshake {
        Ok(identity) => identity,
        Err(err) => {
            let message = match err {
                AuthError::MissingToken => NO_TOKEN,
                _ => INVALID_TOKEN,
            };
            tracing::debug!("gateway handshake rejected: {}", err);
            let frame = GatewayFrame::new(EVENT_CONNECT_ERROR, json!({ "message": message }));
            let _ = send_frame(&mut sender, &frame).await;
            let _ = send_ws_close(&mut sender, CLOSE_AUTH_FAILED, message).await;
            return;
        }
    };

    let session = Session::new(identity);
    let event_rx = state.channels.join(&session.channel, session.connection_id);
    tracing::info!(
        identity = session.identity,
        connection_id = %session.connection_id,
        "gateway connected"
    );

    let connected = GatewayFrame::new(
        EVENT_CONNECTED,
        json!({ "id": session.identity.to_string() }),
    );
    let reason = if send_frame(&mut sender, &connected).await.is_err() {
        "failed to send connected frame".to_string()
    } else {
        run_session(&mut sender, &mut receiver, event_rx, &session, &state).await
    };

    state.channels.leave(&session.channel, session.connection_id);
    tracing::info!(
        identity = session.identity,
        connection_id = %session.connection_id,
        reason = %reason,
        "gateway disconnected"
    );
}

/// Read frames until the first text frame, then authenticate it.
async fn wait_for_handshake(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    secret: &str,
) -> Result<i64, AuthError> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let token = serde_json::from_str::<Handshake>(&text)
                    .ok()
                    .and_then(|h| h.auth.token)
                    .ok_or(AuthError::MissingToken)?;
                return auth::validate_token(&token, secret).map(|claims| claims.sub);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(AuthError::MissingToken)
}

async fn run_session(
    sender: &mut (impl SinkExt<Message> + Unpin),
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    mut event_rx: mindmate_core::events::EventReceiver,
    session: &Session,
    state: &AppState,
) -> String {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&text, session, state).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(frame) => format!(
                                "client close frame (code={}, reason={})",
                                frame.code, frame.reason
                            ),
                            None => "client close frame (no code/reason)".to_string(),
                        };
                    }
                    Some(Err(err)) => return format!("websocket receive error: {err}"),
                    None => return "websocket stream ended".to_string(),
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    return "channel subscription closed".to_string();
                };
                let frame = GatewayFrame::new(&event.event_type, event.payload.clone());
                if send_frame(sender, &frame).await.is_err() {
                    return "failed to push event".to_string();
                }
            }
            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    return "failed to send ping".to_string();
                }
            }
        }
    }
}

/// Sends are processed one at a time so a connection's events keep their
/// arrival order.
async fn handle_client_frame(text: &str, session: &Session, state: &AppState) {
    let frame = match serde_json::from_str::<GatewayFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(identity = session.identity, "ignoring unparseable frame: {}", e);
            return;
        }
    };
    if frame.event != EVENT_SEND_MESSAGE {
        tracing::debug!(identity = session.identity, event = %frame.event, "ignoring unknown event");
        return;
    }
    let payload: SendMessage = serde_json::from_value(frame.data).unwrap_or_default();
    match relay::relay_send(state, session.identity, &payload).await {
        SendOutcome::Delivered { message, reached } => {
            tracing::debug!(
                identity = session.identity,
                message_id = message.id,
                reached,
                "message relayed"
            );
        }
        SendOutcome::Rejected(_) | SendOutcome::Failed => {}
    }
}

async fn send_frame(
    sender: &mut (impl SinkExt<Message> + Unpin),
    frame: &GatewayFrame,
) -> Result<(), ()> {
    let text = serde_json::to_string(frame).map_err(|_| ())?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

async fn send_ws_close(
    sender: &mut (impl SinkExt<Message> + Unpin),
    code: u16,
    reason: &str,
) -> Result<(), ()> {
    sender
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await
        .map_err(|_| ())
}
