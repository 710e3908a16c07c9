use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mindmate_models::gateway::{
    ConnectError, GatewayFrame, Handshake, SendMessage, EVENT_CONNECTED, EVENT_CONNECT_ERROR,
    EVENT_RECEIVE_MESSAGE, EVENT_SEND_MESSAGE,
};
use mindmate_models::message::Message;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::ClientError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated connection to the relay gateway.
pub struct RelayConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    identity: i64,
}

impl RelayConnection {
    /// Open `url` and authenticate with `token`. A refused handshake is
    /// reported as [`ClientError::AuthRejected`].
    pub async fn connect(url: &str, token: &str) -> Result<Self, ClientError> {
        let (mut stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let handshake = serde_json::to_string(&Handshake::with_token(token))?;
        stream.send(WsMessage::text(handshake)).await?;

        let frame = tokio::time::timeout(HANDSHAKE_TIMEOUT, next_frame(&mut stream))
            .await
            .map_err(|_| ClientError::Protocol("handshake timed out".into()))??
            .ok_or_else(|| ClientError::Protocol("connection closed during handshake".into()))?;

        match frame.event.as_str() {
            EVENT_CONNECTED => {
                let identity = frame
                    .data
                    .get("id")
                    .and_then(|v| v.as_str())
                    .and_then(|v| v.parse::<i64>().ok())
                    .ok_or_else(|| ClientError::Protocol("connected frame without id".into()))?;
                info!("relay connected as {}", identity);
                Ok(Self { stream, identity })
            }
            EVENT_CONNECT_ERROR => {
                let reason = serde_json::from_value::<ConnectError>(frame.data)
                    .map(|e| e.message)
                    .unwrap_or_else(|_| "authentication failed".to_string());
                Err(ClientError::AuthRejected(reason))
            }
            other => Err(ClientError::Protocol(format!(
                "unexpected handshake event '{other}'"
            ))),
        }
    }

    pub fn identity(&self) -> i64 {
        self.identity
    }

    /// Fire-and-forget: the relay never acknowledges a send.
    pub async fn emit_send(&mut self, payload: &SendMessage) -> Result<(), ClientError> {
        let frame = GatewayFrame::new(EVENT_SEND_MESSAGE, serde_json::to_value(payload)?);
        self.stream
            .send(WsMessage::text(serde_json::to_string(&frame)?))
            .await?;
        Ok(())
    }

    /// Next `receive_message` delivery, or `None` once the connection ends.
    pub async fn next_delivery(&mut self) -> Result<Option<Message>, ClientError> {
        while let Some(frame) = next_frame(&mut self.stream).await? {
            if frame.event != EVENT_RECEIVE_MESSAGE {
                debug!("ignoring relay event {}", frame.event);
                continue;
            }
            return Ok(Some(serde_json::from_value(frame.data)?));
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Next JSON text frame; control frames are handled by the transport.
async fn next_frame(
    stream: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<Option<GatewayFrame>, ClientError> {
    while let Some(msg) = stream.next().await {
        match msg? {
            WsMessage::Text(text) => match serde_json::from_str::<GatewayFrame>(text.as_str()) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => debug!("skipping unparseable relay frame: {}", e),
            },
            WsMessage::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}
