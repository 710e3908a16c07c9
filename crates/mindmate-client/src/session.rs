use chrono::Utc;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::relay::RelayConnection;
use crate::rest::DirectoryClient;
use crate::state::{ConversationState, DeliveryEffect, SubmitOutcome};

/// Where a session connects.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// REST base, e.g. `https://api.example.com`.
    pub http_base: String,
    /// Gateway URL, e.g. `wss://api.example.com/socket`.
    pub socket_url: String,
}

/// One chat screen: a live relay connection when available, the REST
/// client, and the state they update.
pub struct ChatSession {
    state: ConversationState,
    relay: Option<RelayConnection>,
    directory: DirectoryClient,
}

impl ChatSession {
    /// Connect the relay and load the contact list. A relay failure only
    /// degrades the session to REST reads; a REST auth failure is returned.
    pub async fn mount(
        endpoints: &Endpoints,
        token: &str,
        self_id: i64,
    ) -> Result<Self, ClientError> {
        let directory = DirectoryClient::new(&endpoints.http_base, token)?;
        let relay = match RelayConnection::connect(&endpoints.socket_url, token).await {
            Ok(relay) => Some(relay),
            Err(e) => {
                warn!("relay unavailable, continuing without push delivery: {}", e);
                None
            }
        };

        let mut state = ConversationState::new(self_id);
        state.set_counterparts(directory.counterparts().await?);
        Ok(Self {
            state,
            relay,
            directory,
        })
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    pub fn is_live(&self) -> bool {
        self.relay.is_some()
    }

    /// Optimistic append, then emit and the best-effort counter call.
    /// Neither failure rolls back the appended line.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let outcome = self.state.submit(text, Utc::now());
        let SubmitOutcome::Relay(payload) = &outcome else {
            return outcome;
        };

        match self.relay.as_mut() {
            Some(relay) => {
                if let Err(e) = relay.emit_send(payload).await {
                    warn!("relay send failed, dropping connection: {}", e);
                    self.relay = None;
                }
            }
            None => debug!("no live relay; message shown locally only"),
        }
        if let Err(e) = self.directory.update_profile().await {
            debug!("profile counter update failed: {}", e);
        }
        outcome
    }

    /// Switch to `counterpart` and replace the visible list with its history.
    pub async fn open(&mut self, counterpart: i64) -> Result<(), ClientError> {
        let ticket = self.state.open(counterpart);
        let history = self.directory.history(counterpart).await?;
        if !self.state.replace_history(ticket, history) {
            debug!("discarding stale history for {}", counterpart);
        }
        Ok(())
    }

    /// Wait for the next delivery and apply it. `None` when there is no live
    /// relay or it just closed.
    pub async fn pump(&mut self) -> Option<DeliveryEffect> {
        let relay = self.relay.as_mut()?;
        match relay.next_delivery().await {
            Ok(Some(message)) => Some(self.state.apply_delivery(&message)),
            Ok(None) => {
                debug!("relay closed");
                self.relay = None;
                None
            }
            Err(e) => {
                warn!("relay receive failed: {}", e);
                self.relay = None;
                None
            }
        }
    }

    pub async fn unmount(self) {
        if let Some(relay) = self.relay {
            let _ = relay.close().await;
        }
    }
}
