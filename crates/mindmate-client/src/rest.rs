use std::time::Duration;

use mindmate_models::account::{
    CountResponse, CounterpartSummary, InteractionCounts, PartnerIds, ProfileCounters,
};
use mindmate_models::message::{Message, RecipientKind};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::ClientError;

/// Bearer-authenticated client for the chat REST surface.
#[derive(Clone)]
pub struct DirectoryClient {
    http: Client,
    base_url: String,
    token: String,
}

impl DirectoryClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub async fn counterparts(&self) -> Result<Vec<CounterpartSummary>, ClientError> {
        self.request(Method::GET, "/api/chat", None::<()>).await
    }

    pub async fn history(&self, counterpart: i64) -> Result<Vec<Message>, ClientError> {
        self.request(
            Method::GET,
            &format!("/api/chat/messages/{counterpart}"),
            None::<()>,
        )
        .await
    }

    pub async fn send(
        &self,
        receiver: i64,
        receiver_type: RecipientKind,
        message: &str,
    ) -> Result<Message, ClientError> {
        let body = json!({
            "receiverId": receiver.to_string(),
            "receiverType": receiver_type.as_str(),
            "message": message,
        });
        self.request(Method::POST, "/api/chat/send", Some(body)).await
    }

    pub async fn update_profile(&self) -> Result<ProfileCounters, ClientError> {
        self.request(Method::POST, "/api/chat/update-profile", None::<()>)
            .await
    }

    pub async fn interactions(&self) -> Result<InteractionCounts, ClientError> {
        self.request(Method::GET, "/api/chat/interactions", None::<()>)
            .await
    }

    pub async fn partner_count(&self) -> Result<i64, ClientError> {
        let resp: CountResponse = self
            .request(Method::GET, "/api/caretaker/chat/interactions", None::<()>)
            .await?;
        Ok(resp.count)
    }

    pub async fn partner_count_today(&self) -> Result<i64, ClientError> {
        let resp: CountResponse = self
            .request(
                Method::GET,
                "/api/caretaker/chat/interactions/today",
                None::<()>,
            )
            .await?;
        Ok(resp.count)
    }

    pub async fn partners_today(&self) -> Result<Vec<i64>, ClientError> {
        let resp: PartnerIds = self
            .request(
                Method::GET,
                "/api/caretaker/chat/interactions/today/users",
                None::<()>,
            )
            .await?;
        Ok(resp.user_ids)
    }

    pub async fn sent_count(&self) -> Result<i64, ClientError> {
        let resp: CountResponse = self
            .request(Method::GET, "/api/caretaker/chat/messages/count", None::<()>)
            .await?;
        Ok(resp.count)
    }

    async fn request<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<R, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or(text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ClientError::Unauthorized(message)
                }
                _ => ClientError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }
        Ok(response.json().await?)
    }
}
