use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use mindmate_core::{AppConfig, AppState};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod error;
pub mod middleware;
pub mod routes;

pub fn build_router(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Chat directory and history
        .route("/api/chat", get(routes::chat::list_counterparts))
        .route(
            "/api/chat/messages/{counterpart_id}",
            get(routes::chat::get_messages),
        )
        .route("/api/chat/send", post(routes::chat::send_message))
        .route("/api/chat/update-profile", post(routes::chat::update_profile))
        .route("/api/chat/interactions", get(routes::chat::interactions))
        // Caretaker dashboard counters
        .route(
            "/api/caretaker/chat/interactions",
            get(routes::caretaker_chat::interactions),
        )
        .route(
            "/api/caretaker/chat/interactions/today",
            get(routes::caretaker_chat::interactions_today),
        )
        .route(
            "/api/caretaker/chat/interactions/today/users",
            get(routes::caretaker_chat::interactions_today_users),
        )
        .route(
            "/api/caretaker/chat/messages/count",
            get(routes::caretaker_chat::messages_count),
        )
        .layer(build_cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Credentialed CORS. An empty origin list mirrors whatever origin asks.
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "mindmate" })),
    )
}
