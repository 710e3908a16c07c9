use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("API internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message, "message": message }))).into_response()
    }
}

impl From<mindmate_core::error::CoreError> for ApiError {
    fn from(e: mindmate_core::error::CoreError) -> Self {
        use mindmate_core::error::CoreError;
        match e {
            CoreError::NotFound => ApiError::NotFound("not found".into()),
            CoreError::BadRequest(msg) => ApiError::BadRequest(msg),
            CoreError::Database(e) => ApiError::from(e),
        }
    }
}

/// Body syntax and shape errors are client errors, never 415/422.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid request body".into())
    }
}

impl From<mindmate_db::DbError> for ApiError {
    fn from(e: mindmate_db::DbError) -> Self {
        match e {
            mindmate_db::DbError::NotFound => ApiError::NotFound("not found".into()),
            mindmate_db::DbError::Sqlx(err) => {
                ApiError::Internal(anyhow::anyhow!("database error: {err}"))
            }
        }
    }
}
