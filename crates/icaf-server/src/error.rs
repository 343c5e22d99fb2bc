//! Error types for the ICAF server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;
use crate::votes::VoteError;

/// Application error type. Rendered as `{ "error": message }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ArtworkNotFound(_) => AppError::NotFound("Artwork not found".to_string()),
            StoreError::UserNotFound(_) => AppError::NotFound("User not found".to_string()),
            StoreError::AlreadyExists(_) => AppError::Conflict("Record already exists".to_string()),
            StoreError::Conflict(_) => {
                AppError::Conflict("Concurrent update, please retry".to_string())
            }
            other => AppError::Store(other),
        }
    }
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::UserNotFound(_) | VoteError::ArtworkNotFound(_) | VoteError::DuplicateVote => {
                AppError::BadRequest(err.to_string())
            }
            VoteError::Contention { .. } => AppError::Conflict(err.to_string()),
            VoteError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_duplicate_vote_is_bad_request() {
        let (status, body) = render(VoteError::DuplicateVote.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot vote twice for the same artwork");
    }

    #[tokio::test]
    async fn test_vote_not_found_errors_are_distinct() {
        let (status, body) = render(VoteError::ArtworkNotFound(Uuid::nil()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Artwork not found");

        let (status, body) = render(VoteError::UserNotFound(Uuid::nil()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn test_store_not_found_is_404() {
        let (status, body) = render(StoreError::ArtworkNotFound(Uuid::nil()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Artwork not found");
    }

    #[tokio::test]
    async fn test_database_errors_are_hidden() {
        let (status, body) = render(StoreError::Database(sqlx::Error::PoolTimedOut).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_contention_is_conflict() {
        let (status, _) = render(VoteError::Contention { attempts: 5 }.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
