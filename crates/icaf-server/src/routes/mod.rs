//! API routes for the ICAF server.

pub mod artworks;
pub mod users;
pub mod votes;

use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, Method};
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::VoteStore;
use crate::votes::VoteEngine;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VoteStore>,
    pub votes: VoteEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn VoteStore>, max_vote_attempts: u32) -> Self {
        let votes = VoteEngine::with_max_attempts(store.clone(), max_vote_attempts);
        Self { store, votes }
    }
}

/// Creates the main router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(root))
        .nest("/api", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/artworks", artworks::router(state.clone()))
        .merge(votes::router(state.clone()))
        .merge(users::router(state))
}

async fn root() -> &'static str {
    "Hello, ICAF Backend!"
}

/// Parses an identifier taken from the path or query string.
///
/// Identifiers are hyphenated UUIDs, exactly 36 characters.
pub(crate) fn parse_sk(raw: &str, name: &str) -> Result<Uuid, AppError> {
    if raw.len() != 36 {
        return Err(AppError::BadRequest(format!(
            "{} must be exactly 36 characters long",
            name
        )));
    }
    Uuid::parse_str(raw)
        .map_err(|_| AppError::BadRequest(format!("{} must be a valid UUID string", name)))
}
