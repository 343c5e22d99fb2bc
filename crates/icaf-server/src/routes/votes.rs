//! Voting endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_sk, AppState};
use crate::error::AppError;
use crate::store::TallyAudit;

/// Request body for casting a vote.
/// Note: the voter would normally come from the authenticated session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub user_sk: Uuid,
}

/// Response for a successful vote.
#[derive(Debug, Serialize, Deserialize)]
pub struct CastVoteResponse {
    pub message: String,
}

/// Response carrying the aggregate vote count.
#[derive(Debug, Serialize, Deserialize)]
pub struct TotalVotesResponse {
    pub votes: i64,
}

/// Tally audit with its verdict.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    #[serde(flatten)]
    pub audit: TallyAudit,
    pub consistent: bool,
}

/// Creates the votes router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/vote/{artwork_sk}", patch(cast_vote))
        .route("/votes", get(total_votes))
        .route("/votes/audit", get(audit_votes))
        .with_state(state)
}

/// PATCH /api/vote/{artwork_sk} - Cast or move the caller's single vote.
async fn cast_vote(
    State(state): State<AppState>,
    Path(artwork_sk): Path<String>,
    Json(req): Json<CastVoteRequest>,
) -> Result<Json<CastVoteResponse>, AppError> {
    let artwork_sk = parse_sk(&artwork_sk, "artworkSk")?;
    let outcome = state.votes.cast_vote(req.user_sk, artwork_sk).await?;

    Ok(Json(CastVoteResponse {
        message: outcome.message().to_string(),
    }))
}

/// GET /api/votes
async fn total_votes(State(state): State<AppState>) -> Result<Json<TotalVotesResponse>, AppError> {
    let votes = state.store.total_votes().await?;
    Ok(Json(TotalVotesResponse { votes }))
}

/// GET /api/votes/audit - Compare counters against the users backing them.
async fn audit_votes(State(state): State<AppState>) -> Result<Json<AuditResponse>, AppError> {
    let audit = state.store.audit().await?;
    if !audit.is_consistent() {
        tracing::warn!(?audit, "Vote tally is inconsistent");
    }

    Ok(Json(AuditResponse {
        consistent: audit.is_consistent(),
        audit,
    }))
}
