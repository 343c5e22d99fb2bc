//! User record endpoints.
//!
//! Sign-up, login and session handling belong to the identity provider; these
//! endpoints only manage the record the voting flow reads.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artworks::{validate_optional_text, validate_text};
use super::{parse_sk, AppState};
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::votes::VoteError;

/// Longest accepted email address.
const MAX_EMAIL_LEN: usize = 254;

/// Request body for creating a user record.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Subject id issued by the identity provider, if already known.
    pub sk: Option<Uuid>,
    pub email: String,
    pub f_name: String,
    pub l_name: Option<String>,
}

/// Query string for looking up a user's current vote.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotedQuery {
    pub user_sk: String,
}

/// Response body for a deleted account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub message: &'static str,
    /// Artwork that lost the account's vote, if it held one.
    pub released_vote: Option<Uuid>,
}

/// Creates the users router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{user_sk}", get(get_user).delete(delete_user))
        .route("/voted", get(get_user_voted))
        .with_state(state)
}

/// POST /api/users
async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let new_user = validate_user(req)?;
    let user = state.store.create_user(new_user).await?;

    tracing::info!(user_sk = %user.sk, "User record created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{user_sk}
async fn get_user(
    State(state): State<AppState>,
    Path(user_sk): Path<String>,
) -> Result<Json<User>, AppError> {
    let sk = parse_sk(&user_sk, "userSk")?;
    Ok(Json(state.store.get_user(sk).await?))
}

/// DELETE /api/users/{user_sk}
async fn delete_user(
    State(state): State<AppState>,
    Path(user_sk): Path<String>,
) -> Result<Json<DeleteUserResponse>, AppError> {
    let sk = parse_sk(&user_sk, "userSk")?;
    let released = state.votes.delete_user(sk).await.map_err(|e| match e {
        VoteError::UserNotFound(_) => AppError::NotFound("User not found".to_string()),
        other => other.into(),
    })?;

    Ok(Json(DeleteUserResponse {
        message: "Account successfully deleted",
        released_vote: released.map(|count| count.sk),
    }))
}

/// GET /api/voted?userSk= - The artwork the user currently backs, or null.
async fn get_user_voted(
    State(state): State<AppState>,
    Query(query): Query<VotedQuery>,
) -> Result<Json<Option<Uuid>>, AppError> {
    let sk = parse_sk(&query.user_sk, "userSk")?;
    let user = state.store.get_user(sk).await?;
    Ok(Json(user.voted_sk))
}

fn validate_user(req: CreateUserRequest) -> Result<NewUser, AppError> {
    Ok(NewUser {
        sk: req.sk,
        email: validate_email(&req.email)?,
        f_name: validate_text("f_name", &req.f_name, 1, 50)?,
        l_name: validate_optional_text("l_name", req.l_name.as_deref(), 50)?,
    })
}

/// Light shape check; deliverability is the identity provider's concern.
fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email.len() <= MAX_EMAIL_LEN
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.contains('@')
            }
            None => false,
        };

    if !valid {
        return Err(AppError::BadRequest(
            "email must be a valid email address".to_string(),
        ));
    }
    Ok(email)
}
