//! Artwork submission, review and listing endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_sk, AppState};
use crate::error::AppError;
use crate::models::{Artwork, FileType, NewArtwork};

/// Oldest accepted artist age.
const MAX_ARTIST_AGE: i64 = 150;

/// Query string for listing artworks.
#[derive(Debug, Deserialize)]
pub struct ListArtworksQuery {
    /// `"true"` selects approved artworks; any other value selects pending
    /// ones. Absent lists everything.
    pub is_approved: Option<String>,
}

impl ListArtworksQuery {
    pub fn approval_filter(&self) -> Option<bool> {
        self.is_approved.as_deref().map(|v| v == "true")
    }
}

/// Request body for submitting an artwork.
#[derive(Debug, Deserialize)]
pub struct CreateArtworkRequest {
    pub f_name: String,
    pub age: i64,
    pub description: String,
    pub sport: String,
    pub location: String,
    pub is_ai_gen: bool,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub file_type: String,
}

/// Response for a created artwork.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateArtworkResponse {
    pub message: String,
    pub sk: Uuid,
}

/// Request body for a volunteer review decision.
#[derive(Debug, Deserialize)]
pub struct ApproveArtworkRequest {
    pub is_approved: bool,
}

/// Response for a deleted artwork.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteArtworkResponse {
    pub message: String,
    /// Users whose vote pointed at the artwork and was cleared.
    pub released_votes: u64,
}

/// Creates the artworks router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_artworks).post(create_artwork))
        .route(
            "/{artwork_sk}",
            get(get_artwork).patch(approve_artwork).delete(delete_artwork),
        )
        .with_state(state)
}

/// GET /api/artworks?is_approved=
async fn list_artworks(
    State(state): State<AppState>,
    Query(query): Query<ListArtworksQuery>,
) -> Result<Json<Vec<Artwork>>, AppError> {
    let artworks = state.store.query_artworks(query.approval_filter()).await?;
    Ok(Json(artworks))
}

/// GET /api/artworks/{artwork_sk}
async fn get_artwork(
    State(state): State<AppState>,
    Path(artwork_sk): Path<String>,
) -> Result<Json<Artwork>, AppError> {
    let sk = parse_sk(&artwork_sk, "artworkSk")?;
    Ok(Json(state.store.get_artwork(sk).await?))
}

/// POST /api/artworks - Submit a new artwork. It starts unapproved with no votes.
async fn create_artwork(
    State(state): State<AppState>,
    Json(req): Json<CreateArtworkRequest>,
) -> Result<(StatusCode, Json<CreateArtworkResponse>), AppError> {
    let new_artwork = validate_submission(req)?;
    let artwork = state.store.create_artwork(new_artwork).await?;

    tracing::info!(artwork_sk = %artwork.sk, "Artwork submitted");

    Ok((
        StatusCode::CREATED,
        Json(CreateArtworkResponse {
            message: "Artwork created".to_string(),
            sk: artwork.sk,
        }),
    ))
}

/// PATCH /api/artworks/{artwork_sk} - Approve or un-approve a submission.
async fn approve_artwork(
    State(state): State<AppState>,
    Path(artwork_sk): Path<String>,
    Json(req): Json<ApproveArtworkRequest>,
) -> Result<Json<Artwork>, AppError> {
    let sk = parse_sk(&artwork_sk, "artworkSk")?;
    let artwork = state.store.approve_artwork(sk, req.is_approved).await?;

    tracing::info!(artwork_sk = %sk, is_approved = req.is_approved, "Artwork reviewed");
    Ok(Json(artwork))
}

/// DELETE /api/artworks/{artwork_sk}
///
/// Voters of the deleted artwork get their vote back and may vote again.
async fn delete_artwork(
    State(state): State<AppState>,
    Path(artwork_sk): Path<String>,
) -> Result<Json<DeleteArtworkResponse>, AppError> {
    let sk = parse_sk(&artwork_sk, "artworkSk")?;
    let released_votes = state.store.delete_artwork(sk).await?;

    if released_votes > 0 {
        tracing::warn!(artwork_sk = %sk, released_votes, "Deleted artwork held active votes");
    } else {
        tracing::info!(artwork_sk = %sk, "Artwork deleted");
    }

    Ok(Json(DeleteArtworkResponse {
        message: "Artwork deleted".to_string(),
        released_votes,
    }))
}

/// Checks a submission and converts it into storable form.
fn validate_submission(req: CreateArtworkRequest) -> Result<NewArtwork, AppError> {
    if !(0..=MAX_ARTIST_AGE).contains(&req.age) {
        return Err(AppError::BadRequest(format!(
            "age must be an integer between 0 and {}",
            MAX_ARTIST_AGE
        )));
    }

    let file_type = FileType::from_str(req.file_type.trim()).ok_or_else(|| {
        AppError::BadRequest("file_type must be jpg, png, or jpeg".to_string())
    })?;

    Ok(NewArtwork {
        sk: None,
        f_name: validate_text("f_name", &req.f_name, 1, 50)?,
        age: req.age as i32,
        description: validate_text("description", &req.description, 1, 300)?,
        sport: validate_text("sport", &req.sport, 1, 50)?,
        location: validate_text("location", &req.location, 1, 100)?,
        is_ai_gen: req.is_ai_gen,
        model: validate_optional_text("model", req.model.as_deref(), 100)?,
        prompt: validate_optional_text("prompt", req.prompt.as_deref(), 300)?,
        file_type,
    })
}

/// Trims a required text field and checks its length in characters.
pub(crate) fn validate_text(field: &str, value: &str, min: usize, max: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(AppError::BadRequest(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`validate_text`] for optional fields; blank values become `None`.
pub(crate) fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_text(field, v, 0, max).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateArtworkRequest {
        CreateArtworkRequest {
            f_name: "John".to_string(),
            age: 12,
            description: "A beautiful piece of art.".to_string(),
            sport: "Basketball".to_string(),
            location: "New York".to_string(),
            is_ai_gen: false,
            model: Some("Art".to_string()),
            prompt: Some("A child playing basketball".to_string()),
            file_type: "jpg".to_string(),
        }
    }

    #[test]
    fn test_valid_submission() {
        let artwork = validate_submission(valid_request()).unwrap();
        assert_eq!(artwork.f_name, "John");
        assert_eq!(artwork.age, 12);
        assert_eq!(artwork.file_type, FileType::Jpg);
        assert!(artwork.sk.is_none());
    }

    #[test]
    fn test_fields_are_trimmed() {
        let artwork = validate_submission(CreateArtworkRequest {
            f_name: "  John  ".to_string(),
            ..valid_request()
        })
        .unwrap();
        assert_eq!(artwork.f_name, "John");
    }

    #[test]
    fn test_age_out_of_range() {
        for age in [-1, 151] {
            let err = validate_submission(CreateArtworkRequest {
                age,
                ..valid_request()
            })
            .unwrap_err();
            assert!(err.to_string().contains("age must be an integer"));
        }
    }

    #[test]
    fn test_unsupported_file_type() {
        let err = validate_submission(CreateArtworkRequest {
            file_type: "gif".to_string(),
            ..valid_request()
        })
        .unwrap_err();
        assert!(err.to_string().contains("file_type must be jpg, png, or jpeg"));
    }

    #[test]
    fn test_blank_required_field() {
        let err = validate_submission(CreateArtworkRequest {
            sport: "   ".to_string(),
            ..valid_request()
        })
        .unwrap_err();
        assert!(err.to_string().contains("sport must be between 1 and 50"));
    }

    #[test]
    fn test_description_too_long() {
        let err = validate_submission(CreateArtworkRequest {
            description: "x".repeat(301),
            ..valid_request()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let artwork = validate_submission(CreateArtworkRequest {
            model: Some("  ".to_string()),
            prompt: None,
            ..valid_request()
        })
        .unwrap();
        assert!(artwork.model.is_none());
        assert!(artwork.prompt.is_none());
    }

    #[test]
    fn test_approval_filter() {
        let q = |v: Option<&str>| ListArtworksQuery {
            is_approved: v.map(str::to_string),
        };
        assert_eq!(q(None).approval_filter(), None);
        assert_eq!(q(Some("true")).approval_filter(), Some(true));
        assert_eq!(q(Some("false")).approval_filter(), Some(false));
        assert_eq!(q(Some("yes")).approval_filter(), Some(false));
    }
}
