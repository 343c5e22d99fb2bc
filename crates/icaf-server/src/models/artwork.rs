//! Artwork model: a submitted piece and its individual vote count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Image format of an uploaded artwork file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "artwork_file_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpg,
    Jpeg,
    Png,
}

impl FileType {
    /// Parse a file type from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

/// A submitted artwork.
///
/// Everything except `votes` and `is_approved` is immutable once the
/// submission is stored. `votes` only moves through the store's
/// increment/decrement operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Artwork {
    pub sk: Uuid,
    /// First name of the artist.
    pub f_name: String,
    pub age: i32,
    pub description: String,
    pub sport: String,
    pub location: String,
    /// Whether the piece was produced with a generative model.
    pub is_ai_gen: bool,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub file_type: FileType,
    /// Number of users whose current vote points at this artwork.
    pub votes: i64,
    /// Set by a volunteer once the submission has been reviewed.
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new artwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArtwork {
    /// Caller-chosen identifier; a fresh v4 UUID is used when absent.
    pub sk: Option<Uuid>,
    pub f_name: String,
    pub age: i32,
    pub description: String,
    pub sport: String,
    pub location: String,
    pub is_ai_gen: bool,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub file_type: FileType,
}

impl NewArtwork {
    /// Materialize the stored record: zero votes, pending approval.
    pub fn into_artwork(self, now: DateTime<Utc>) -> Artwork {
        Artwork {
            sk: self.sk.unwrap_or_else(Uuid::new_v4),
            f_name: self.f_name,
            age: self.age,
            description: self.description,
            sport: self.sport,
            location: self.location,
            is_ai_gen: self.is_ai_gen,
            model: self.model,
            prompt: self.prompt,
            file_type: self.file_type,
            votes: 0,
            is_approved: false,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewArtwork {
        NewArtwork {
            sk: None,
            f_name: "John".to_string(),
            age: 12,
            description: "A beautiful piece of art.".to_string(),
            sport: "Basketball".to_string(),
            location: "New York".to_string(),
            is_ai_gen: false,
            model: Some("Art".to_string()),
            prompt: None,
            file_type: FileType::Jpg,
        }
    }

    #[test]
    fn test_file_type_round_trip_strings() {
        for ft in [FileType::Jpg, FileType::Jpeg, FileType::Png] {
            assert_eq!(FileType::from_str(ft.as_str()), Some(ft));
        }
        assert_eq!(FileType::from_str("gif"), None);
        assert_eq!(FileType::from_str("JPG"), None);
    }

    #[test]
    fn test_file_type_serialization() {
        assert_eq!(serde_json::to_string(&FileType::Png).unwrap(), "\"png\"");
        assert_eq!(
            serde_json::from_str::<FileType>("\"jpeg\"").unwrap(),
            FileType::Jpeg
        );
    }

    #[test]
    fn test_new_artwork_starts_unapproved_with_zero_votes() {
        let artwork = sample().into_artwork(Utc::now());
        assert_eq!(artwork.votes, 0);
        assert!(!artwork.is_approved);
        assert_eq!(artwork.f_name, "John");
    }

    #[test]
    fn test_new_artwork_keeps_supplied_sk() {
        let sk = Uuid::new_v4();
        let artwork = NewArtwork {
            sk: Some(sk),
            ..sample()
        }
        .into_artwork(Utc::now());
        assert_eq!(artwork.sk, sk);
    }

    #[test]
    fn test_artwork_serializes_snake_case_fields() {
        let artwork = sample().into_artwork(Utc::now());
        let json = serde_json::to_value(&artwork).unwrap();
        assert_eq!(json["is_approved"], false);
        assert_eq!(json["is_ai_gen"], false);
        assert_eq!(json["votes"], 0);
        assert_eq!(json["file_type"], "jpg");
    }
}
