//! User record, limited to the fields the voting event needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub sk: Uuid,
    pub email: String,
    pub f_name: String,
    pub l_name: Option<String>,
    /// Artwork this user currently backs. `None` means the user has not voted.
    /// Only the vote engine writes this field.
    pub voted_sk: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if the user currently holds an active vote.
    pub fn has_voted(&self) -> bool {
        self.voted_sk.is_some()
    }
}

/// Data required to create a new user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Subject id from the identity provider; a fresh v4 UUID is used when absent.
    pub sk: Option<Uuid>,
    pub email: String,
    pub f_name: String,
    pub l_name: Option<String>,
}

impl NewUser {
    /// Materialize the stored record. New users have not voted.
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            sk: self.sk.unwrap_or_else(Uuid::new_v4),
            email: self.email,
            f_name: self.f_name,
            l_name: self.l_name,
            voted_sk: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_not_voted() {
        let user = NewUser {
            sk: None,
            email: "test@example.com".to_string(),
            f_name: "Test".to_string(),
            l_name: None,
        }
        .into_user(Utc::now());

        assert!(!user.has_voted());
    }

    #[test]
    fn test_user_serializes_voted_sk_as_null() {
        let user = NewUser {
            sk: Some(Uuid::nil()),
            email: "test@example.com".to_string(),
            f_name: "Test".to_string(),
            l_name: Some("User".to_string()),
        }
        .into_user(Utc::now());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json["voted_sk"].is_null());
        assert_eq!(json["sk"], "00000000-0000-0000-0000-000000000000");
    }
}
