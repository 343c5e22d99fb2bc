// HTTP client for the ICAF voting API

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Artwork fields shown by the CLI. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artwork {
    pub sk: Uuid,
    pub f_name: String,
    pub age: i32,
    pub sport: String,
    pub location: String,
    pub description: String,
    pub votes: i64,
    pub is_approved: bool,
    pub is_ai_gen: bool,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: String,
    pub released_votes: u64,
}

#[derive(Debug, Deserialize)]
struct TotalVotes {
    votes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub total_votes: i64,
    pub active_voters: i64,
    pub dangling_votes: i64,
    pub drifted_artworks: i64,
    pub consistent: bool,
}

/// Thin blocking client over the server's REST endpoints.
pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::agent(),
        }
    }

    pub fn list_artworks(&self, approved: Option<bool>) -> Result<Vec<Artwork>> {
        self.call(self.agent.get(&artworks_url(&self.base_url, approved)), None)
    }

    pub fn get_artwork(&self, sk: Uuid) -> Result<Artwork> {
        self.call(self.agent.get(&self.url(&format!("/api/artworks/{}", sk))), None)
    }

    pub fn approve_artwork(&self, sk: Uuid, is_approved: bool) -> Result<Artwork> {
        let request = self.agent.patch(&self.url(&format!("/api/artworks/{}", sk)));
        self.call(request, Some(json!({ "is_approved": is_approved })))
    }

    pub fn delete_artwork(&self, sk: Uuid) -> Result<DeleteResponse> {
        self.call(self.agent.delete(&self.url(&format!("/api/artworks/{}", sk))), None)
    }

    pub fn vote(&self, user_sk: Uuid, artwork_sk: Uuid) -> Result<MessageResponse> {
        let request = self.agent.patch(&self.url(&format!("/api/vote/{}", artwork_sk)));
        self.call(request, Some(json!({ "userSk": user_sk })))
    }

    pub fn total_votes(&self) -> Result<i64> {
        let total: TotalVotes = self.call(self.agent.get(&self.url("/api/votes")), None)?;
        Ok(total.votes)
    }

    pub fn audit(&self) -> Result<Audit> {
        self.call(self.agent.get(&self.url("/api/votes/audit")), None)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn call<T: DeserializeOwned>(&self, request: ureq::Request, body: Option<Value>) -> Result<T> {
        let url = request.url().to_string();
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match result {
            Ok(response) => response
                .into_json()
                .with_context(|| format!("Invalid response from {}", url)),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(api_error(code, &body))
            }
            Err(e) => Err(anyhow!("Request to {} failed: {}", url, e)),
        }
    }
}

/// Builds the artwork listing URL with an optional approval filter.
fn artworks_url(base_url: &str, approved: Option<bool>) -> String {
    match approved {
        Some(flag) => format!("{}/api/artworks?is_approved={}", base_url, flag),
        None => format!("{}/api/artworks", base_url),
    }
}

/// Extracts the server's `{ "error": ... }` message, falling back to the raw body.
fn api_error(status: u16, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    anyhow!("Server returned {}: {}", status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artworks_url() {
        assert_eq!(
            artworks_url("http://localhost:3000", None),
            "http://localhost:3000/api/artworks"
        );
        assert_eq!(
            artworks_url("http://localhost:3000", Some(true)),
            "http://localhost:3000/api/artworks?is_approved=true"
        );
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3000/");
        assert_eq!(client.url("/api/votes"), "http://localhost:3000/api/votes");
    }

    #[test]
    fn test_api_error_uses_error_field() {
        let err = api_error(400, r#"{"error":"Cannot vote twice for the same artwork"}"#);
        assert_eq!(
            err.to_string(),
            "Server returned 400: Cannot vote twice for the same artwork"
        );
    }

    #[test]
    fn test_api_error_falls_back_to_body() {
        let err = api_error(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "Server returned 502: Bad Gateway");
    }

    #[test]
    fn test_artwork_ignores_unknown_fields() {
        let json = r#"{
            "sk": "123e4567-e89b-12d3-a456-426614174000",
            "f_name": "John",
            "age": 12,
            "sport": "Basketball",
            "location": "New York",
            "description": "A beautiful piece of art.",
            "votes": 3,
            "is_approved": true,
            "is_ai_gen": false,
            "file_type": "jpg",
            "created_at": "2026-01-31T12:00:00Z"
        }"#;
        let artwork: Artwork = serde_json::from_str(json).unwrap();
        assert_eq!(artwork.votes, 3);
        assert!(artwork.is_approved);
    }
}
