//! In-process backend.
//!
//! All tables live behind one lock, so every trait operation is a single
//! critical section. The aggregate total is cached and moves in the same
//! section as the artwork counter it mirrors.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{log_clamp, StoreError, TallyAudit, VoteChange, VoteCount, VoteReceipt, VoteStore};
use crate::models::{Artwork, NewArtwork, NewUser, User};

#[derive(Debug, Default)]
struct Tables {
    artworks: HashMap<Uuid, Artwork>,
    users: HashMap<Uuid, User>,
    total_votes: i64,
}

impl Tables {
    fn increment(&mut self, sk: Uuid) -> Result<VoteCount, StoreError> {
        let artwork = self
            .artworks
            .get_mut(&sk)
            .ok_or(StoreError::ArtworkNotFound(sk))?;
        artwork.votes += 1;
        self.total_votes += 1;

        Ok(VoteCount {
            sk,
            votes: artwork.votes,
            clamped: false,
        })
    }

    fn decrement(&mut self, sk: Uuid) -> Result<VoteCount, StoreError> {
        let artwork = self
            .artworks
            .get_mut(&sk)
            .ok_or(StoreError::ArtworkNotFound(sk))?;

        if artwork.votes <= 0 {
            artwork.votes = 0;
            return Ok(VoteCount {
                sk,
                votes: 0,
                clamped: true,
            });
        }

        artwork.votes -= 1;
        self.total_votes = (self.total_votes - 1).max(0);

        Ok(VoteCount {
            sk,
            votes: artwork.votes,
            clamped: false,
        })
    }

    fn count(&self, sk: Uuid) -> Result<VoteCount, StoreError> {
        self.artworks
            .get(&sk)
            .map(|artwork| VoteCount {
                sk,
                votes: artwork.votes,
                clamped: false,
            })
            .ok_or(StoreError::ArtworkNotFound(sk))
    }
}

/// Vote store held entirely in memory. Intended for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn get_artwork(&self, sk: Uuid) -> Result<Artwork, StoreError> {
        self.tables
            .read()
            .artworks
            .get(&sk)
            .cloned()
            .ok_or(StoreError::ArtworkNotFound(sk))
    }

    async fn create_artwork(&self, artwork: NewArtwork) -> Result<Artwork, StoreError> {
        let artwork = artwork.into_artwork(Utc::now());
        let mut tables = self.tables.write();
        if tables.artworks.contains_key(&artwork.sk) {
            return Err(StoreError::AlreadyExists(format!("artwork {}", artwork.sk)));
        }
        tables.artworks.insert(artwork.sk, artwork.clone());
        Ok(artwork)
    }

    async fn query_artworks(&self, is_approved: Option<bool>) -> Result<Vec<Artwork>, StoreError> {
        let tables = self.tables.read();
        let mut artworks: Vec<Artwork> = tables
            .artworks
            .values()
            .filter(|a| is_approved.map_or(true, |flag| a.is_approved == flag))
            .cloned()
            .collect();
        artworks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.sk.cmp(&b.sk)));
        Ok(artworks)
    }

    async fn approve_artwork(&self, sk: Uuid, is_approved: bool) -> Result<Artwork, StoreError> {
        let mut tables = self.tables.write();
        let artwork = tables
            .artworks
            .get_mut(&sk)
            .ok_or(StoreError::ArtworkNotFound(sk))?;
        artwork.is_approved = is_approved;
        Ok(artwork.clone())
    }

    async fn delete_artwork(&self, sk: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let artwork = tables
            .artworks
            .remove(&sk)
            .ok_or(StoreError::ArtworkNotFound(sk))?;
        tables.total_votes = (tables.total_votes - artwork.votes).max(0);

        let mut released = 0u64;
        for user in tables.users.values_mut() {
            if user.voted_sk == Some(sk) {
                user.voted_sk = None;
                released += 1;
            }
        }

        if released as i64 != artwork.votes {
            tracing::warn!(
                artwork_sk = %sk,
                counter = artwork.votes,
                released,
                "Deleted artwork counter disagreed with its voters"
            );
        }
        Ok(released)
    }

    async fn increment_votes(&self, sk: Uuid) -> Result<VoteCount, StoreError> {
        self.tables.write().increment(sk)
    }

    async fn decrement_votes(&self, sk: Uuid) -> Result<VoteCount, StoreError> {
        let count = self.tables.write().decrement(sk)?;
        log_clamp(&count);
        Ok(count)
    }

    async fn total_votes(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().total_votes)
    }

    async fn get_user(&self, sk: Uuid) -> Result<User, StoreError> {
        self.tables
            .read()
            .users
            .get(&sk)
            .cloned()
            .ok_or(StoreError::UserNotFound(sk))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user(Utc::now());
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.sk) {
            return Err(StoreError::AlreadyExists(format!("user {}", user.sk)));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::AlreadyExists(format!("email {}", user.email)));
        }
        tables.users.insert(user.sk, user.clone());
        Ok(user)
    }

    async fn delete_user(
        &self,
        sk: Uuid,
        expected: Option<Uuid>,
    ) -> Result<Option<VoteCount>, StoreError> {
        let mut tables = self.tables.write();

        let current = tables
            .users
            .get(&sk)
            .ok_or(StoreError::UserNotFound(sk))?
            .voted_sk;
        if current != expected {
            return Err(StoreError::Conflict(format!(
                "vote pointer of user {} changed",
                sk
            )));
        }

        let released = match expected {
            Some(artwork_sk) if tables.artworks.contains_key(&artwork_sk) => {
                Some(tables.decrement(artwork_sk)?)
            }
            Some(artwork_sk) => {
                tracing::warn!(
                    user_sk = %sk,
                    artwork_sk = %artwork_sk,
                    "Deleted user's vote pointed at a missing artwork"
                );
                None
            }
            None => None,
        };
        tables.users.remove(&sk);
        drop(tables);

        if let Some(count) = &released {
            log_clamp(count);
        }
        Ok(released)
    }

    async fn apply_vote(&self, change: VoteChange) -> Result<VoteReceipt, StoreError> {
        let mut tables = self.tables.write();

        let current = tables
            .users
            .get(&change.user_sk)
            .ok_or(StoreError::UserNotFound(change.user_sk))?
            .voted_sk;
        if current != change.expected {
            return Err(StoreError::Conflict(format!(
                "vote pointer of user {} changed",
                change.user_sk
            )));
        }
        // Validate before mutating so a failure writes nothing.
        let mut target = tables.count(change.target)?;

        if change.expected == Some(change.target) {
            return Ok(VoteReceipt {
                previous: Some(target),
                target,
            });
        }

        let previous = match change.expected {
            Some(old) if tables.artworks.contains_key(&old) => Some(tables.decrement(old)?),
            Some(old) => {
                tracing::warn!(
                    user_sk = %change.user_sk,
                    artwork_sk = %old,
                    "Previous vote pointed at a missing artwork"
                );
                None
            }
            None => None,
        };
        target = tables.increment(change.target)?;

        if let Some(user) = tables.users.get_mut(&change.user_sk) {
            user.voted_sk = Some(change.target);
        }
        drop(tables);

        if let Some(count) = &previous {
            log_clamp(count);
        }
        Ok(VoteReceipt { previous, target })
    }

    async fn audit(&self) -> Result<TallyAudit, StoreError> {
        let tables = self.tables.read();

        let mut backers: HashMap<Uuid, i64> = HashMap::new();
        let mut active_voters = 0;
        let mut dangling_votes = 0;
        for sk in tables.users.values().filter_map(|u| u.voted_sk) {
            active_voters += 1;
            if tables.artworks.contains_key(&sk) {
                *backers.entry(sk).or_default() += 1;
            } else {
                dangling_votes += 1;
            }
        }

        let drifted_artworks = tables
            .artworks
            .values()
            .filter(|a| a.votes != backers.get(&a.sk).copied().unwrap_or(0))
            .count() as i64;

        Ok(TallyAudit {
            total_votes: tables.total_votes,
            active_voters,
            dangling_votes,
            drifted_artworks,
        })
    }
}
