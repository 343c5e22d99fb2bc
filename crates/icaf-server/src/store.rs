//! Durable record storage for artworks, users and their vote counters.
//!
//! [`VoteStore`] is the seam between the vote engine and a backend. Every
//! operation that touches more than one record is atomic from the caller's
//! point of view: the Postgres backend wraps it in a transaction, the memory
//! backend holds one lock for the whole step.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Artwork, NewArtwork, NewUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Postgres error code for serialization failures.
const PG_SERIALIZATION_FAILURE: &str = "40001";
/// Postgres error code for detected deadlocks.
const PG_DEADLOCK_DETECTED: &str = "40P01";
/// Postgres error code for unique constraint violations.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Errors raised by a [`VoteStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Artwork not found: {0}")]
    ArtworkNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// A conditional write lost against a concurrent writer. Safe to retry
    /// after re-reading current state.
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Returns true if the failed operation may succeed when re-attempted
    /// against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());

        match code.as_deref() {
            Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED) => {
                StoreError::Conflict(err.to_string())
            }
            Some(PG_UNIQUE_VIOLATION) => StoreError::AlreadyExists(err.to_string()),
            _ => StoreError::Database(err),
        }
    }
}

/// Vote count of a single artwork after a counter mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCount {
    pub sk: Uuid,
    pub votes: i64,
    /// The decrement found the counter already at zero and left it there.
    /// A clamp means some earlier path removed a vote it never added.
    pub clamped: bool,
}

/// A compare-and-swap on one user's vote pointer.
///
/// Applies only if the user's `voted_sk` still equals `expected`. On success
/// the previous artwork (if any) loses one vote, `target` gains one, and the
/// pointer moves to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    pub user_sk: Uuid,
    pub expected: Option<Uuid>,
    pub target: Uuid,
}

impl VoteChange {
    /// A user with no prior vote backing `target`.
    pub fn first(user_sk: Uuid, target: Uuid) -> Self {
        Self {
            user_sk,
            expected: None,
            target,
        }
    }

    /// A user moving their vote from `from` to `target`.
    pub fn transfer(user_sk: Uuid, from: Uuid, target: Uuid) -> Self {
        Self {
            user_sk,
            expected: Some(from),
            target,
        }
    }
}

/// Counter state after a [`VoteChange`] has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Counter of the artwork the vote left. `None` on a first vote, or when
    /// the previous artwork no longer exists.
    pub previous: Option<VoteCount>,
    pub target: VoteCount,
}

/// Snapshot of the tally invariant.
///
/// A consistent store has no dangling pointers, no drifted artworks, and a
/// total equal to the number of active voters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TallyAudit {
    /// Sum of all artwork vote counters.
    pub total_votes: i64,
    /// Users holding a vote pointer.
    pub active_voters: i64,
    /// Users whose pointer names an artwork that no longer exists.
    pub dangling_votes: i64,
    /// Artworks whose counter differs from the number of users backing them.
    pub drifted_artworks: i64,
}

impl TallyAudit {
    pub fn is_consistent(&self) -> bool {
        self.dangling_votes == 0
            && self.drifted_artworks == 0
            && self.total_votes == self.active_voters
    }
}

/// Storage backend for artworks, users and vote counters.
///
/// Artwork vote counters change only through [`increment_votes`],
/// [`decrement_votes`], [`apply_vote`] and [`delete_user`]; user vote
/// pointers change only through [`apply_vote`], [`delete_user`] and the
/// reconciliation in [`delete_artwork`].
///
/// [`increment_votes`]: VoteStore::increment_votes
/// [`decrement_votes`]: VoteStore::decrement_votes
/// [`apply_vote`]: VoteStore::apply_vote
/// [`delete_user`]: VoteStore::delete_user
/// [`delete_artwork`]: VoteStore::delete_artwork
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn get_artwork(&self, sk: Uuid) -> Result<Artwork, StoreError>;

    async fn create_artwork(&self, artwork: NewArtwork) -> Result<Artwork, StoreError>;

    /// List artworks, optionally filtered by approval state, oldest first.
    async fn query_artworks(&self, is_approved: Option<bool>) -> Result<Vec<Artwork>, StoreError>;

    async fn approve_artwork(&self, sk: Uuid, is_approved: bool) -> Result<Artwork, StoreError>;

    /// Delete an artwork and clear every vote pointer that names it, in one
    /// step. Returns the number of user votes released.
    async fn delete_artwork(&self, sk: Uuid) -> Result<u64, StoreError>;

    /// Add one vote to an artwork. The aggregate total moves with it.
    async fn increment_votes(&self, sk: Uuid) -> Result<VoteCount, StoreError>;

    /// Remove one vote from an artwork, never going below zero. The
    /// aggregate total moves only if the artwork counter did.
    async fn decrement_votes(&self, sk: Uuid) -> Result<VoteCount, StoreError>;

    /// Total of all active votes, equal to the sum of artwork counters.
    async fn total_votes(&self) -> Result<i64, StoreError>;

    async fn get_user(&self, sk: Uuid) -> Result<User, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Delete a user whose vote pointer still equals `expected`, removing
    /// that vote from its artwork in the same step. Returns the artwork's
    /// counter after the release, or `None` if the user held no vote or the
    /// artwork is gone.
    ///
    /// Fails with [`StoreError::Conflict`] if the pointer moved.
    async fn delete_user(
        &self,
        sk: Uuid,
        expected: Option<Uuid>,
    ) -> Result<Option<VoteCount>, StoreError>;

    /// Apply a vote change atomically.
    ///
    /// Fails with [`StoreError::UserNotFound`] or
    /// [`StoreError::ArtworkNotFound`] if a referenced record is missing, and
    /// with [`StoreError::Conflict`] if the user's pointer no longer equals
    /// `change.expected`. Nothing is written on failure.
    async fn apply_vote(&self, change: VoteChange) -> Result<VoteReceipt, StoreError>;

    async fn audit(&self) -> Result<TallyAudit, StoreError>;
}

/// Log a decrement that hit the zero floor.
pub(crate) fn log_clamp(count: &VoteCount) {
    if count.clamped {
        tracing::warn!(
            artwork_sk = %count.sk,
            "Vote decrement clamped at zero; counter was already empty"
        );
    }
}
