//! Vote casting: one active vote per user, transferable between artworks.
//!
//! A cast reads the user's current pointer, decides between a first vote, a
//! duplicate and a transfer, then hands a [`VoteChange`] to the store. The
//! store applies it only if the pointer is still what was read; when another
//! request got there first the whole decision is re-run on fresh state.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::models::User;
use crate::store::{StoreError, VoteChange, VoteCount, VoteStore};

/// Default number of read-decide-write rounds before giving up.
pub const DEFAULT_MAX_VOTE_ATTEMPTS: u32 = 5;

/// How a successful cast changed the user's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    /// The user had no vote; the total grew by one.
    First,
    /// The vote moved from another artwork; the total is unchanged.
    Transfer,
}

/// Result of a successful cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub kind: VoteKind,
    pub user_sk: Uuid,
    pub artwork_sk: Uuid,
    /// Artwork the vote was moved away from, on a transfer.
    pub previous_sk: Option<Uuid>,
    /// Vote count of `artwork_sk` right after the cast.
    pub votes: i64,
    /// Rounds needed, including the successful one.
    pub attempts: u32,
}

impl VoteOutcome {
    pub fn message(&self) -> &'static str {
        match self.kind {
            VoteKind::First => "Vote added successfully",
            VoteKind::Transfer => "Vote changed successfully",
        }
    }
}

/// Reasons a cast can fail.
#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("User not found")]
    UserNotFound(Uuid),

    #[error("Artwork not found")]
    ArtworkNotFound(Uuid),

    #[error("Cannot vote twice for the same artwork")]
    DuplicateVote,

    #[error("Vote not applied after {attempts} attempts due to concurrent updates")]
    Contention { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for VoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound(sk) => VoteError::UserNotFound(sk),
            StoreError::ArtworkNotFound(sk) => VoteError::ArtworkNotFound(sk),
            other => VoteError::Store(other),
        }
    }
}

/// Decide what a vote for `artwork_sk` means for this user.
pub fn plan_vote(user: &User, artwork_sk: Uuid) -> Result<VoteChange, VoteError> {
    match user.voted_sk {
        None => Ok(VoteChange::first(user.sk, artwork_sk)),
        Some(current) if current == artwork_sk => Err(VoteError::DuplicateVote),
        Some(current) => Ok(VoteChange::transfer(user.sk, current, artwork_sk)),
    }
}

/// Casts votes against a [`VoteStore`].
#[derive(Clone)]
pub struct VoteEngine {
    store: Arc<dyn VoteStore>,
    max_attempts: u32,
}

impl VoteEngine {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_VOTE_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<dyn VoteStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Cast `user_sk`'s vote for `artwork_sk`.
    ///
    /// Both records must exist. Voting again for the artwork the user
    /// already backs fails with [`VoteError::DuplicateVote`] and changes
    /// nothing. A vote cannot be withdrawn, only moved.
    pub async fn cast_vote(&self, user_sk: Uuid, artwork_sk: Uuid) -> Result<VoteOutcome, VoteError> {
        for attempt in 1..=self.max_attempts {
            let user = self.store.get_user(user_sk).await?;
            let change = plan_vote(&user, artwork_sk)?;

            match self.store.apply_vote(change).await {
                Ok(receipt) => {
                    let outcome = VoteOutcome {
                        kind: if change.expected.is_some() {
                            VoteKind::Transfer
                        } else {
                            VoteKind::First
                        },
                        user_sk,
                        artwork_sk,
                        previous_sk: change.expected,
                        votes: receipt.target.votes,
                        attempts: attempt,
                    };
                    tracing::info!(
                        %user_sk,
                        %artwork_sk,
                        previous_sk = ?outcome.previous_sk,
                        kind = ?outcome.kind,
                        votes = outcome.votes,
                        attempts = attempt,
                        "Vote cast"
                    );
                    return Ok(outcome);
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(%user_sk, %artwork_sk, attempt, error = %e, "Vote conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            %user_sk,
            %artwork_sk,
            attempts = self.max_attempts,
            "Vote abandoned after repeated conflicts"
        );
        Err(VoteError::Contention {
            attempts: self.max_attempts,
        })
    }

    /// Delete a user account, taking its vote off the tally in the same step.
    ///
    /// Returns the counter of the artwork that lost the vote, if any. Races
    /// with the user's own votes are retried like [`cast_vote`](Self::cast_vote).
    pub async fn delete_user(&self, user_sk: Uuid) -> Result<Option<VoteCount>, VoteError> {
        for attempt in 1..=self.max_attempts {
            let user = self.store.get_user(user_sk).await?;

            match self.store.delete_user(user_sk, user.voted_sk).await {
                Ok(released) => {
                    tracing::info!(
                        %user_sk,
                        released_sk = ?released.map(|c| c.sk),
                        attempts = attempt,
                        "User deleted"
                    );
                    return Ok(released);
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(%user_sk, attempt, error = %e, "User delete conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            %user_sk,
            attempts = self.max_attempts,
            "User delete abandoned after repeated conflicts"
        );
        Err(VoteError::Contention {
            attempts: self.max_attempts,
        })
    }
}
