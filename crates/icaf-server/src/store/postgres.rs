//! PostgreSQL backend.
//!
//! The aggregate total is derived with `SUM(votes)` rather than stored, so it
//! cannot drift from the artwork counters. Multi-row writes run in a single
//! transaction and lock artwork rows in ascending `sk` order before any user
//! row.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{log_clamp, StoreError, TallyAudit, VoteChange, VoteCount, VoteReceipt, VoteStore};
use crate::models::{Artwork, NewArtwork, NewUser, User};

/// Vote store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Add one vote to an artwork inside an open transaction.
async fn increment_in(conn: &mut PgConnection, sk: Uuid) -> Result<VoteCount, StoreError> {
    let votes: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE artworks
        SET votes = votes + 1
        WHERE sk = $1
        RETURNING votes
        "#,
    )
    .bind(sk)
    .fetch_optional(&mut *conn)
    .await?;

    votes
        .map(|votes| VoteCount {
            sk,
            votes,
            clamped: false,
        })
        .ok_or(StoreError::ArtworkNotFound(sk))
}

/// Lock an artwork row until the transaction ends. Returns its vote counter,
/// or `None` if the row does not exist.
async fn lock_artwork(conn: &mut PgConnection, sk: Uuid) -> Result<Option<i64>, StoreError> {
    let votes: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT votes
        FROM artworks
        WHERE sk = $1
        FOR UPDATE
        "#,
    )
    .bind(sk)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(votes)
}

/// Remove one vote from an artwork inside an open transaction, flooring at zero.
async fn decrement_in(conn: &mut PgConnection, sk: Uuid) -> Result<VoteCount, StoreError> {
    let current = lock_artwork(&mut *conn, sk)
        .await?
        .ok_or(StoreError::ArtworkNotFound(sk))?;
    if current <= 0 {
        return Ok(VoteCount {
            sk,
            votes: 0,
            clamped: true,
        });
    }

    let votes: i64 = sqlx::query_scalar(
        r#"
        UPDATE artworks
        SET votes = votes - 1
        WHERE sk = $1
        RETURNING votes
        "#,
    )
    .bind(sk)
    .fetch_one(&mut *conn)
    .await?;

    Ok(VoteCount {
        sk,
        votes,
        clamped: false,
    })
}

#[async_trait]
impl VoteStore for PgStore {
    async fn get_artwork(&self, sk: Uuid) -> Result<Artwork, StoreError> {
        sqlx::query_as::<_, Artwork>("SELECT * FROM artworks WHERE sk = $1")
            .bind(sk)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::ArtworkNotFound(sk))
    }

    async fn create_artwork(&self, artwork: NewArtwork) -> Result<Artwork, StoreError> {
        let artwork = artwork.into_artwork(Utc::now());

        let created = sqlx::query_as::<_, Artwork>(
            r#"
            INSERT INTO artworks (
                sk, f_name, age, description, sport, location,
                is_ai_gen, model, prompt, file_type, votes, is_approved, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(artwork.sk)
        .bind(&artwork.f_name)
        .bind(artwork.age)
        .bind(&artwork.description)
        .bind(&artwork.sport)
        .bind(&artwork.location)
        .bind(artwork.is_ai_gen)
        .bind(&artwork.model)
        .bind(&artwork.prompt)
        .bind(artwork.file_type)
        .bind(artwork.votes)
        .bind(artwork.is_approved)
        .bind(artwork.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn query_artworks(&self, is_approved: Option<bool>) -> Result<Vec<Artwork>, StoreError> {
        let artworks = sqlx::query_as::<_, Artwork>(
            r#"
            SELECT *
            FROM artworks
            WHERE $1::BOOLEAN IS NULL OR is_approved = $1
            ORDER BY created_at ASC, sk ASC
            "#,
        )
        .bind(is_approved)
        .fetch_all(&self.pool)
        .await?;

        Ok(artworks)
    }

    async fn approve_artwork(&self, sk: Uuid, is_approved: bool) -> Result<Artwork, StoreError> {
        sqlx::query_as::<_, Artwork>(
            r#"
            UPDATE artworks
            SET is_approved = $2
            WHERE sk = $1
            RETURNING *
            "#,
        )
        .bind(sk)
        .bind(is_approved)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ArtworkNotFound(sk))
    }

    async fn delete_artwork(&self, sk: Uuid) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Artwork row first, then users: same lock order as apply_vote. A vote
        // into this artwork either committed before the lock was granted, so
        // its pointer is released below, or finds the row gone afterwards.
        lock_artwork(&mut *tx, sk)
            .await?
            .ok_or(StoreError::ArtworkNotFound(sk))?;

        let released = sqlx::query("UPDATE users SET voted_sk = NULL WHERE voted_sk = $1")
            .bind(sk)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM artworks WHERE sk = $1")
            .bind(sk)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(released)
    }

    async fn increment_votes(&self, sk: Uuid) -> Result<VoteCount, StoreError> {
        let mut conn = self.pool.acquire().await?;
        increment_in(&mut *conn, sk).await
    }

    async fn decrement_votes(&self, sk: Uuid) -> Result<VoteCount, StoreError> {
        let mut tx = self.pool.begin().await?;
        let count = decrement_in(&mut *tx, sk).await?;
        tx.commit().await?;

        log_clamp(&count);
        Ok(count)
    }

    async fn total_votes(&self) -> Result<i64, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(votes), 0)::BIGINT FROM artworks")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn get_user(&self, sk: Uuid) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE sk = $1")
            .bind(sk)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::UserNotFound(sk))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user(Utc::now());

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                sk, email, f_name, l_name, voted_sk, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.sk)
        .bind(&user.email)
        .bind(&user.f_name)
        .bind(&user.l_name)
        .bind(user.voted_sk)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn delete_user(
        &self,
        sk: Uuid,
        expected: Option<Uuid>,
    ) -> Result<Option<VoteCount>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let backed = match expected {
            Some(artwork_sk) => lock_artwork(&mut *tx, artwork_sk).await?.is_some(),
            None => false,
        };

        let deleted = sqlx::query(
            r#"
            DELETE FROM users
            WHERE sk = $1 AND voted_sk IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(sk)
        .bind(expected)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE sk = $1)")
                    .bind(sk)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                StoreError::Conflict(format!("vote pointer of user {} changed", sk))
            } else {
                StoreError::UserNotFound(sk)
            });
        }

        let released = match expected {
            Some(artwork_sk) if backed => Some(decrement_in(&mut *tx, artwork_sk).await?),
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

        tx.commit().await?;

        if let Some(count) = &released {
            log_clamp(count);
        }
        Ok(released)
    }

    async fn apply_vote(&self, change: VoteChange) -> Result<VoteReceipt, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock order for every multi-row write: artwork rows in ascending sk,
        // then the user row.
        let mut rows = vec![change.target];
        if let Some(old) = change.expected.filter(|old| *old != change.target) {
            rows.push(old);
        }
        rows.sort();

        let mut target_votes = None;
        let mut previous_exists = false;
        for sk in rows {
            let votes = lock_artwork(&mut *tx, sk).await?;
            if sk == change.target {
                target_votes = votes;
            } else {
                previous_exists = votes.is_some();
            }
        }
        let target_votes = target_votes.ok_or(StoreError::ArtworkNotFound(change.target))?;

        // Compare-and-swap on the pointer. The row lock taken here serializes
        // concurrent votes by the same user until commit.
        let swapped = sqlx::query(
            r#"
            UPDATE users
            SET voted_sk = $3
            WHERE sk = $1 AND voted_sk IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(change.user_sk)
        .bind(change.expected)
        .bind(change.target)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if swapped == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE sk = $1)")
                    .bind(change.user_sk)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                StoreError::Conflict(format!("vote pointer of user {} changed", change.user_sk))
            } else {
                StoreError::UserNotFound(change.user_sk)
            });
        }

        if change.expected == Some(change.target) {
            let target = VoteCount {
                sk: change.target,
                votes: target_votes,
                clamped: false,
            };
            tx.commit().await?;
            return Ok(VoteReceipt {
                previous: Some(target),
                target,
            });
        }

        let previous = match change.expected {
            Some(old) if previous_exists => Some(decrement_in(&mut *tx, old).await?),
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
        let target = increment_in(&mut *tx, change.target).await?;

        tx.commit().await?;

        if let Some(count) = &previous {
            log_clamp(count);
        }
        Ok(VoteReceipt { previous, target })
    }

    async fn audit(&self) -> Result<TallyAudit, StoreError> {
        let audit = sqlx::query_as::<_, TallyAudit>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(votes), 0)::BIGINT FROM artworks) AS total_votes,
                (SELECT COUNT(*) FROM users WHERE voted_sk IS NOT NULL) AS active_voters,
                (
                    SELECT COUNT(*)
                    FROM users u
                    WHERE u.voted_sk IS NOT NULL
                      AND NOT EXISTS (SELECT 1 FROM artworks a WHERE a.sk = u.voted_sk)
                ) AS dangling_votes,
                (
                    SELECT COUNT(*)
                    FROM artworks a
                    WHERE a.votes <> (SELECT COUNT(*) FROM users u WHERE u.voted_sk = a.sk)
                ) AS drifted_artworks
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(audit)
    }
}
