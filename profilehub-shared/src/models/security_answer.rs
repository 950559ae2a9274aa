/// Security answers
///
/// A security answer binds a user profile to a question, storing only a
/// hash of the normalized (trimmed, lower-cased) response. Answers created
/// at registration are hashed here; answers created by the importer arrive
/// pre-hashed from the legacy system and are stored verbatim.
///
/// Stored hashes are upgraded in place when a legacy-scheme answer
/// verifies successfully (`check_and_upgrade`); nothing else mutates an
/// answer after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::password::{self, PasswordError};

/// Error type for answer verification
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Hashing or verification failure
    #[error("Password operation failed: {0}")]
    Password(#[from] PasswordError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Hashed answer bound to a (profile, question) pair
///
/// `user_id` is None only for rows materialized by a dry-run import, which
/// previews question/answer reconstruction without persisting the user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecurityAnswer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub question_id: Uuid,
    pub answer_hash: String,
    pub created_at: DateTime<Utc>,
}

impl SecurityAnswer {
    /// Creates an answer from a raw response
    ///
    /// The response is normalized (trim + lowercase) before hashing, so
    /// recovery-time comparison is insensitive to case and surrounding
    /// whitespace.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        question_id: Uuid,
        raw_answer: &str,
    ) -> Result<Self, AnswerError> {
        let answer_hash = password::hash_answer(raw_answer)?;

        let answer = sqlx::query_as::<_, SecurityAnswer>(
            r#"
            INSERT INTO security_answers (user_id, question_id, answer_hash)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, question_id, answer_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .bind(&answer_hash)
        .fetch_one(pool)
        .await?;

        Ok(answer)
    }

    /// Creates an answer from an already-hashed value
    ///
    /// Used by the importer: the legacy system hashed the answer, and the
    /// hash is stored exactly as supplied. `user_id` is None in dry-run
    /// mode.
    pub async fn create_prehashed(
        pool: &PgPool,
        user_id: Option<Uuid>,
        question_id: Uuid,
        answer_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let answer = sqlx::query_as::<_, SecurityAnswer>(
            r#"
            INSERT INTO security_answers (user_id, question_id, answer_hash)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, question_id, answer_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .bind(answer_hash)
        .fetch_one(pool)
        .await?;

        Ok(answer)
    }

    /// Fetches the stored answer for a (profile, question) pair
    pub async fn find(
        pool: &PgPool,
        user_id: Uuid,
        question_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let answer = sqlx::query_as::<_, SecurityAnswer>(
            r#"
            SELECT id, user_id, question_id, answer_hash, created_at
            FROM security_answers
            WHERE user_id = $1 AND question_id = $2
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(pool)
        .await?;

        Ok(answer)
    }

    /// Verifies a raw response against the stored hash, upgrading stale
    /// hash schemes on success
    ///
    /// The submitted answer is normalized the same way `create` normalizes
    /// it. If the stored hash verifies but uses a legacy scheme (imported
    /// `pbkdf2_sha256$...`), it is re-hashed with the current scheme and
    /// written back. An unparseable stored hash counts as a mismatch.
    pub async fn check_and_upgrade(&self, pool: &PgPool, raw_answer: &str) -> Result<bool, AnswerError> {
        let matched = match password::verify_answer(raw_answer, &self.answer_hash) {
            Ok(matched) => matched,
            Err(PasswordError::InvalidHash(reason)) => {
                tracing::warn!(answer_id = %self.id, %reason, "Unparseable stored answer hash");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if matched && password::needs_rehash(&self.answer_hash) {
            let upgraded = password::hash_answer(raw_answer)?;
            sqlx::query("UPDATE security_answers SET answer_hash = $2 WHERE id = $1")
                .bind(self.id)
                .bind(&upgraded)
                .execute(pool)
                .await?;
            tracing::debug!(answer_id = %self.id, "Upgraded legacy answer hash");
        }

        Ok(matched)
    }

    /// Counts answers linked to a profile
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM security_answers WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
