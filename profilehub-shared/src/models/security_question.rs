/// Security question index and questions
///
/// Each site owns exactly one question index (provisioned when the site is
/// created); questions live under it and are unique by title within the
/// index. `find_or_create` is a single atomic upsert so concurrent imports
/// can never create duplicate questions for the same title.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// The per-site container for security questions
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecurityQuestionIndex {
    pub id: Uuid,
    pub site_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One password-recovery challenge question
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecurityQuestion {
    pub id: Uuid,

    /// Owning index (one per site)
    pub index_id: Uuid,

    /// Question text; unique within the index
    pub title: String,

    /// Display order at registration
    pub sort_order: i32,

    pub created_at: DateTime<Utc>,
}

impl SecurityQuestionIndex {
    /// Fetches the index for a site
    ///
    /// Every site has one; a missing row means the site was created outside
    /// `Site::create` and is a deployment error.
    pub async fn for_site(pool: &PgPool, site_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let index = sqlx::query_as::<_, SecurityQuestionIndex>(
            "SELECT id, site_id, title, created_at FROM security_question_indexes WHERE site_id = $1",
        )
        .bind(site_id)
        .fetch_optional(pool)
        .await?;

        Ok(index)
    }
}

impl SecurityQuestion {
    /// Creates a question under an index
    ///
    /// # Errors
    ///
    /// Returns an error if the title already exists within the index.
    pub async fn create(
        pool: &PgPool,
        index_id: Uuid,
        title: &str,
        sort_order: i32,
    ) -> Result<Self, sqlx::Error> {
        let question = sqlx::query_as::<_, SecurityQuestion>(
            r#"
            INSERT INTO security_questions (index_id, title, sort_order)
            VALUES ($1, $2, $3)
            RETURNING id, index_id, title, sort_order, created_at
            "#,
        )
        .bind(index_id)
        .bind(title)
        .bind(sort_order)
        .fetch_one(pool)
        .await?;

        Ok(question)
    }

    /// Finds a question by exact title, or creates it
    ///
    /// Implemented as one upsert statement so the check-then-create race
    /// under concurrent imports resolves inside the database: both writers
    /// get the same row back.
    pub async fn find_or_create(
        pool: &PgPool,
        index_id: Uuid,
        title: &str,
    ) -> Result<Self, sqlx::Error> {
        let question = sqlx::query_as::<_, SecurityQuestion>(
            r#"
            INSERT INTO security_questions (index_id, title)
            VALUES ($1, $2)
            ON CONFLICT (index_id, title)
                DO UPDATE SET title = EXCLUDED.title
            RETURNING id, index_id, title, sort_order, created_at
            "#,
        )
        .bind(index_id)
        .bind(title)
        .fetch_one(pool)
        .await?;

        Ok(question)
    }

    /// Lists the questions of a site's index in display order
    pub async fn list_for_site(pool: &PgPool, site_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let questions = sqlx::query_as::<_, SecurityQuestion>(
            r#"
            SELECT q.id, q.index_id, q.title, q.sort_order, q.created_at
            FROM security_questions q
            JOIN security_question_indexes i ON i.id = q.index_id
            WHERE i.site_id = $1
            ORDER BY q.sort_order ASC, q.created_at ASC
            "#,
        )
        .bind(site_id)
        .fetch_all(pool)
        .await?;

        Ok(questions)
    }

    /// Counts questions under a site's index
    pub async fn count_for_site(pool: &PgPool, site_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM security_questions q
            JOIN security_question_indexes i ON i.id = q.index_id
            WHERE i.site_id = $1
            "#,
        )
        .bind(site_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}
