/// Identity lookup seam for the recovery verifier
///
/// The verifier consumes the persistence layer through this trait so the
/// attempt state machine can be exercised against an in-memory directory
/// in tests. `PgDirectory` is the production implementation over the
/// models.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::security_answer::{AnswerError, SecurityAnswer};
use crate::models::security_question::SecurityQuestion;
use crate::models::user::User;

/// Directory error
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Answer verification error
    #[error("Answer verification error: {0}")]
    Answer(#[from] AnswerError),
}

/// The slice of a user account the verifier needs
#[derive(Debug, Clone)]
pub struct RecoveryUser {
    /// User ID
    pub id: Uuid,

    /// Login name as stored
    pub username: String,

    /// Current stored password hash (the reset token binds to it)
    pub password_hash: String,

    /// Whether the account may recover its password
    pub is_active: bool,
}

/// Persistence collaborator of the recovery verifier
#[async_trait]
pub trait RecoveryDirectory: Send + Sync {
    /// Looks up a user by username
    ///
    /// Case rules are the identity store's concern (the users table is
    /// CITEXT-keyed).
    async fn find_user(&self, username: &str) -> Result<Option<RecoveryUser>, DirectoryError>;

    /// Verifies a submitted answer against the stored one
    ///
    /// Returns false when no answer is stored for the pair. The production
    /// implementation upgrades stale hash schemes on success.
    async fn check_answer(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        raw_answer: &str,
    ) -> Result<bool, DirectoryError>;

    /// Lists the site's live security questions
    async fn site_questions(&self, site_id: Uuid) -> Result<Vec<SecurityQuestion>, DirectoryError>;
}

/// Production directory over the Postgres models
pub struct PgDirectory<'a> {
    db: &'a PgPool,
}

impl<'a> PgDirectory<'a> {
    pub fn new(db: &'a PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<'a> RecoveryDirectory for PgDirectory<'a> {
    async fn find_user(&self, username: &str) -> Result<Option<RecoveryUser>, DirectoryError> {
        let user = User::find_by_username(self.db, username).await?;

        Ok(user.map(|u| RecoveryUser {
            id: u.id,
            username: u.username,
            password_hash: u.password_hash,
            is_active: u.is_active,
        }))
    }

    async fn check_answer(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        raw_answer: &str,
    ) -> Result<bool, DirectoryError> {
        match SecurityAnswer::find(self.db, user_id, question_id).await? {
            Some(answer) => Ok(answer.check_and_upgrade(self.db, raw_answer).await?),
            None => Ok(false),
        }
    }

    async fn site_questions(&self, site_id: Uuid) -> Result<Vec<SecurityQuestion>, DirectoryError> {
        Ok(SecurityQuestion::list_for_site(self.db, site_id).await?)
    }
}
