/// Password-recovery attempt verifier
///
/// Decides whether a recovery attempt earns a reset token, under the
/// session attempt budget. All rejection causes surface as one
/// indistinguishable [`AttemptOutcome::Rejected`]; the cause is only
/// logged. Lockout is the single distinct failure outcome.
///
/// The verifier is handed its configuration ([`RecoveryPolicy`]) and its
/// collaborators (directory, attempt store, token secret) explicitly; it
/// never reads ambient site state.

use rand::seq::SliceRandom;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::reset_token::{self, ResetTokenError};
use crate::models::security_question::SecurityQuestion;
use crate::models::settings::RecoveryPolicy;
use crate::recovery::budget::RecoveryBudget;
use crate::recovery::directory::{DirectoryError, RecoveryDirectory};
use crate::recovery::store::{AttemptStore, StoreError};

/// Recovery error
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Attempt store failure
    #[error("Attempt store error: {0}")]
    Store(#[from] StoreError),

    /// Identity lookup failure
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Token issuance failure
    #[error("Reset token error: {0}")]
    Token(#[from] ResetTokenError),
}

/// One answered question of a recovery attempt
#[derive(Debug, Clone)]
pub struct SubmittedAnswer {
    /// Question being answered
    pub question_id: Uuid,

    /// Raw answer as typed (normalized during comparison)
    pub answer: String,
}

/// Result of one recovery attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Every presented answer matched; a reset token was issued and the
    /// session counter flushed
    Granted {
        user_id: Uuid,
        username: String,
        reset_token: String,
    },

    /// Generic rejection: unknown user, inactive account, or wrong
    /// answers. Indistinguishable by design; the budget was decremented.
    Rejected,

    /// The session's attempt budget is exhausted; nothing was evaluated
    /// and the budget was not decremented further
    LockedOut,
}

/// Internal rejection cause, logged but never surfaced
#[derive(Debug, Clone, Copy)]
enum RejectionCause {
    UnknownUser,
    InactiveAccount,
    WrongAnswers,
}

/// The recovery attempt state machine
pub struct RecoveryVerifier<'a, D, S>
where
    D: RecoveryDirectory + ?Sized,
    S: AttemptStore + ?Sized,
{
    directory: &'a D,
    attempts: &'a S,
    policy: RecoveryPolicy,
    token_secret: &'a str,
}

impl<'a, D, S> RecoveryVerifier<'a, D, S>
where
    D: RecoveryDirectory + ?Sized,
    S: AttemptStore + ?Sized,
{
    pub fn new(directory: &'a D, attempts: &'a S, policy: RecoveryPolicy, token_secret: &'a str) -> Self {
        Self {
            directory,
            attempts,
            policy,
            token_secret,
        }
    }

    /// Selects the question challenge for one attempt
    ///
    /// Draws `questions_asked` questions from the site's set without
    /// replacement, in a fresh random order per attempt. Returns fewer
    /// only when the site has fewer questions than configured.
    pub async fn select_challenge(
        &self,
        site_id: Uuid,
    ) -> Result<Vec<SecurityQuestion>, RecoveryError> {
        let mut questions = self.directory.site_questions(site_id).await?;

        let mut rng = rand::thread_rng();
        questions.shuffle(&mut rng);
        questions.truncate(self.policy.questions_asked);

        Ok(questions)
    }

    /// Evaluates one recovery attempt
    ///
    /// The state machine:
    ///
    /// - Locked session (budget exhausted): immediate [`AttemptOutcome::LockedOut`],
    ///   no further decrement.
    /// - Unknown username, inactive account, missing stored answer, or any
    ///   single mismatch: [`AttemptOutcome::Rejected`], budget decremented
    ///   by one.
    /// - All presented answers match: [`AttemptOutcome::Granted`] with a
    ///   single-use reset token; budget untouched, counter flushed.
    pub async fn evaluate(
        &self,
        session_key: &str,
        username: &str,
        answers: &[SubmittedAnswer],
    ) -> Result<AttemptOutcome, RecoveryError> {
        let stored = self.attempts.get(session_key).await?;
        let budget = RecoveryBudget::load(stored, &self.policy);

        if budget.is_locked() {
            tracing::info!(username, "Recovery attempt while locked out");
            return Ok(AttemptOutcome::LockedOut);
        }

        let user = match self.directory.find_user(username).await? {
            None => {
                return self
                    .reject(session_key, budget, RejectionCause::UnknownUser)
                    .await
            }
            Some(user) if !user.is_active => {
                return self
                    .reject(session_key, budget, RejectionCause::InactiveAccount)
                    .await
            }
            Some(user) => user,
        };

        if !self.challenge_is_complete(answers) {
            return self
                .reject(session_key, budget, RejectionCause::WrongAnswers)
                .await;
        }

        // Every presented answer is checked; a single mismatch (or missing
        // stored answer) fails the whole attempt.
        let mut all_match = true;
        for submitted in answers {
            let matched = self
                .directory
                .check_answer(user.id, submitted.question_id, &submitted.answer)
                .await?;
            if !matched {
                all_match = false;
            }
        }

        if !all_match {
            return self
                .reject(session_key, budget, RejectionCause::WrongAnswers)
                .await;
        }

        let token = reset_token::issue(user.id, &user.password_hash, self.token_secret)?;
        self.attempts.clear(session_key).await?;

        tracing::info!(user_id = %user.id, "Recovery challenge passed, reset token issued");

        Ok(AttemptOutcome::Granted {
            user_id: user.id,
            username: user.username,
            reset_token: token,
        })
    }

    /// Whether the submission covers the whole challenge
    ///
    /// Requires at least one answer and as many distinct questions as the
    /// policy asks for, so a client cannot shrink the challenge.
    fn challenge_is_complete(&self, answers: &[SubmittedAnswer]) -> bool {
        if answers.is_empty() {
            return false;
        }

        let distinct: HashSet<Uuid> = answers.iter().map(|a| a.question_id).collect();
        distinct.len() >= self.policy.questions_asked
    }

    async fn reject(
        &self,
        session_key: &str,
        mut budget: RecoveryBudget,
        cause: RejectionCause,
    ) -> Result<AttemptOutcome, RecoveryError> {
        budget.record_failure();
        self.attempts.put(session_key, budget.remaining()).await?;

        tracing::info!(
            ?cause,
            remaining = budget.remaining(),
            "Recovery attempt rejected"
        );

        Ok(AttemptOutcome::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{password, reset_token};
    use crate::recovery::directory::RecoveryUser;
    use crate::recovery::store::MemoryAttemptStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    /// In-memory directory: answers stored as normalized plaintext so
    /// tests exercise the state machine, not the hashing (password.rs
    /// covers that).
    struct MockDirectory {
        users: Vec<RecoveryUser>,
        answers: HashMap<(Uuid, Uuid), String>,
        questions: Vec<SecurityQuestion>,
    }

    impl MockDirectory {
        fn new() -> Self {
            Self {
                users: Vec::new(),
                answers: HashMap::new(),
                questions: Vec::new(),
            }
        }

        fn with_user(mut self, username: &str, is_active: bool) -> (Self, Uuid) {
            let id = Uuid::new_v4();
            self.users.push(RecoveryUser {
                id,
                username: username.to_string(),
                password_hash: "$argon2id$stored-hash".to_string(),
                is_active,
            });
            (self, id)
        }

        fn with_answer(mut self, user_id: Uuid, answer: &str) -> (Self, Uuid) {
            let question_id = Uuid::new_v4();
            self.answers.insert(
                (user_id, question_id),
                password::normalize_answer(answer),
            );
            (self, question_id)
        }

        fn with_question(mut self, title: &str) -> Self {
            self.questions.push(SecurityQuestion {
                id: Uuid::new_v4(),
                index_id: Uuid::new_v4(),
                title: title.to_string(),
                sort_order: self.questions.len() as i32,
                created_at: Utc::now(),
            });
            self
        }
    }

    #[async_trait]
    impl RecoveryDirectory for MockDirectory {
        async fn find_user(&self, username: &str) -> Result<Option<RecoveryUser>, DirectoryError> {
            Ok(self
                .users
                .iter()
                .find(|u| u.username.eq_ignore_ascii_case(username))
                .cloned())
        }

        async fn check_answer(
            &self,
            user_id: Uuid,
            question_id: Uuid,
            raw_answer: &str,
        ) -> Result<bool, DirectoryError> {
            Ok(self
                .answers
                .get(&(user_id, question_id))
                .map(|stored| *stored == password::normalize_answer(raw_answer))
                .unwrap_or(false))
        }

        async fn site_questions(
            &self,
            _site_id: Uuid,
        ) -> Result<Vec<SecurityQuestion>, DirectoryError> {
            Ok(self.questions.clone())
        }
    }

    fn policy(questions_asked: usize, max_retries: u32) -> RecoveryPolicy {
        RecoveryPolicy {
            questions_asked,
            max_retries,
        }
    }

    fn submitted(question_id: Uuid, answer: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id,
            answer: answer.to_string(),
        }
    }

    #[tokio::test]
    async fn test_all_correct_answers_grant_token() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let (dir, q2) = dir.with_answer(user_id, "blue");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(2, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(q1, "rover"), submitted(q2, "blue")])
            .await
            .unwrap();

        match outcome {
            AttemptOutcome::Granted {
                user_id: granted_id,
                reset_token: token,
                ..
            } => {
                assert_eq!(granted_id, user_id);
                // The token is valid against the stored password hash.
                assert!(
                    reset_token::validate(&token, user_id, "$argon2id$stored-hash", SECRET).is_ok()
                );
            }
            other => panic!("Expected Granted, got {:?}", other),
        }

        // Counter flushed on success.
        assert_eq!(store.get("sess").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_answers_match_after_normalization() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "Rover");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(1, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(q1, "  ROVER ")])
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Granted { .. }));
    }

    #[tokio::test]
    async fn test_single_wrong_answer_rejects_whole_attempt() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let (dir, q2) = dir.with_answer(user_id, "blue");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(2, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(q1, "rover"), submitted(q2, "green")])
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Rejected));
        assert_eq!(store.get("sess").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_unknown_user_rejects_and_decrements() {
        let dir = MockDirectory::new();
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(1, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "nobody", &[submitted(Uuid::new_v4(), "x")])
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Rejected));
        assert_eq!(store.get("sess").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_inactive_user_rejects_like_unknown() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", false);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(1, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(q1, "rover")])
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Rejected));
        assert_eq!(store.get("sess").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_missing_stored_answer_is_a_mismatch() {
        let (dir, _) = MockDirectory::new().with_user("codie", true);
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(1, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(Uuid::new_v4(), "anything")])
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Rejected));
    }

    #[tokio::test]
    async fn test_incomplete_challenge_rejects() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let store = MemoryAttemptStore::new();

        // Two questions asked, only one answered.
        let verifier = RecoveryVerifier::new(&dir, &store, policy(2, 5), SECRET);
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(q1, "rover")])
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Rejected));
    }

    #[tokio::test]
    async fn test_duplicate_question_cannot_shrink_challenge() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(2, 5), SECRET);
        let outcome = verifier
            .evaluate(
                "sess",
                "codie",
                &[submitted(q1, "rover"), submitted(q1, "rover")],
            )
            .await
            .unwrap();

        assert!(matches!(outcome, AttemptOutcome::Rejected));
    }

    #[tokio::test]
    async fn test_lockout_after_budget_exhausted() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(1, 5), SECRET);

        // Five wrong attempts exhaust the budget.
        for _ in 0..5 {
            let outcome = verifier
                .evaluate("sess", "codie", &[submitted(q1, "wrong")])
                .await
                .unwrap();
            assert!(matches!(outcome, AttemptOutcome::Rejected));
        }
        assert_eq!(store.get("sess").await.unwrap(), Some(0));

        // The sixth attempt is locked out even with correct answers.
        let outcome = verifier
            .evaluate("sess", "codie", &[submitted(q1, "rover")])
            .await
            .unwrap();
        assert!(matches!(outcome, AttemptOutcome::LockedOut));

        // Lockout does not decrement further.
        assert_eq!(store.get("sess").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (dir, user_id) = MockDirectory::new().with_user("codie", true);
        let (dir, q1) = dir.with_answer(user_id, "rover");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(1, 1), SECRET);

        let outcome = verifier
            .evaluate("sess-a", "codie", &[submitted(q1, "wrong")])
            .await
            .unwrap();
        assert!(matches!(outcome, AttemptOutcome::Rejected));

        // A different session still has its own budget.
        let outcome = verifier
            .evaluate("sess-b", "codie", &[submitted(q1, "rover")])
            .await
            .unwrap();
        assert!(matches!(outcome, AttemptOutcome::Granted { .. }));
    }

    #[tokio::test]
    async fn test_select_challenge_draws_without_replacement() {
        let dir = MockDirectory::new()
            .with_question("First pet?")
            .with_question("Favourite colour?")
            .with_question("Birth town?")
            .with_question("First teacher?")
            .with_question("Favourite meal?");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(3, 5), SECRET);
        let challenge = verifier.select_challenge(Uuid::new_v4()).await.unwrap();

        assert_eq!(challenge.len(), 3);

        let distinct: HashSet<Uuid> = challenge.iter().map(|q| q.id).collect();
        assert_eq!(distinct.len(), 3);

        let site_ids: HashSet<Uuid> = dir.questions.iter().map(|q| q.id).collect();
        for q in &challenge {
            assert!(site_ids.contains(&q.id));
        }
    }

    #[tokio::test]
    async fn test_select_challenge_with_fewer_questions_than_asked() {
        let dir = MockDirectory::new().with_question("First pet?");
        let store = MemoryAttemptStore::new();

        let verifier = RecoveryVerifier::new(&dir, &store, policy(3, 5), SECRET);
        let challenge = verifier.select_challenge(Uuid::new_v4()).await.unwrap();

        assert_eq!(challenge.len(), 1);
    }
}
