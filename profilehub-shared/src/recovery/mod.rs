/// Security-question password recovery
///
/// The recovery flow is a brute-force-resistant challenge protocol:
/// a browsing session gets a fixed budget of attempts; each attempt
/// presents a random subset of the site's security questions; only a
/// fully-correct set of answers yields a reset token.
///
/// # Modules
///
/// - [`budget`]: Per-session attempt budget semantics
/// - [`store`]: Attempt-counter storage (Redis-backed, in-memory for tests)
/// - [`directory`]: Identity lookup seam over the persistence layer
/// - [`verifier`]: The attempt state machine tying it together
///
/// # Protocol
///
/// ```text
/// Fresh session ──first attempt──> budget = retries from site settings
/// Active (budget > 0):
///   wrong/unknown/inactive  ─> generic rejection, budget -= 1
///   all answers correct     ─> reset token issued, counter flushed
/// Locked (budget == 0):
///   any attempt             ─> lockout rejection, budget untouched
/// ```
///
/// Unknown-username, inactive-account, and wrong-answer rejections are
/// indistinguishable to the caller; only logs record the cause.

pub mod budget;
pub mod directory;
pub mod store;
pub mod verifier;

pub use budget::RecoveryBudget;
pub use directory::{DirectoryError, PgDirectory, RecoveryDirectory, RecoveryUser};
pub use store::{AttemptStore, MemoryAttemptStore, RedisAttemptStore, StoreError};
pub use verifier::{AttemptOutcome, RecoveryError, RecoveryVerifier, SubmittedAnswer};
