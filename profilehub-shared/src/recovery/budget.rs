/// Per-session attempt budget
///
/// The budget is a plain counter cell scoped to one browsing session:
/// initialized from site settings on the first attempt, decremented on
/// every rejection, untouched on acceptance. Once it reaches zero the
/// session is locked and no further decrement happens.

use crate::models::settings::RecoveryPolicy;

/// Attempt budget for one recovery session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryBudget {
    remaining: u32,
}

impl RecoveryBudget {
    /// Loads the budget from its stored value
    ///
    /// A fresh session (nothing stored yet) starts with the policy's full
    /// retry allowance.
    pub fn load(stored: Option<u32>, policy: &RecoveryPolicy) -> Self {
        Self {
            remaining: stored.unwrap_or(policy.max_retries),
        }
    }

    /// Whether the session is locked out
    pub fn is_locked(&self) -> bool {
        self.remaining == 0
    }

    /// Records a rejected attempt
    ///
    /// Never underflows: a locked session stays at zero.
    pub fn record_failure(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Attempts left before lockout
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RecoveryPolicy {
        RecoveryPolicy {
            questions_asked: 2,
            max_retries,
        }
    }

    #[test]
    fn test_fresh_session_gets_full_budget() {
        let budget = RecoveryBudget::load(None, &policy(5));
        assert_eq!(budget.remaining(), 5);
        assert!(!budget.is_locked());
    }

    #[test]
    fn test_stored_value_wins_over_policy() {
        let budget = RecoveryBudget::load(Some(2), &policy(5));
        assert_eq!(budget.remaining(), 2);
    }

    #[test]
    fn test_failures_decrement_to_lockout() {
        let mut budget = RecoveryBudget::load(None, &policy(3));

        budget.record_failure();
        assert_eq!(budget.remaining(), 2);
        budget.record_failure();
        budget.record_failure();
        assert_eq!(budget.remaining(), 0);
        assert!(budget.is_locked());
    }

    #[test]
    fn test_locked_budget_does_not_underflow() {
        let mut budget = RecoveryBudget::load(Some(0), &policy(5));
        assert!(budget.is_locked());

        budget.record_failure();
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_zero_retry_policy_locks_immediately() {
        let budget = RecoveryBudget::load(None, &policy(0));
        assert!(budget.is_locked());
    }
}
