/// Password-reset tokens
///
/// A reset token is granted by the recovery verifier after a successful
/// security-question challenge. It is:
///
/// - **bound to one user** (`sub` claim),
/// - **time-bound** (1 hour by default),
/// - **single-use**: the claims embed a fingerprint of the password hash
///   the token was issued against, so the token stops validating the
///   moment the password changes. No server-side token table is needed.
///
/// Validation failures are not distinguished for the caller; the reset
/// endpoint surfaces them all as one forbidden outcome.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Purpose marker so a login token can never pass as a reset token
const PURPOSE: &str = "password_reset";

/// How long a reset token stays valid
fn reset_token_ttl() -> Duration {
    Duration::hours(1)
}

/// Error type for reset-token operations
#[derive(Debug, thiserror::Error)]
pub enum ResetTokenError {
    /// Failed to create token
    #[error("Failed to create reset token: {0}")]
    CreateError(String),

    /// Token is invalid, expired, or bound to a different identity
    #[error("Invalid reset token")]
    Invalid,
}

/// Claims carried by a reset token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    /// Subject - user ID the reset is bound to
    pub sub: Uuid,

    /// Issuer - always "profilehub"
    pub iss: String,

    /// Purpose marker - always "password_reset"
    pub purpose: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Fingerprint of the password hash the token was issued against
    pub pfp: String,
}

/// Fingerprint of a stored password hash
///
/// SHA-256 of the hash string, truncated to 16 hex characters. Enough to
/// detect that the password changed; reveals nothing about the hash.
fn fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Issues a reset token for a user
///
/// # Arguments
///
/// * `user_id` - User the token is bound to
/// * `password_hash` - The user's current stored password hash
/// * `secret` - Signing secret
///
/// # Errors
///
/// Returns `ResetTokenError::CreateError` if signing fails
pub fn issue(user_id: Uuid, password_hash: &str, secret: &str) -> Result<String, ResetTokenError> {
    let now = Utc::now();

    let claims = ResetClaims {
        sub: user_id,
        iss: "profilehub".to_string(),
        purpose: PURPOSE.to_string(),
        iat: now.timestamp(),
        exp: (now + reset_token_ttl()).timestamp(),
        pfp: fingerprint(password_hash),
    };

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, &claims, &key)
        .map_err(|e| ResetTokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a reset token against a user's current state
///
/// Checks signature, expiry, issuer, purpose, subject binding, and the
/// password-hash fingerprint. Every failure collapses to
/// `ResetTokenError::Invalid`; the cause is logged, never surfaced.
pub fn validate(
    token: &str,
    user_id: Uuid,
    current_password_hash: &str,
    secret: &str,
) -> Result<ResetClaims, ResetTokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["profilehub"]);
    validation.validate_exp = true;

    let claims = match decode::<ResetClaims>(token, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "Reset token failed signature/expiry validation");
            return Err(ResetTokenError::Invalid);
        }
    };

    if claims.purpose != PURPOSE {
        tracing::debug!("Reset token carries wrong purpose");
        return Err(ResetTokenError::Invalid);
    }

    if claims.sub != user_id {
        tracing::debug!("Reset token bound to a different user");
        return Err(ResetTokenError::Invalid);
    }

    if claims.pfp != fingerprint(current_password_hash) {
        tracing::debug!("Reset token issued against a superseded password hash");
        return Err(ResetTokenError::Invalid);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_issue_and_validate() {
        let user_id = Uuid::new_v4();
        let hash = "$argon2id$v=19$m=65536,t=3,p=4$abc$def";

        let token = issue(user_id, hash, SECRET).expect("Issue should succeed");
        let claims = validate(&token, user_id, hash, SECRET).expect("Validate should succeed");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.purpose, "password_reset");
    }

    #[test]
    fn test_token_dies_with_password_change() {
        let user_id = Uuid::new_v4();

        let token = issue(user_id, "old-hash", SECRET).expect("Issue should succeed");

        // Valid while the hash is unchanged, dead after it rotates.
        assert!(validate(&token, user_id, "old-hash", SECRET).is_ok());
        assert!(validate(&token, user_id, "new-hash", SECRET).is_err());
    }

    #[test]
    fn test_token_bound_to_user() {
        let token = issue(Uuid::new_v4(), "hash", SECRET).expect("Issue should succeed");

        assert!(validate(&token, Uuid::new_v4(), "hash", SECRET).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, "hash", SECRET).expect("Issue should succeed");

        assert!(validate(&token, user_id, "hash", "other-secret-that-is-32-bytes-long").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, "hash", SECRET).expect("Issue should succeed");
        let tampered = format!("{}x", token);

        assert!(validate(&tampered, user_id, "hash", SECRET).is_err());
    }

    #[test]
    fn test_login_token_rejected_as_reset_token() {
        use crate::auth::jwt::{create_token, Claims, TokenType};

        let user_id = Uuid::new_v4();
        let login = Claims::new(user_id, Uuid::new_v4(), TokenType::Access);
        let token = create_token(&login, SECRET).expect("Create should succeed");

        assert!(validate(&token, user_id, "hash", SECRET).is_err());
    }

    #[test]
    fn test_fingerprint_is_short_and_stable() {
        let fp1 = fingerprint("some-hash");
        let fp2 = fingerprint("some-hash");
        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 16);
        assert_ne!(fp1, fingerprint("other-hash"));
    }
}
