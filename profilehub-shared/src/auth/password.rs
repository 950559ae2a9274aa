/// Password and security-answer hashing
///
/// New hashes use Argon2id (64 MB memory, 3 passes, 4 lanes, PHC string
/// format). Verification additionally understands the legacy
/// `pbkdf2_sha256$<iterations>$<salt>$<base64 digest>` format so that
/// passwords and answers carried over verbatim by the importer keep
/// working; `needs_rehash` reports such hashes so callers can upgrade them
/// in place after a successful verification.
///
/// Security answers are normalized (trimmed, lower-cased) before hashing
/// and before every comparison.
///
/// # Example
///
/// ```
/// use profilehub_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("super_secret_password_123")?;
/// assert!(verify_password("super_secret_password_123", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use base64::Engine as _;
use sha2::Sha256;

/// Prefix of the legacy hash format produced by the system users are
/// imported from
const LEGACY_PBKDF2_PREFIX: &str = "pbkdf2_sha256$";

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password using Argon2id
///
/// Parameters: 64 MB memory, 3 iterations, 4 lanes, 16-byte random salt,
/// 32-byte output. The result is a PHC string carrying algorithm,
/// parameters, salt, and hash.
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Dispatches on the hash format: PHC strings go through Argon2, legacy
/// `pbkdf2_sha256$...` strings through PBKDF2-HMAC-SHA256.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if the stored hash is in neither
/// format, `PasswordError::VerifyError` on other verification failures.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if hash.starts_with(LEGACY_PBKDF2_PREFIX) {
        return verify_legacy_pbkdf2(password, hash);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!(
            "Verification failed: {}",
            e
        ))),
    }
}

/// Whether a stored hash should be re-hashed with the current scheme
///
/// True for anything that is not an Argon2id PHC string, i.e. legacy
/// imported hashes.
pub fn needs_rehash(hash: &str) -> bool {
    !hash.starts_with("$argon2id$")
}

/// Normalizes a security answer for hashing and comparison
///
/// Answers are compared trimmed and lower-cased, so "  Rover " and
/// "rover" match.
pub fn normalize_answer(raw_answer: &str) -> String {
    raw_answer.trim().to_lowercase()
}

/// Hashes a security answer (normalized first)
pub fn hash_answer(raw_answer: &str) -> Result<String, PasswordError> {
    hash_password(&normalize_answer(raw_answer))
}

/// Verifies a security answer against a stored hash (normalized first)
pub fn verify_answer(raw_answer: &str, hash: &str) -> Result<bool, PasswordError> {
    verify_password(&normalize_answer(raw_answer), hash)
}

/// Verifies against the legacy `pbkdf2_sha256$iterations$salt$digest`
/// format
fn verify_legacy_pbkdf2(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let mut parts = hash.splitn(4, '$');
    let (_, iterations, salt, digest_b64) = match (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) {
        (Some(algo), Some(iter), Some(salt), Some(digest))
            if algo == "pbkdf2_sha256" && !salt.is_empty() =>
        {
            (algo, iter, salt, digest)
        }
        _ => {
            return Err(PasswordError::InvalidHash(
                "Malformed pbkdf2_sha256 hash".to_string(),
            ))
        }
    };

    let iterations: u32 = iterations
        .parse()
        .map_err(|_| PasswordError::InvalidHash("Bad pbkdf2 iteration count".to_string()))?;
    if iterations == 0 {
        return Err(PasswordError::InvalidHash(
            "Bad pbkdf2 iteration count".to_string(),
        ));
    }

    let expected = base64::engine::general_purpose::STANDARD
        .decode(digest_b64)
        .map_err(|_| PasswordError::InvalidHash("Bad pbkdf2 digest encoding".to_string()))?;

    let mut derived = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        iterations,
        &mut derived,
    );

    Ok(derived == expected)
}

/// Validates password strength
///
/// Minimum requirements: 8+ characters with at least one uppercase letter,
/// one lowercase letter, one digit, and one special character.
///
/// # Example
///
/// ```
/// use profilehub_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("MyP@ssw0rd!").is_ok());
/// assert!(validate_password_strength("Sh0rt!").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_verify_legacy_pbkdf2_roundtrip() {
        // Hash of "hunter2" with 10 iterations and salt "saltsalt",
        // produced by the legacy scheme.
        let salt = "saltsalt";
        let iterations = 10u32;
        let mut digest = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(b"hunter2", salt.as_bytes(), iterations, &mut digest);
        let encoded = base64::engine::general_purpose::STANDARD.encode(digest);
        let hash = format!("pbkdf2_sha256${}${}${}", iterations, salt, encoded);

        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn test_verify_legacy_pbkdf2_malformed() {
        assert!(verify_password("x", "pbkdf2_sha256$notanumber$salt$AAAA").is_err());
        assert!(verify_password("x", "pbkdf2_sha256$10$salt").is_err());
        assert!(verify_password("x", "pbkdf2_sha256$10$salt$!!!").is_err());
    }

    #[test]
    fn test_needs_rehash() {
        let modern = hash_password("pw").expect("Hash should succeed");
        assert!(!needs_rehash(&modern));
        assert!(needs_rehash("pbkdf2_sha256$260000$salt$AAAA"));
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  Rover "), "rover");
        assert_eq!(normalize_answer("BLUE"), "blue");
        assert_eq!(normalize_answer("déjà VU"), "déjà vu");
    }

    #[test]
    fn test_answer_roundtrip_is_normalized() {
        let hash = hash_answer("  My First Dog ").expect("Hash should succeed");

        assert!(verify_answer("my first dog", &hash).unwrap());
        assert!(verify_answer("MY FIRST DOG  ", &hash).unwrap());
        assert!(!verify_answer("my second dog", &hash).unwrap());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("MyP@ssw0rd!").is_ok());

        assert!(validate_password_strength("Sh0rt!").is_err());
        assert!(validate_password_strength("lowercase1!").is_err());
        assert!(validate_password_strength("UPPERCASE1!").is_err());
        assert!(validate_password_strength("NoDigits!").is_err());
        assert!(validate_password_strength("NoSpecial123").is_err());
    }
}
