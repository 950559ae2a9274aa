/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id hashing for passwords and security answers,
///   with legacy pbkdf2-sha256 verification for imported hashes
/// - [`jwt`]: Login access/refresh tokens (HS256)
/// - [`reset_token`]: Single-use, time-bound password-reset tokens
/// - [`middleware`]: Axum middleware extracting an authenticated context

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
