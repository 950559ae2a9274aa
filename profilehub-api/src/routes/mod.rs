/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh
/// - `recovery`: Forgot-password challenge and reset-password
/// - `profile`: Profile view/edit and password change
/// - `settings`: Per-site registration field configuration
/// - `export`: Frontend users CSV export

pub mod auth;
pub mod export;
pub mod health;
pub mod profile;
pub mod recovery;
pub mod settings;
