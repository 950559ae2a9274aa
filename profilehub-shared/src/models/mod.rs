/// Database models for ProfileHub
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `site`: Sites partitioning settings, questions, and imported identities
/// - `user`: User accounts; creating a user atomically creates its profile
/// - `profile`: One-to-one profile extension of a user
/// - `security_question`: Per-site question index and questions
/// - `security_answer`: Hashed answers bound to (profile, question)
/// - `settings`: Per-site registration and recovery configuration

pub mod profile;
pub mod security_answer;
pub mod security_question;
pub mod settings;
pub mod site;
pub mod user;
