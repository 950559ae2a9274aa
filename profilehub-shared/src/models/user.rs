/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing
/// user accounts. A user always has exactly one profile row: `User::create`
/// inserts both in the same transaction rather than relying on an implicit
/// post-save hook.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL,   -- unique on LOWER(username)
///     password_hash VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL DEFAULT '',
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use profilehub_shared::models::user::{User, CreateUser};
/// use profilehub_shared::models::profile::NewProfile;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), sqlx::Error> {
/// let (user, profile) = User::create(
///     &pool,
///     CreateUser {
///         username: "codie".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         ..Default::default()
///     },
///     NewProfile::default(),
/// )
/// .await?;
/// println!("Created user {} with profile {}", user.id, profile.user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::profile::{NewProfile, UserProfile};

/// User model representing an account
///
/// Username lookup is case-insensitive. Passwords are stored as
/// Argon2id hashes, never in plaintext; imported accounts may carry legacy
/// pbkdf2 hashes until their first successful verification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name (unique, case-insensitive)
    pub username: String,

    /// Password hash (PHC string, or legacy `pbkdf2_sha256$...` for
    /// imported accounts)
    pub password_hash: String,

    /// Email address (may be empty when the site doesn't capture it)
    pub email: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Whether the account can log in and recover its password
    pub is_active: bool,

    /// Whether the account may access staff-only endpoints (CSV export)
    pub is_staff: bool,

    /// When the account joined (preserved verbatim for imported accounts)
    pub date_joined: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login: Option<DateTime<Utc>>,

    /// Row creation time
    pub created_at: DateTime<Utc>,

    /// Row update time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Email address
    pub email: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Active flag (imported accounts may arrive disabled)
    pub is_active: bool,

    /// Staff flag
    pub is_staff: bool,

    /// Join date; None = now. The importer passes the legacy join date
    /// through verbatim.
    pub date_joined: Option<DateTime<Utc>>,
}

impl Default for CreateUser {
    fn default() -> Self {
        Self {
            username: String::new(),
            password_hash: String::new(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            date_joined: None,
        }
    }
}

/// One row of the frontend-users CSV export
///
/// Field order matches the export header:
/// `username,email,first_name,last_name,is_staff,date_joined,alias,mobile_number`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FrontendUserExport {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub alias: Option<String>,
    pub mobile_number: Option<String>,
}

impl User {
    /// Creates a new user and its profile atomically
    ///
    /// Both rows are inserted in one transaction; there is no window in
    /// which a user exists without a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the username already exists (unique constraint)
    /// or the database connection fails.
    pub async fn create(
        pool: &PgPool,
        data: CreateUser,
        profile: NewProfile,
    ) -> Result<(Self, UserProfile), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (username, password_hash, email, first_name, last_name,
                 is_active, is_staff, date_joined)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
            RETURNING id, username, password_hash, email, first_name, last_name,
                      is_active, is_staff, date_joined, last_login,
                      created_at, updated_at
            "#,
        )
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(&data.email)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.is_active)
        .bind(data.is_staff)
        .bind(data.date_joined)
        .fetch_one(&mut *tx)
        .await?;

        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles
                (user_id, site_id, date_of_birth, alias, gender, location,
                 education_level, avatar_url, mobile_number, migrated_username)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING user_id, site_id, date_of_birth, alias, gender, location,
                      education_level, avatar_url, mobile_number,
                      migrated_username, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(profile.site_id)
        .bind(profile.date_of_birth)
        .bind(&profile.alias)
        .bind(&profile.gender)
        .bind(&profile.location)
        .bind(&profile.education_level)
        .bind(&profile.avatar_url)
        .bind(&profile.mobile_number)
        .bind(&profile.migrated_username)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, profile))
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, first_name, last_name,
                   is_active, is_staff, date_joined, last_login,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by username (case-insensitive)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, email, first_name, last_name,
                   is_active, is_staff, date_joined, last_login,
                   created_at, updated_at
            FROM users
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Replaces the stored password hash
    ///
    /// Used by the password-change and reset-password flows; the caller has
    /// already hashed the new password.
    pub async fn set_password_hash(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp after successful authentication
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Fetches the rows for the frontend-users CSV export
    ///
    /// Joined with profiles for alias and mobile number, scoped to one
    /// site, ordered by join date (oldest first) so repeated exports are
    /// stable.
    pub async fn export_rows(
        pool: &PgPool,
        site_id: Uuid,
    ) -> Result<Vec<FrontendUserExport>, sqlx::Error> {
        let rows = sqlx::query_as::<_, FrontendUserExport>(
            r#"
            SELECT u.username, u.email, u.first_name, u.last_name,
                   u.is_staff, u.date_joined, p.alias, p.mobile_number
            FROM users u
            JOIN user_profiles p ON p.user_id = u.id
            WHERE p.site_id = $1
            ORDER BY u.date_joined ASC, u.username ASC
            "#,
        )
        .bind(site_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_defaults() {
        let create = CreateUser {
            username: "codie".to_string(),
            password_hash: "hash".to_string(),
            ..Default::default()
        };

        assert!(create.is_active);
        assert!(!create.is_staff);
        assert!(create.date_joined.is_none());
        assert!(create.email.is_empty());
    }

    // Database operations are covered by integration tests.
}
