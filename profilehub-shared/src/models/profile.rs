/// User profile model
///
/// One-to-one extension of a user. Profiles are created by `User::create`
/// in the same transaction as the user row and cascade-deleted with it.
///
/// `migrated_username` is the legacy-system identifier used to detect
/// whether an imported row has already been reconciled; it is unique per
/// site when set.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Profile row keyed by its user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    /// Owning user (primary key)
    pub user_id: Uuid,

    /// Site the profile belongs to
    pub site_id: Option<Uuid>,

    /// Date of birth, when the site captures it
    pub date_of_birth: Option<NaiveDate>,

    /// Display name shown instead of the username
    pub alias: Option<String>,

    /// Gender, free-form
    pub gender: Option<String>,

    /// Location, free-form
    pub location: Option<String>,

    /// Education level, free-form
    pub education_level: Option<String>,

    /// Avatar image URL
    pub avatar_url: Option<String>,

    /// Mobile number in E.164-ish form (site country code prepended at
    /// registration when missing)
    pub mobile_number: Option<String>,

    /// Legacy-system identifier; set only on imported accounts
    pub migrated_username: Option<String>,

    /// Row creation time
    pub created_at: DateTime<Utc>,

    /// Row update time
    pub updated_at: DateTime<Utc>,
}

/// Profile fields supplied at user creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProfile {
    pub site_id: Option<Uuid>,
    pub date_of_birth: Option<NaiveDate>,
    pub alias: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub education_level: Option<String>,
    pub avatar_url: Option<String>,
    pub mobile_number: Option<String>,
    pub migrated_username: Option<String>,
}

/// Editable profile fields
///
/// Only non-None fields are updated. Username, password, and
/// migrated_username are never edited through this path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub date_of_birth: Option<NaiveDate>,
    pub alias: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub education_level: Option<String>,
    pub avatar_url: Option<String>,
    pub mobile_number: Option<String>,
}

impl UserProfile {
    /// Finds the profile for a user
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, site_id, date_of_birth, alias, gender, location,
                   education_level, avatar_url, mobile_number,
                   migrated_username, created_at, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Finds a profile by migrated username, scoped to a site
    ///
    /// This is the duplicate-import check: a hit means the legacy identity
    /// has already been reconciled and the row must be skipped.
    pub async fn find_by_migrated_username(
        pool: &PgPool,
        site_id: Uuid,
        migrated_username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, site_id, date_of_birth, alias, gender, location,
                   education_level, avatar_url, mobile_number,
                   migrated_username, created_at, updated_at
            FROM user_profiles
            WHERE site_id = $1 AND migrated_username = $2
            "#,
        )
        .bind(site_id)
        .bind(migrated_username)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Applies a partial update to the profile
    ///
    /// Only non-None fields are written. Returns the updated profile, or
    /// None if the user has no profile row.
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE user_profiles SET
                date_of_birth   = COALESCE($2, date_of_birth),
                alias           = COALESCE($3, alias),
                gender          = COALESCE($4, gender),
                location        = COALESCE($5, location),
                education_level = COALESCE($6, education_level),
                avatar_url      = COALESCE($7, avatar_url),
                mobile_number   = COALESCE($8, mobile_number),
                updated_at      = NOW()
            WHERE user_id = $1
            RETURNING user_id, site_id, date_of_birth, alias, gender, location,
                      education_level, avatar_url, mobile_number,
                      migrated_username, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.date_of_birth)
        .bind(&data.alias)
        .bind(&data.gender)
        .bind(&data.location)
        .bind(&data.education_level)
        .bind(&data.avatar_url)
        .bind(&data.mobile_number)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_profile_default_is_noop() {
        let update = UpdateProfile::default();
        assert!(update.alias.is_none());
        assert!(update.mobile_number.is_none());
        assert!(update.date_of_birth.is_none());
    }
}
