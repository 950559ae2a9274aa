/// Per-site registration and recovery configuration
///
/// Mirrors the site administrator's settings panel: which optional fields
/// registration shows and requires, how many security questions the
/// recovery challenge asks, and how many recovery retries a session gets
/// before lockout.
///
/// The verifier and importer never read this table themselves; callers
/// fetch the settings and hand the relevant value object
/// ([`RecoveryPolicy`]) in explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Site settings row
///
/// A row is inserted with defaults when the site is created; `for_site`
/// falls back to `Default` if the row is missing so reads never fail.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProfileSettings {
    pub site_id: Uuid,

    pub show_mobile_number_field: bool,
    pub mobile_number_required: bool,
    /// Country dialing prefix prepended to national numbers, e.g. "+27"
    pub country_code: Option<String>,
    pub prevent_phone_number_in_username: bool,

    pub show_email_field: bool,
    pub email_required: bool,
    pub prevent_email_in_username: bool,

    pub show_security_question_fields: bool,
    pub security_questions_required: bool,
    /// Number of questions asked per recovery attempt
    pub num_security_questions: i16,
    /// Recovery attempts per session before lockout
    pub password_recovery_retries: i16,

    /// Terms-and-conditions page; when set, registration requires
    /// acceptance
    pub terms_and_conditions_url: Option<String>,

    pub activate_display_name: bool,
    pub capture_display_name: bool,
    pub display_name_required: bool,

    pub activate_gender: bool,
    pub capture_gender: bool,
    pub gender_required: bool,

    pub activate_dob: bool,
    pub capture_dob: bool,
    pub dob_required: bool,

    pub activate_location: bool,
    pub capture_location: bool,
    pub location_required: bool,

    pub activate_education_level: bool,
    pub capture_education_level: bool,
    pub education_level_required: bool,

    pub updated_at: DateTime<Utc>,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            site_id: Uuid::nil(),
            show_mobile_number_field: false,
            mobile_number_required: false,
            country_code: None,
            prevent_phone_number_in_username: false,
            show_email_field: false,
            email_required: false,
            prevent_email_in_username: false,
            show_security_question_fields: false,
            security_questions_required: false,
            num_security_questions: 1,
            password_recovery_retries: 5,
            terms_and_conditions_url: None,
            activate_display_name: false,
            capture_display_name: false,
            display_name_required: false,
            activate_gender: false,
            capture_gender: false,
            gender_required: false,
            activate_dob: false,
            capture_dob: false,
            dob_required: false,
            activate_location: false,
            capture_location: false,
            location_required: false,
            activate_education_level: false,
            capture_education_level: false,
            education_level_required: false,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }
}

impl ProfileSettings {
    /// Fetches the settings for a site, falling back to defaults
    pub async fn for_site(pool: &PgPool, site_id: Uuid) -> Result<Self, sqlx::Error> {
        let settings = sqlx::query_as::<_, ProfileSettings>(
            "SELECT * FROM profile_settings WHERE site_id = $1",
        )
        .bind(site_id)
        .fetch_optional(pool)
        .await?;

        Ok(settings.unwrap_or_else(|| ProfileSettings {
            site_id,
            ..Default::default()
        }))
    }

    /// The recovery policy value object handed to the verifier
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy {
            questions_asked: self.num_security_questions.max(0) as usize,
            max_retries: self.password_recovery_retries.max(0) as u32,
        }
    }
}

/// Explicit configuration for the password-recovery verifier
///
/// Extracted from [`ProfileSettings`] so the verifier never reaches into
/// ambient site-settings state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// How many questions a challenge presents (drawn without replacement)
    pub questions_asked: usize,

    /// Session attempt budget before lockout
    pub max_retries: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recovery_policy() {
        let settings = ProfileSettings::default();
        let policy = settings.recovery_policy();
        assert_eq!(policy.questions_asked, 1);
        assert_eq!(policy.max_retries, 5);
    }

    #[test]
    fn test_recovery_policy_clamps_negatives() {
        let settings = ProfileSettings {
            num_security_questions: -3,
            password_recovery_retries: -1,
            ..Default::default()
        };
        let policy = settings.recovery_policy();
        assert_eq!(policy.questions_asked, 0);
        assert_eq!(policy.max_retries, 0);
    }
}
