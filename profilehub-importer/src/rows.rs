/// Import batch row format
///
/// A batch is an ordered collection of rows exported from the legacy
/// system, one JSON object per user. Passwords and security answers
/// arrive already hashed and are stored verbatim; `date_joined` is
/// preserved as exported.
///
/// # Row format
///
/// ```json
/// {
///   "username": "codieroelf2",
///   "migrated_username": "3_codieroelf2",
///   "first_name": "Codie",
///   "last_name": "Roelf",
///   "email": "codie@example.com",
///   "is_active": true,
///   "password": "pbkdf2_sha256$24000$abc$...",
///   "date_joined": "2016-06-01T08:00:00Z",
///   "alias": "codie",
///   "mobile_number": "+27821234567",
///   "security_question_answers": [
///     ["What was your first pet's name?", "pbkdf2_sha256$24000$def$..."]
///   ]
/// }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One exported user row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRow {
    /// Login name in the legacy system
    #[serde(default)]
    pub username: Option<String>,

    /// Legacy identity key; preferred over username for duplicate
    /// detection
    #[serde(default)]
    pub migrated_username: Option<String>,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Active flag; disabled accounts import disabled
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Password hash carried over verbatim (never re-hashed)
    #[serde(default)]
    pub password: Option<String>,

    /// Original join date, preserved on the new account
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,

    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub mobile_number: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub education_level: Option<String>,

    /// `[question_title, hashed_answer]` pairs
    #[serde(default)]
    pub security_question_answers: Vec<(String, String)>,
}

fn default_true() -> bool {
    true
}

impl ImportRow {
    /// The identity key used to detect an already-reconciled row
    ///
    /// Prefers the explicit `migrated_username`, falling back to
    /// `username`. None means the row is malformed and must be reported,
    /// not imported.
    pub fn identity_key(&self) -> Option<&str> {
        self.migrated_username
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.username.as_deref().filter(|s| !s.trim().is_empty()))
    }

    /// Login name for the account this row creates
    pub fn login_name(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.identity_key())
    }
}

/// Parses a batch from its JSON serialization
pub fn parse_batch(json: &str) -> Result<Vec<ImportRow>, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_prefers_migrated_username() {
        let row = ImportRow {
            username: Some("codieroelf2".to_string()),
            migrated_username: Some("3_codieroelf2".to_string()),
            ..Default::default()
        };
        assert_eq!(row.identity_key(), Some("3_codieroelf2"));
    }

    #[test]
    fn test_identity_key_falls_back_to_username() {
        let row = ImportRow {
            username: Some("codieroelf2".to_string()),
            ..Default::default()
        };
        assert_eq!(row.identity_key(), Some("codieroelf2"));
    }

    #[test]
    fn test_identity_key_missing_for_malformed_row() {
        let row = ImportRow::default();
        assert_eq!(row.identity_key(), None);

        let row = ImportRow {
            username: Some("  ".to_string()),
            migrated_username: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(row.identity_key(), None);
    }

    #[test]
    fn test_login_name_prefers_username() {
        let row = ImportRow {
            username: Some("codieroelf2".to_string()),
            migrated_username: Some("3_codieroelf2".to_string()),
            ..Default::default()
        };
        assert_eq!(row.login_name(), Some("codieroelf2"));

        let row = ImportRow {
            migrated_username: Some("3_codieroelf2".to_string()),
            ..Default::default()
        };
        assert_eq!(row.login_name(), Some("3_codieroelf2"));
    }

    #[test]
    fn test_parse_batch_with_answer_pairs() {
        let json = r#"[
            {
                "username": "codieroelf2",
                "migrated_username": "3_codieroelf2",
                "password": "pbkdf2_sha256$24000$abc$digest",
                "date_joined": "2016-06-01T08:00:00Z",
                "security_question_answers": [
                    ["What was your first pet's name?", "pbkdf2_sha256$24000$def$x"],
                    ["In what town were you born?", "pbkdf2_sha256$24000$ghi$y"]
                ]
            },
            { "username": "minimal" }
        ]"#;

        let rows = parse_batch(json).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].security_question_answers.len(), 2);
        assert_eq!(
            rows[0].security_question_answers[0].0,
            "What was your first pet's name?"
        );
        assert!(rows[0].is_active);
        assert!(rows[0].date_joined.is_some());

        assert!(rows[1].security_question_answers.is_empty());
        assert_eq!(rows[1].identity_key(), Some("minimal"));
    }

    #[test]
    fn test_parse_batch_rejects_malformed_json() {
        assert!(parse_batch("{not json").is_err());
    }
}
