/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token
///
/// Which registration fields exist and which are required is driven by the
/// site's settings: mobile number, email, security questions, display
/// name, gender, date of birth, location, education level, and terms
/// acceptance are all toggled per site.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::HeaderMap, Json};
use chrono::NaiveDate;
use profilehub_shared::{
    auth::{jwt, password},
    models::{
        profile::NewProfile,
        security_answer::SecurityAnswer,
        security_question::SecurityQuestion,
        settings::ProfileSettings,
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One answered security question at registration
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerInput {
    /// Question being answered
    pub question_id: Uuid,

    /// Raw answer (normalized before hashing)
    pub answer: String,
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(min = 1, max = 30, message = "Username must be 1-30 characters"))]
    pub username: String,

    /// Password (validated for strength)
    pub password: String,

    /// Email address (shown/required per site settings)
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Mobile number (shown/required per site settings)
    pub mobile_number: Option<String>,

    /// Display name
    #[validate(length(max = 128, message = "Display name must be at most 128 characters"))]
    pub alias: Option<String>,

    /// Gender
    pub gender: Option<String>,

    /// Date of birth
    pub date_of_birth: Option<NaiveDate>,

    /// Location
    pub location: Option<String>,

    /// Education level
    pub education_level: Option<String>,

    /// Security question answers
    #[serde(default)]
    pub security_answers: Vec<AnswerInput>,

    /// Terms-and-conditions acceptance
    #[serde(default)]
    pub terms_accepted: bool,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// User ID
    pub user_id: String,

    /// Site the account was registered on
    pub site_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login name
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Maps validator errors into the API validation error shape
pub(crate) fn validation_errors(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}

/// Whether the username embeds an email address
fn contains_email(username: &str) -> bool {
    username.contains('@')
}

/// Whether the username embeds a phone number
///
/// Any run of seven or more digits counts.
fn contains_phone_number(username: &str) -> bool {
    let mut run = 0;
    for c in username.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= 7 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Normalizes a mobile number for storage
///
/// Strips separators, then prepends the site's country code to national
/// numbers ("082..." becomes "+2782..." with country code "+27").
fn normalize_mobile(raw: &str, country_code: Option<&str>) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
        .collect();

    if cleaned.starts_with('+') {
        return cleaned;
    }

    match country_code {
        Some(cc) => match cleaned.strip_prefix('0') {
            Some(national) => format!("{}{}", cc, national),
            None => format!("{}{}", cc, cleaned),
        },
        None => cleaned,
    }
}

/// Whether a normalized mobile number looks dialable
fn mobile_is_valid(normalized: &str) -> bool {
    let digits = normalized.strip_prefix('+').unwrap_or(normalized);
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Applies the site's settings-driven field requirements
///
/// Returns the full list of per-field errors rather than stopping at the
/// first, so a registration form can surface everything at once.
fn validate_against_settings(
    req: &RegisterRequest,
    settings: &ProfileSettings,
    site_questions: &[SecurityQuestion],
) -> Result<(), ApiError> {
    let mut errors: Vec<ValidationErrorDetail> = Vec::new();
    let mut field = |field: &str, message: &str| {
        errors.push(ValidationErrorDetail {
            field: field.to_string(),
            message: message.to_string(),
        });
    };

    if settings.prevent_email_in_username && contains_email(&req.username) {
        field("username", "Sorry, but that is an invalid username. Please don't use your email address in your username.");
    }
    if settings.prevent_phone_number_in_username && contains_phone_number(&req.username) {
        field("username", "Sorry, but that is an invalid username. Please don't use your phone number in your username.");
    }

    if settings.show_email_field && settings.email_required && is_blank(&req.email) {
        field("email", "Email address is required.");
    }

    if settings.show_mobile_number_field {
        if settings.mobile_number_required && is_blank(&req.mobile_number) {
            field("mobile_number", "Mobile number is required.");
        } else if let Some(raw) = req.mobile_number.as_deref().filter(|s| !s.trim().is_empty()) {
            let normalized = normalize_mobile(raw, settings.country_code.as_deref());
            if !mobile_is_valid(&normalized) {
                field("mobile_number", "Enter a valid mobile number.");
            }
        }
    }

    if settings.capture_display_name && settings.display_name_required && is_blank(&req.alias) {
        field("alias", "Display name is required.");
    }
    if settings.capture_gender && settings.gender_required && is_blank(&req.gender) {
        field("gender", "Gender is required.");
    }
    if settings.capture_dob && settings.dob_required && req.date_of_birth.is_none() {
        field("date_of_birth", "Date of birth is required.");
    }
    if settings.capture_location && settings.location_required && is_blank(&req.location) {
        field("location", "Location is required.");
    }
    if settings.capture_education_level
        && settings.education_level_required
        && is_blank(&req.education_level)
    {
        field("education_level", "Education level is required.");
    }

    if settings.terms_and_conditions_url.is_some() && !req.terms_accepted {
        field("terms_accepted", "You must accept the Terms and Conditions.");
    }

    if settings.show_security_question_fields {
        let known: std::collections::HashMap<Uuid, &SecurityQuestion> =
            site_questions.iter().map(|q| (q.id, q)).collect();

        for answer in &req.security_answers {
            if !known.contains_key(&answer.question_id) {
                field("security_answers", "Unknown security question.");
            } else if answer.answer.trim().is_empty() {
                field("security_answers", "Security question answers cannot be empty.");
            }
        }

        if settings.security_questions_required {
            let answered: std::collections::HashSet<Uuid> = req
                .security_answers
                .iter()
                .filter(|a| !a.answer.trim().is_empty())
                .map(|a| a.question_id)
                .collect();

            for question in site_questions {
                if !answered.contains(&question.id) {
                    field("security_answers", "All security questions must be answered.");
                    break;
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(errors))
    }
}

/// Register a new user
///
/// Creates the user and its profile atomically, then stores one hashed
/// security answer per answered question.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed (per-field details)
/// - `409 Conflict`: Username already exists
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let site = state.resolve_site(&headers).await?;
    let settings = ProfileSettings::for_site(&state.db, site.id).await?;
    let site_questions = SecurityQuestion::list_for_site(&state.db, site.id).await?;

    req.validate().map_err(validation_errors)?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::field("password", e))?;

    validate_against_settings(&req, &settings, &site_questions)?;

    let password_hash = password::hash_password(&req.password)?;

    let mobile_number = req
        .mobile_number
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|raw| normalize_mobile(raw, settings.country_code.as_deref()));

    let (user, _profile) = User::create(
        &state.db,
        CreateUser {
            username: req.username.clone(),
            password_hash,
            email: req.email.clone().unwrap_or_default(),
            ..Default::default()
        },
        NewProfile {
            site_id: Some(site.id),
            date_of_birth: req.date_of_birth,
            alias: req.alias.clone(),
            gender: req.gender.clone(),
            location: req.location.clone(),
            education_level: req.education_level.clone(),
            mobile_number,
            ..Default::default()
        },
    )
    .await?;

    for answer in req
        .security_answers
        .iter()
        .filter(|a| !a.answer.trim().is_empty())
    {
        SecurityAnswer::create(&state.db, user.id, answer.question_id, &answer.answer).await?;
    }

    tracing::info!(user_id = %user.id, site_id = %site.id, "User registered");

    let access_claims = jwt::Claims::new(user.id, site.id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, site.id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(RegisterResponse {
        user_id: user.id.to_string(),
        site_id: site.id.to_string(),
        access_token,
        refresh_token,
    }))
}

/// Login endpoint
///
/// Authenticates a user and returns JWT tokens. Accounts imported with a
/// legacy password hash are upgraded to the current scheme on their first
/// successful login.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials (username and password
///   failures are indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let site = state.resolve_site(&headers).await?;

    req.validate().map_err(validation_errors)?;

    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active {
        return Err(invalid());
    }

    let valid = password::verify_password(&req.password, &user.password_hash)
        .unwrap_or(false);
    if !valid {
        return Err(invalid());
    }

    // Transparent upgrade of imported password hashes.
    if password::needs_rehash(&user.password_hash) {
        let upgraded = password::hash_password(&req.password)?;
        User::set_password_hash(&state.db, user.id, &upgraded).await?;
        tracing::debug!(user_id = %user.id, "Upgraded legacy password hash");
    }

    User::update_last_login(&state.db, user.id).await?;

    let access_claims = jwt::Claims::new(user.id, site.id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, site.id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        access_token,
        refresh_token,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
