/// Profile endpoints
///
/// # Endpoints
///
/// - `GET /v1/profile` - View the authenticated user's profile
/// - `PUT /v1/profile` - Edit profile fields (alias, mobile number, ...)
/// - `POST /v1/profile/password` - Change password
///
/// Username and password never change through the profile edit path; the
/// password has its own endpoint requiring the old password.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::validation_errors,
};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use profilehub_shared::{
    auth::{middleware::AuthContext, password},
    models::{
        profile::{UpdateProfile, UserProfile},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Profile view response
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
    pub alias: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub education_level: Option<String>,
    pub mobile_number: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile edit request
///
/// Only provided fields change.
#[derive(Debug, Deserialize, Validate)]
pub struct EditProfileRequest {
    #[validate(length(max = 128, message = "Display name must be at most 128 characters"))]
    pub alias: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub education_level: Option<String>,
    pub mobile_number: Option<String>,
    pub avatar_url: Option<String>,
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn profile_response(user: User, profile: UserProfile) -> ProfileResponse {
    ProfileResponse {
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        date_joined: user.date_joined,
        alias: profile.alias,
        gender: profile.gender,
        date_of_birth: profile.date_of_birth,
        location: profile.location,
        education_level: profile.education_level,
        mobile_number: profile.mobile_number,
        avatar_url: profile.avatar_url,
    }
}

async fn load_user_and_profile(
    state: &AppState,
    auth: &AuthContext,
) -> ApiResult<(User, UserProfile)> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let profile = UserProfile::find_by_user(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok((user, profile))
}

/// View the authenticated user's profile
pub async fn view_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let (user, profile) = load_user_and_profile(&state, &auth).await?;

    Ok(Json(profile_response(user, profile)))
}

/// Edit the authenticated user's profile
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<EditProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    req.validate().map_err(validation_errors)?;

    let profile = UserProfile::update(
        &state.db,
        auth.user_id,
        UpdateProfile {
            alias: req.alias,
            gender: req.gender,
            date_of_birth: req.date_of_birth,
            location: req.location,
            education_level: req.education_level,
            mobile_number: req.mobile_number,
            avatar_url: req.avatar_url,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(profile_response(user, profile)))
}

/// Change the authenticated user's password
///
/// Requires the old password and an exact confirmation of the new one.
///
/// # Errors
///
/// - `401 Unauthorized`: Old password is incorrect
/// - `422 Unprocessable Entity`: Confirmation mismatch or weak password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let old_matches = password::verify_password(&req.old_password, &user.password_hash)
        .unwrap_or(false);
    if !old_matches {
        return Err(ApiError::Unauthorized(
            "The old password is incorrect.".to_string(),
        ));
    }

    if req.new_password != req.confirm_password {
        return Err(ApiError::field(
            "confirm_password",
            "The two password fields do not match.",
        ));
    }

    password::validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::field("new_password", e))?;

    let new_hash = password::hash_password(&req.new_password)?;
    User::set_password_hash(&state.db, user.id, &new_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
