/// Forgot-password and reset-password endpoints
///
/// # Endpoints
///
/// - `GET /v1/auth/forgot-password` - Returns the question challenge for
///   this attempt and establishes the recovery session cookie
/// - `POST /v1/auth/forgot-password` - Evaluates an attempt
/// - `POST /v1/auth/reset-password` - Consumes a reset token
///
/// Every rejection during recovery uses one generic message regardless of
/// cause (unknown user, inactive account, wrong answers), so the endpoint
/// cannot be used to enumerate usernames. Lockout is the only distinct
/// failure. Reset-token failures are a bare 403.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    session,
};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use profilehub_shared::{
    auth::{password, reset_token},
    models::{settings::ProfileSettings, user::User},
    recovery::{AttemptOutcome, PgDirectory, RecoveryVerifier, SubmittedAnswer},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generic rejection shown for every failed attempt
const MISMATCH_MESSAGE: &str =
    "The username and security answer(s) you entered do not match our records. Please try again.";

/// Shown once the session's attempt budget is exhausted
const LOCKOUT_MESSAGE: &str = "Too many attempts. Please try again later.";

/// One question of the challenge, as presented to the caller
#[derive(Debug, Serialize)]
pub struct ChallengeQuestion {
    pub id: Uuid,
    pub title: String,
}

/// Challenge response
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    /// Questions to answer, in presentation order
    pub questions: Vec<ChallengeQuestion>,
}

/// One answered question of an attempt
#[derive(Debug, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: Uuid,
    pub answer: String,
}

/// Forgot-password attempt request
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub username: String,
    #[serde(default)]
    pub answers: Vec<AttemptAnswer>,
}

/// Successful attempt response
#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    /// Username the token was granted for
    pub username: String,

    /// Single-use reset token
    pub token: String,

    /// Reset endpoint carrying username + token
    pub reset_url: String,
}

/// Reset-password request
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Reads the recovery session from the request, creating one if absent
///
/// Returns the session key and, for a fresh session, the Set-Cookie value
/// that must ride on the response.
fn session_for_request(headers: &HeaderMap) -> (String, Option<String>) {
    match session::session_from_headers(headers) {
        Some(existing) => (existing, None),
        None => {
            let fresh = session::new_session_id();
            let cookie = session::set_cookie_value(&fresh);
            (fresh, Some(cookie))
        }
    }
}

fn with_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(cookie) = cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Returns the security-question challenge for one attempt
///
/// Draws a fresh random subset of the site's questions each call and makes
/// sure the caller has a recovery session cookie.
pub async fn forgot_password_challenge(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let site = state.resolve_site(&headers).await?;
    let settings = ProfileSettings::for_site(&state.db, site.id).await?;

    let (_, cookie) = session_for_request(&headers);

    let directory = PgDirectory::new(&state.db);
    let verifier = RecoveryVerifier::new(
        &directory,
        state.attempts.as_ref(),
        settings.recovery_policy(),
        state.jwt_secret(),
    );

    let questions = verifier
        .select_challenge(site.id)
        .await?
        .into_iter()
        .map(|q| ChallengeQuestion {
            id: q.id,
            title: q.title,
        })
        .collect();

    let response = Json(ChallengeResponse { questions }).into_response();
    Ok(with_cookie(response, cookie))
}

/// Evaluates a forgot-password attempt
///
/// # Outcomes
///
/// - `200 OK` with a reset link: every presented answer matched
/// - `401 Unauthorized` with the generic message: anything else, budget
///   decremented
/// - `429 Too Many Requests`: attempt budget exhausted
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Response> {
    let site = state.resolve_site(&headers).await?;
    let settings = ProfileSettings::for_site(&state.db, site.id).await?;

    let (session_key, cookie) = session_for_request(&headers);

    let directory = PgDirectory::new(&state.db);
    let verifier = RecoveryVerifier::new(
        &directory,
        state.attempts.as_ref(),
        settings.recovery_policy(),
        state.jwt_secret(),
    );

    let answers: Vec<SubmittedAnswer> = req
        .answers
        .into_iter()
        .map(|a| SubmittedAnswer {
            question_id: a.question_id,
            answer: a.answer,
        })
        .collect();

    let outcome = verifier.evaluate(&session_key, &req.username, &answers).await?;

    let response = match outcome {
        AttemptOutcome::Granted {
            username,
            reset_token: token,
            ..
        } => {
            let reset_url = format!(
                "/v1/auth/reset-password?username={}&token={}",
                username, token
            );
            Json(ForgotPasswordResponse {
                username,
                token,
                reset_url,
            })
            .into_response()
        }
        AttemptOutcome::Rejected => {
            ApiError::Unauthorized(MISMATCH_MESSAGE.to_string()).into_response()
        }
        AttemptOutcome::LockedOut => {
            ApiError::RateLimited(LOCKOUT_MESSAGE.to_string()).into_response()
        }
    };

    // The cookie must ride on rejections too: the budget belongs to the
    // session it was initialized for.
    Ok(with_cookie(response, cookie))
}

/// Consumes a reset token and sets a new password
///
/// Stateless: validates username + token, requires an exact confirmation
/// match, and invalidates the recovery session on success. Token failures
/// (invalid, expired, unknown user, inactive account, already used) are a
/// bare 403 with no detail.
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Response> {
    let forbidden = || ApiError::Forbidden("Forbidden".to_string());

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(forbidden)?;

    if !user.is_active {
        return Err(forbidden());
    }

    reset_token::validate(&req.token, user.id, &user.password_hash, state.jwt_secret())?;

    if req.password != req.confirm_password {
        return Err(ApiError::field(
            "confirm_password",
            "The two password fields do not match.",
        ));
    }

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::field("password", e))?;

    let new_hash = password::hash_password(&req.password)?;
    User::set_password_hash(&state.db, user.id, &new_hash).await?;

    // Flush the attempt counter and drop the session identifier that
    // reached this state; the next recovery starts fresh.
    if let Some(session_key) = session::session_from_headers(&headers) {
        state.attempts.clear(&session_key).await?;
    }

    tracing::info!(user_id = %user.id, "Password reset completed");

    let response = Json(serde_json::json!({ "status": "ok" })).into_response();
    Ok(with_cookie(response, Some(session::clear_cookie_value())))
}
