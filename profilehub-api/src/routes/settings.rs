/// Registration settings readout
///
/// # Endpoint
///
/// ```text
/// GET /v1/settings
/// ```
///
/// Returns the resolved site's registration field configuration so a
/// client can render the right form: which optional fields exist, which
/// are required, and the terms-and-conditions link if one is set.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::HeaderMap, Json};
use profilehub_shared::models::settings::ProfileSettings;

/// Per-site settings handler
pub async fn site_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ProfileSettings>> {
    let site = state.resolve_site(&headers).await?;
    let settings = ProfileSettings::for_site(&state.db, site.id).await?;

    Ok(Json(settings))
}
