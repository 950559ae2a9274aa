/// Frontend users CSV export
///
/// # Endpoint
///
/// ```text
/// GET /v1/export/users.csv
/// ```
///
/// Staff only. Produces UTF-8 CSV with the fixed header
/// `username,email,first_name,last_name,is_staff,date_joined,alias,mobile_number`.
/// Values round-trip exactly, including non-ASCII aliases and usernames;
/// join dates are RFC 3339.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use profilehub_shared::{
    auth::middleware::AuthContext,
    models::user::{FrontendUserExport, User},
};

/// Fixed export column order
const EXPORT_HEADER: [&str; 8] = [
    "username",
    "email",
    "first_name",
    "last_name",
    "is_staff",
    "date_joined",
    "alias",
    "mobile_number",
];

/// Renders export rows as CSV
pub(crate) fn render_users_csv(rows: &[FrontendUserExport]) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| ApiError::InternalError(format!("CSV write failed: {}", e)))?;

    for row in rows {
        let date_joined = row.date_joined.to_rfc3339();
        writer
            .write_record([
                row.username.as_str(),
                row.email.as_str(),
                row.first_name.as_str(),
                row.last_name.as_str(),
                if row.is_staff { "true" } else { "false" },
                date_joined.as_str(),
                row.alias.as_deref().unwrap_or(""),
                row.mobile_number.as_deref().unwrap_or(""),
            ])
            .map_err(|e| ApiError::InternalError(format!("CSV write failed: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::InternalError(format!("CSV flush failed: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| ApiError::InternalError(format!("CSV encoding failed: {}", e)))
}

/// Exports the site's frontend users as CSV
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a staff account
pub async fn export_users_csv(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Response> {
    let caller = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if !caller.is_staff {
        return Err(ApiError::Forbidden(
            "Staff access is required for export".to_string(),
        ));
    }

    let rows = User::export_rows(&state.db, auth.site_id).await?;
    let csv = render_users_csv(&rows)?;

    tracing::info!(user_id = %caller.id, rows = rows.len(), "Users exported");

    let mut response = csv.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"users.csv\""),
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(
        username: &str,
        alias: Option<&str>,
        mobile: Option<&str>,
        is_staff: bool,
    ) -> FrontendUserExport {
        FrontendUserExport {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            is_staff,
            date_joined: Utc.with_ymd_and_hms(2017, 3, 15, 9, 30, 0).unwrap(),
            alias: alias.map(str::to_string),
            mobile_number: mobile.map(str::to_string),
        }
    }

    #[test]
    fn test_header_row_is_fixed() {
        let csv = render_users_csv(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "username,email,first_name,last_name,is_staff,date_joined,alias,mobile_number"
        );
    }

    #[test]
    fn test_rows_roundtrip_exactly() {
        let rows = vec![
            row("codie", Some("The Codester"), Some("+27821234567"), false),
            row("staffer", None, None, true),
        ];

        let csv = render_users_csv(&rows).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let parsed: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(&parsed[0][0], "codie");
        assert_eq!(&parsed[0][6], "The Codester");
        assert_eq!(&parsed[0][7], "+27821234567");
        assert_eq!(&parsed[1][4], "true");
        assert_eq!(&parsed[1][6], "");
    }

    #[test]
    fn test_non_ascii_content_roundtrips() {
        let mut exotic = row("codié", Some("séñor ✓"), None, false);
        exotic.first_name = "Zoë".to_string();

        let csv = render_users_csv(&[exotic]).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "codié");
        assert_eq!(&record[2], "Zoë");
        assert_eq!(&record[6], "séñor ✓");
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let tricky = row("codie", Some("Last, First"), None, false);

        let csv = render_users_csv(&[tricky]).unwrap();
        assert!(csv.contains("\"Last, First\""));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[6], "Last, First");
    }
}
