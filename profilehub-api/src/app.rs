/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with
/// all routes and middleware.
///
/// # Routes
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /refresh
///     │   ├── GET  /forgot-password  # question challenge
///     │   ├── POST /forgot-password  # attempt evaluation
///     │   └── POST /reset-password
///     ├── /settings                  # registration field config (public)
///     ├── /profile                   # GET / PUT (authenticated)
///     ├── /profile/password          # POST (authenticated)
///     └── /export/users.csv          # GET (authenticated, staff only)
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. JWT authentication (per-route basis)

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use profilehub_shared::auth::{jwt, middleware::AuthContext};
use profilehub_shared::models::site::Site;
use profilehub_shared::recovery::AttemptStore;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Recovery attempt store (Redis in production, in-memory otherwise)
    pub attempts: Arc<dyn AttemptStore>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, attempts: Arc<dyn AttemptStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            attempts,
        }
    }

    /// Gets the JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Resolves the site serving this request
    ///
    /// Matches the Host header against the sites table, falling back to
    /// the configured default site.
    pub async fn resolve_site(&self, headers: &HeaderMap) -> Result<Site, ApiError> {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok());

        Site::resolve(&self.db, host, &self.config.api.default_site_hostname)
            .await?
            .ok_or_else(|| {
                ApiError::ServiceUnavailable("No site is configured for this host".to_string())
            })
    }
}

/// Builds the complete Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Account routes (public)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route(
            "/forgot-password",
            get(routes::recovery::forgot_password_challenge)
                .post(routes::recovery::forgot_password),
        )
        .route("/reset-password", post(routes::recovery::reset_password));

    // Profile routes (require JWT authentication)
    let profile_routes = Router::new()
        .route(
            "/",
            get(routes::profile::view_profile).put(routes::profile::edit_profile),
        )
        .route("/password", post(routes::profile::change_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Export routes (require JWT authentication; staff check in handler)
    let export_routes = Router::new()
        .route("/users.csv", get(routes::export::export_users_csv))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/settings", get(routes::settings::site_settings))
        .nest("/profile", profile_routes)
        .nest("/export", export_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the Bearer token from the Authorization header,
/// then injects an [`AuthContext`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let auth_context = AuthContext::from_jwt(claims.sub, claims.site_id);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
