pub mod account;
pub mod admin;
pub mod auth;
pub mod properties;
pub mod site;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;

use common::types::Health;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Run a synchronous store-backed call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

/// Build the full application router: public, signed-in and super-admin routes.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let uploads = ServeDir::new(state.config.uploads.upload_dir.clone());

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/api/search", get(properties::search))
        .route("/api/cities", get(site::cities))
        .route("/api/categories", get(site::categories))
        .route("/api/settings", get(site::settings))
        .route("/api/pages/:slug", get(site::page))
        .nest_service("/uploads", uploads);

    // Handlers here take a `CurrentUser`, which rejects requests without a valid token.
    let api = Router::new()
        .route("/api/properties", post(properties::create))
        .route(
            "/api/properties/:id",
            get(properties::detail).put(properties::update).delete(properties::remove),
        )
        .route("/api/properties/:id/publish", post(properties::publish))
        .route("/api/properties/:id/unpublish", post(properties::unpublish))
        .route("/api/properties/:id/scenes", post(properties::add_scene))
        .route("/api/properties/:id/scenes/:scene_id", delete(properties::remove_scene))
        .route("/api/properties/:id/hotspots", put(properties::save_hotspots))
        .route("/api/favorite/:id", post(account::toggle_favorite))
        .route("/api/favorites", get(account::favorites))
        .route("/api/me", get(account::me).put(account::update_me))
        .route("/api/me/password", post(account::change_password))
        .route("/api/me/properties", get(account::my_properties));

    let admin_routes = Router::new()
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::users))
        .route("/admin/users/:id/role", post(admin::set_role))
        .route("/admin/users/:id/toggle-status", post(admin::toggle_status))
        .route("/admin/properties", get(admin::properties))
        .route("/admin/properties/:id/status", post(admin::set_property_status))
        .route("/admin/properties/:id/agent", post(admin::assign_agent))
        .route("/admin/backups", get(admin::backups))
        .route("/admin/backups/restore", post(admin::restore))
        .route("/admin/settings", put(site::update_settings))
        .route("/admin/pages/:slug", put(site::update_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_super_admin));

    public
        .merge(api)
        .merge(admin_routes)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
