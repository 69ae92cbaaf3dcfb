use crate::{handlers, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{path::PathBuf, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// URL prefix under which locally stored images are served.
pub const LOCAL_BLOB_PREFIX: &str = "/blobs";

/// Non-API parts of the router.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_upload_bytes: usize,
    /// Directory holding the browser map client, served as the fallback.
    pub static_dir: Option<PathBuf>,
    /// Root of the local blob store, served under [`LOCAL_BLOB_PREFIX`].
    pub local_blob_dir: Option<PathBuf>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
            static_dir: None,
            local_blob_dir: None,
        }
    }
}

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>, options: &RouterOptions) -> Router {
    let mut router = Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/pins", get(handlers::list_pins).post(handlers::create_pin))
        .route(
            "/api/pins/{id}",
            get(handlers::get_pin)
                .put(handlers::update_pin)
                .delete(handlers::delete_pin),
        )
        .route("/api/location/search", get(handlers::search_locations));

    if let Some(dir) = &options.local_blob_dir {
        router = router.nest_service(LOCAL_BLOB_PREFIX, ServeDir::new(dir));
    }
    if let Some(dir) = &options.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .with_state(state) // Pass the application state
}
