//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_handler, delete_handler, delete_many_handler, destroy_handler, exists_handler,
    fetch_handler, forever_handler, get_handler, health_handler, pull_handler, set_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// Every cache route accepts `?store=<name>`.
///
/// # Endpoints
/// - `PUT /cache/:key` - Store a value
/// - `GET /cache/:key` - Retrieve a value
/// - `DELETE /cache/:key` - Delete a key
/// - `GET /cache/:key/exists` - Check for an unexpired entry
/// - `POST /cache/:key/fetch` - Get or store a default
/// - `POST /cache/:key/add` - Store only if absent
/// - `POST /cache/:key/pull` - Get and delete
/// - `PUT /cache/:key/forever` - Store without expiry
/// - `POST /batch/delete` - Delete many keys
/// - `DELETE /cache` - Clear a store
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", delete(destroy_handler))
        .route(
            "/cache/:key",
            put(set_handler).get(get_handler).delete(delete_handler),
        )
        .route("/cache/:key/exists", get(exists_handler))
        .route("/cache/:key/fetch", post(fetch_handler))
        .route("/cache/:key/add", post(add_handler))
        .route("/cache/:key/pull", post(pull_handler))
        .route("/cache/:key/forever", put(forever_handler))
        .route("/batch/delete", post(delete_many_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
