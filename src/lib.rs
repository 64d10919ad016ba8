//! Grade lookup and lecture file sharing backend.
//!
//! Student and lecture records live in JSON files, uploaded lecture files
//! in a flat directory. The HTTP layer is a thin axum mapping over
//! [`services::classroom_service::ClassroomService`].

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use services::classroom_service::ClassroomService;

/// Assemble the full application with state, CORS and request tracing.
pub fn app(service: ClassroomService, max_upload_bytes: usize) -> Router {
    routes::routes::routes(max_upload_bytes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
