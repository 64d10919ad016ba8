//! Defines routes for the grade lookup and lecture sharing API.
//!
//! ## Structure
//! - **Student endpoints**
//!   - `POST   /api/student/grades` — grades for one student id
//!
//! - **Teacher endpoints** (upload/delete require `x-teacher-password`)
//!   - `POST   /api/teacher/login` — check the shared password
//!   - `POST   /api/teacher/lectures` — multipart lecture upload
//!   - `DELETE /api/teacher/lectures/{id}` — delete lecture and its file
//!
//! - **Public lecture endpoints**
//!   - `GET    /api/lectures` — list lectures
//!   - `GET    /uploads/{file_name}` — download a lecture file

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        lecture_handlers::{get_upload, list_lectures},
        student_handlers::get_grades,
        teacher_handlers::{delete_lecture, login, upload_lecture},
    },
    services::classroom_service::ClassroomService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build the router for every API route.
///
/// Uploads larger than `max_upload_bytes` are rejected before reaching
/// the handler. The router carries `ClassroomService` as shared state.
pub fn routes(max_upload_bytes: usize) -> Router<ClassroomService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/student/grades", post(get_grades))
        .route("/api/teacher/login", post(login))
        .route(
            "/api/teacher/lectures",
            post(upload_lecture).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/teacher/lectures/{id}", delete(delete_lecture))
        .route("/api/lectures", get(list_lectures))
        .route("/uploads/{file_name}", get(get_upload))
}
