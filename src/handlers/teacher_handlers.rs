//! Teacher login and lecture management.
//!
//! Mutating routes expect the shared teacher password in the
//! `x-teacher-password` header.

use crate::{
    errors::AppError,
    models::lecture::Lecture,
    services::{asset_store::StoredAsset, classroom_service::ClassroomService},
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io;
use tracing::{debug, warn};

pub const TEACHER_PASSWORD_HEADER: &str = "x-teacher-password";

/// Multipart field carrying the lecture file.
const LECTURE_FIELD: &str = "lecture";
const TITLE_FIELD: &str = "title";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub lecture: Lecture,
}

/// `POST /api/teacher/login`
pub async fn login(
    State(service): State<ClassroomService>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let password = req.password.unwrap_or_default();
    if service.check_teacher_credential(&password) {
        Json(json!({ "ok": true })).into_response()
    } else {
        warn!("rejected teacher login");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": "Wrong password" })),
        )
            .into_response()
    }
}

/// `POST /api/teacher/lectures` — multipart upload with a `lecture` file
/// field and an optional `title` text field.
pub async fn upload_lecture(
    State(service): State<ClassroomService>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    require_teacher(&service, &headers)?;

    let mut staged: Option<(StoredAsset, String)> = None;
    let mut title: Option<String> = None;

    let outcome: Result<(), AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            AppError::bad_request(format!("Failed to read multipart data: {}", e))
        })? {
            let field_name = field.name().unwrap_or("").to_string();
            match field_name.as_str() {
                LECTURE_FIELD => {
                    if staged.is_some() {
                        return Err(AppError::bad_request("Only one lecture file per upload"));
                    }
                    let original_name = field.file_name().unwrap_or("upload").to_string();
                    let stream = field
                        .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));
                    let asset = service.stage_upload(&original_name, stream).await?;
                    staged = Some((asset, original_name));
                }
                TITLE_FIELD => {
                    let text = field.text().await.map_err(|e| {
                        AppError::bad_request(format!("Failed to read title field: {}", e))
                    })?;
                    title = Some(text);
                }
                _ => debug!("Ignoring unknown field: {}", field_name),
            }
        }
        Ok::<(), AppError>(())
    }
    .await;

    if let Err(err) = outcome {
        if let Some((asset, _)) = &staged {
            service.abort_upload(asset).await;
        }
        return Err(err);
    }

    let (asset, original_name) =
        staged.ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    let lecture = service.commit_upload(asset, &original_name, title).await?;

    Ok(Json(UploadResponse { ok: true, lecture }))
}

/// `DELETE /api/teacher/lectures/{id}`
pub async fn delete_lecture(
    State(service): State<ClassroomService>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_teacher(&service, &headers)?;
    service.delete_lecture(&id).await?;
    Ok(Json(json!({ "ok": true })))
}

fn require_teacher(service: &ClassroomService, headers: &HeaderMap) -> Result<(), AppError> {
    let supplied = headers
        .get(TEACHER_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if service.check_teacher_credential(supplied) {
        Ok(())
    } else {
        Err(AppError::unauthorized("Teacher authentication required"))
    }
}
