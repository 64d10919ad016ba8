//! Public lecture listing and file download.

use crate::{
    errors::AppError, models::lecture::Lecture,
    services::classroom_service::ClassroomService,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// `GET /api/lectures` — every lecture in upload order.
pub async fn list_lectures(
    State(service): State<ClassroomService>,
) -> Result<Json<Vec<Lecture>>, AppError> {
    Ok(Json(service.list_lectures().await?))
}

/// `GET /uploads/{file_name}` — stream a stored lecture file.
pub async fn get_upload(
    State(service): State<ClassroomService>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = service.get_asset_stream(&file_name).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file_name)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    Ok(response)
}

/// Content type for the common lecture material extensions.
fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "zip" => "application/zip",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
