//! Student-facing grade lookup.

use crate::{
    errors::AppError, models::student::StudentGrades,
    services::classroom_service::ClassroomService,
};
use axum::{Json, extract::State};
use serde::Deserialize;

/// Body of `POST /api/student/grades`.
#[derive(Debug, Deserialize)]
pub struct GradesRequest {
    #[serde(rename = "studentId")]
    pub student_id: Option<String>,
}

/// `POST /api/student/grades` — return id, name and grades of one student.
pub async fn get_grades(
    State(service): State<ClassroomService>,
    Json(req): Json<GradesRequest>,
) -> Result<Json<StudentGrades>, AppError> {
    let student_id = req
        .student_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("studentId required"))?;

    let grades = service.get_student_grades(&student_id).await?;
    Ok(Json(grades))
}
