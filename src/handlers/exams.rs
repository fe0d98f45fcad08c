// src/handlers/exams.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::exam::{AddExamSubjectsRequest, CreateExamRequest},
    services::Academics,
    utils::jwt::Claims,
};

/// Creates an exam and seeds marks for every active student.
/// If seeding fails the exam is rolled back and the request fails.
pub async fn create_exam(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<String>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = academics
        .create_exam(&class_id, &claims.sub, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_exams(
    State(academics): State<Academics>,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(academics.list_exams(&class_id).await?))
}

pub async fn get_exam(
    State(academics): State<Academics>,
    Path((class_id, exam_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(academics.get_exam(&class_id, &exam_id).await?))
}

pub async fn delete_exam(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = academics
        .delete_exam(&class_id, &claims.sub, &exam_id)
        .await?;
    Ok(Json(removed))
}

/// Adds subjects to an exam; only the new subjects are seeded into marks.
pub async fn add_exam_subjects(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id)): Path<(String, String)>,
    Json(payload): Json<AddExamSubjectsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = academics
        .add_subjects_to_exam(&class_id, &claims.sub, &exam_id, payload)
        .await?;
    Ok(Json(updated))
}

pub async fn remove_exam_subject(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id, subject_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let updated = academics
        .remove_subject_from_exam(&class_id, &claims.sub, &exam_id, &subject_id)
        .await?;
    Ok(Json(updated))
}

/// Re-runs mark seeding for an exam. Safe to repeat.
pub async fn initialize_marks(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let report = academics
        .initialize_exam_marks(&class_id, &claims.sub, &exam_id)
        .await?;
    Ok(Json(report))
}
