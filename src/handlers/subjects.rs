// src/handlers/subjects.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::assignment::{AddSubjectRequest, AssignTeacherRequest},
    services::Academics,
    utils::jwt::Claims,
};

/// Creates the class's subject assignment document (idempotent).
/// Class admin only.
pub async fn init_assignment(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let doc = academics
        .ensure_subject_assignment(&class_id, &claims.sub)
        .await?;
    Ok(Json(doc))
}

#[derive(Debug, Deserialize)]
pub struct SubjectListParams {
    /// Only subjects taught by this teacher.
    pub teacher_id: Option<String>,
}

/// Lists the subjects of a class, optionally filtered by teacher.
pub async fn list_subjects(
    State(academics): State<Academics>,
    Path(class_id): Path<String>,
    Query(params): Query<SubjectListParams>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = match params.teacher_id {
        Some(teacher_id) => academics.subjects_for_teacher(&class_id, &teacher_id).await?,
        None => academics.list_subjects(&class_id).await?,
    };
    Ok(Json(subjects))
}

/// Adds a subject to a class.
/// Class admin only. Names and codes are unique per class.
pub async fn add_subject(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<String>,
    Json(payload): Json<AddSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subject = academics
        .add_subject(&class_id, &claims.sub, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

/// Removes a subject from a class. Historical exams and marks are kept.
pub async fn remove_subject(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, subject_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = academics
        .remove_subject(&class_id, &claims.sub, &subject_id)
        .await?;
    Ok(Json(removed))
}

/// Assigns a teacher to a subject and propagates the change.
/// Propagation problems come back as `warnings`; the assignment still stands.
pub async fn assign_teacher(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, subject_id)): Path<(String, String)>,
    Json(payload): Json<AssignTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    let change = academics
        .assign_teacher(&class_id, &claims.sub, &subject_id, &payload.teacher_id)
        .await?;
    Ok(Json(change))
}

/// Leaves a subject without a teacher and propagates the change.
pub async fn remove_teacher(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, subject_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let change = academics
        .remove_teacher(&class_id, &claims.sub, &subject_id)
        .await?;
    Ok(Json(change))
}

/// Re-derives every teacher copy in the class from the canonical assignment.
pub async fn sync_assignments(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = academics.sync_assignments(&class_id, &claims.sub).await?;
    Ok(Json(report))
}
