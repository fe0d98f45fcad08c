// src/handlers/reports.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, services::Academics, utils::jwt::Claims};

/// All exam results of one student, computed from raw marks.
pub async fn student_report(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, student_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let report = academics
        .student_report(&class_id, &claims.sub, &student_id)
        .await?;
    Ok(Json(report))
}

pub async fn exam_results(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let results = academics
        .exam_results(&class_id, &claims.sub, &exam_id)
        .await?;
    Ok(Json(results))
}

/// Mean, median, extremes, pass/fail and grade distribution for one subject.
pub async fn subject_statistics(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id, subject_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stats = academics
        .subject_statistics(&class_id, &claims.sub, &exam_id, &subject_id)
        .await?;
    Ok(Json(stats))
}
