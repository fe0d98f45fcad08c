// src/handlers/marks.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::mark::SubmitMarksRequest, services::Academics, utils::jwt::Claims,
};

/// Records one score.
///
/// * Caller must be the subject's current teacher.
/// * `marks_scored` must lie within `0..=fullMarks` of the exam.
/// * A missing mark record is created on the fly.
pub async fn submit_marks(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, exam_id, student_id, subject_id)): Path<(String, String, String, String)>,
    Json(payload): Json<SubmitMarksRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mark = academics
        .submit_marks(
            &class_id,
            &claims.sub,
            &student_id,
            &exam_id,
            &subject_id,
            payload.marks_scored,
        )
        .await?;
    Ok(Json(mark))
}

pub async fn get_mark_record(
    State(academics): State<Academics>,
    Extension(claims): Extension<Claims>,
    Path((class_id, student_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let record = academics
        .get_mark_record(&class_id, &claims.sub, &student_id)
        .await?;
    Ok(Json(record))
}
