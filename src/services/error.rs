// src/services/error.rs

use thiserror::Error;

/// Errors raised by the academic-records engine.
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("caller is not the class admin of class '{class_id}'")]
    NotClassAdmin { class_id: String },

    #[error("subject '{subject_id}' is not assigned to the caller")]
    SubjectNotAssignedToCaller { subject_id: String },

    #[error("caller may not read records of class '{class_id}'")]
    ReadNotPermitted { class_id: String },

    #[error("student '{student_id}' is not an active member of class '{class_id}'")]
    StudentNotInClass { student_id: String, class_id: String },

    #[error("exam '{exam_id}' does not belong to class '{class_id}'")]
    ExamNotInClass { exam_id: String, class_id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("marks {marks} out of range 0..={full_marks}")]
    MarksOutOfRange { marks: f64, full_marks: f64 },

    /// Fan-out to exams or mark records did not complete.
    /// Repaired by re-running the fan-out or by a sync.
    #[error("propagation failed: {0}")]
    PropagationFailure(String),

    #[error("store error: {0}")]
    Store(String),
}

impl RecordsError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        RecordsError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordsError::NotFound { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            RecordsError::NotClassAdmin { .. }
                | RecordsError::SubjectNotAssignedToCaller { .. }
                | RecordsError::ReadNotPermitted { .. }
        )
    }
}

impl From<sqlx::Error> for RecordsError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return RecordsError::Duplicate(format!(
                    "Duplicate entry ({})",
                    db_err.constraint().unwrap_or("unique constraint")
                ));
            }
        }
        RecordsError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for RecordsError {
    fn from(err: serde_json::Error) -> Self {
        RecordsError::Store(err.to_string())
    }
}

impl From<validator::ValidationErrors> for RecordsError {
    fn from(err: validator::ValidationErrors) -> Self {
        RecordsError::Validation(err.to_string())
    }
}
