// src/services/mod.rs

//! The academic-records engine.
//!
//! `subject_assignments` holds the canonical "who teaches subject X in class Y".
//! Exams and mark records carry copies of it which are refreshed by
//! propagation and repaired by [`Academics::sync_assignments`]. Anything that
//! decides whether a caller may act reads the canonical document, never a copy.

mod assignments;
mod error;
mod exams;
mod marks;
mod propagation;
mod reports;

use std::sync::Arc;

use crate::grading::GradeScale;
use crate::models::{assignment::SubjectAssignment, exam::Exam};
use crate::store::{AcademicStore, ClassDirectory, ClassInfo};

pub use assignments::AssignmentChange;
pub use error::RecordsError;
pub use exams::{ExamCreated, ExamRemoved, ExamUpdated};
pub use marks::InitReport;
pub use propagation::{PropagationReport, SyncReport};
pub use reports::{build_exam_result, build_subject_statistics};

/// Entry point for every academic-records operation.
/// Cheap to clone; handlers hold one per request.
#[derive(Clone)]
pub struct Academics {
    store: Arc<dyn AcademicStore>,
    directory: Arc<dyn ClassDirectory>,
    scale: GradeScale,
}

impl Academics {
    pub fn new(
        store: Arc<dyn AcademicStore>,
        directory: Arc<dyn ClassDirectory>,
        scale: GradeScale,
    ) -> Self {
        Self {
            store,
            directory,
            scale,
        }
    }

    async fn require_class(&self, class_id: &str) -> Result<ClassInfo, RecordsError> {
        self.directory
            .class_info(class_id)
            .await?
            .ok_or_else(|| RecordsError::not_found("class", class_id))
    }

    async fn require_class_admin(
        &self,
        class_id: &str,
        caller: &str,
    ) -> Result<ClassInfo, RecordsError> {
        let class = self.require_class(class_id).await?;
        if class.class_admin_id != caller {
            return Err(RecordsError::NotClassAdmin {
                class_id: class_id.to_string(),
            });
        }
        Ok(class)
    }

    async fn load_assignment(&self, class_id: &str) -> Result<SubjectAssignment, RecordsError> {
        self.store
            .find_assignment(class_id)
            .await?
            .ok_or_else(|| RecordsError::not_found("subject assignment for class", class_id))
    }

    async fn load_exam_in_class(&self, class_id: &str, exam_id: &str) -> Result<Exam, RecordsError> {
        let exam = self
            .store
            .find_exam(exam_id)
            .await?
            .ok_or_else(|| RecordsError::not_found("exam", exam_id))?;
        if exam.class_id != class_id {
            return Err(RecordsError::ExamNotInClass {
                exam_id: exam_id.to_string(),
                class_id: class_id.to_string(),
            });
        }
        Ok(exam)
    }

    /// Class admin, the student themself (when `student_id` is given), or any
    /// teacher canonically assigned to a subject of the class.
    async fn authorize_read(
        &self,
        class_id: &str,
        caller: &str,
        student_id: Option<&str>,
    ) -> Result<ClassInfo, RecordsError> {
        let class = self.require_class(class_id).await?;
        if class.class_admin_id == caller || student_id == Some(caller) {
            return Ok(class);
        }
        let teaches = self
            .store
            .find_assignment(class_id)
            .await?
            .is_some_and(|a| a.teaches_in_class(caller));
        if teaches {
            Ok(class)
        } else {
            Err(RecordsError::ReadNotPermitted {
                class_id: class_id.to_string(),
            })
        }
    }
}
