// src/models/exam.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A subject examined in one exam.
/// `teacher_id` is a copy of the canonical assignment, refreshed only by propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubject {
    pub subject_id: String,
    pub subject_name: String,
    pub teacher_id: Option<String>,
    pub credits: u32,
    pub full_marks: f64,
}

/// The `exams` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub exam_id: String,
    pub class_id: String,
    pub school_id: String,
    pub class_admin_id: String,
    pub exam_name: String,
    pub exam_code: String,
    pub exam_date: NaiveDate,
    /// Minutes.
    pub duration: u32,
    pub subjects: Vec<ExamSubject>,
}

impl Exam {
    pub fn subject(&self, subject_id: &str) -> Option<&ExamSubject> {
        self.subjects.iter().find(|s| s.subject_id == subject_id)
    }

    /// Shares the given name or code, ignoring case.
    pub fn clashes_with(&self, name: &str, code: &str) -> bool {
        self.exam_name.trim().to_lowercase() == name.trim().to_lowercase()
            || self.exam_code.trim().to_lowercase() == code.trim().to_lowercase()
    }

    /// Rewrites the teacher copy for one subject. Returns `true` if changed.
    pub fn set_subject_teacher(&mut self, subject_id: &str, teacher_id: Option<&str>) -> bool {
        let mut changed = false;
        for subject in self
            .subjects
            .iter_mut()
            .filter(|s| s.subject_id == subject_id)
        {
            if subject.teacher_id.as_deref() != teacher_id {
                subject.teacher_id = teacher_id.map(str::to_string);
                changed = true;
            }
        }
        changed
    }
}

/// Subject selection when creating an exam or extending one.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExamSubjectInput {
    #[validate(length(min = 1))]
    pub subject_id: String,
    #[validate(range(min = 1.0, max = 1000.0, message = "Full marks must be between 1 and 1000."))]
    pub full_marks: f64,
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 100, message = "Exam name must be 1-100 characters."))]
    pub exam_name: String,
    #[validate(length(min = 1, max = 20, message = "Exam code must be 1-20 characters."))]
    pub exam_code: String,
    pub exam_date: NaiveDate,
    #[validate(range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes."))]
    pub duration: u32,
    #[validate(length(min = 1, message = "An exam needs at least one subject."), nested)]
    pub subjects: Vec<ExamSubjectInput>,
}

/// DTO for adding subjects to an existing exam.
#[derive(Debug, Deserialize, Validate)]
pub struct AddExamSubjectsRequest {
    #[validate(length(min = 1, message = "No subjects given."), nested)]
    pub subjects: Vec<ExamSubjectInput>,
}
