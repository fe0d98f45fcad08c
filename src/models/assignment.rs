// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::RecordsError;

/// One subject taught in a class, and the teacher currently assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedSubject {
    pub subject_id: String,
    pub name: String,
    pub code: String,
    /// `None` while the subject has no teacher.
    pub teacher_id: Option<String>,
    pub credits: u32,
    pub is_active: bool,
}

/// The `subject_assignments` document: one per class.
/// Canonical source for "who teaches subject X in class Y".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAssignment {
    pub class_id: String,
    pub school_id: String,
    pub class_admin_id: String,
    pub subjects: Vec<AssignedSubject>,
}

impl SubjectAssignment {
    pub fn new(class_id: &str, school_id: &str, class_admin_id: &str) -> Self {
        Self {
            class_id: class_id.to_string(),
            school_id: school_id.to_string(),
            class_admin_id: class_admin_id.to_string(),
            subjects: Vec::new(),
        }
    }

    pub fn subject(&self, subject_id: &str) -> Option<&AssignedSubject> {
        self.subjects.iter().find(|s| s.subject_id == subject_id)
    }

    fn subject_mut(&mut self, subject_id: &str) -> Result<&mut AssignedSubject, RecordsError> {
        self.subjects
            .iter_mut()
            .find(|s| s.subject_id == subject_id)
            .ok_or_else(|| RecordsError::not_found("subject", subject_id))
    }

    /// Canonical teacher for a subject. `None` if unassigned or unknown.
    pub fn teacher_of(&self, subject_id: &str) -> Option<&str> {
        self.subject(subject_id).and_then(|s| s.teacher_id.as_deref())
    }

    /// Appends a subject, rejecting names or codes already used in the class
    /// (compared case-insensitively).
    pub fn add_subject(&mut self, subject: AssignedSubject) -> Result<(), RecordsError> {
        let name = subject.name.trim().to_lowercase();
        let code = subject.code.trim().to_lowercase();

        if self
            .subjects
            .iter()
            .any(|s| s.name.trim().to_lowercase() == name)
        {
            return Err(RecordsError::Duplicate(format!(
                "Subject name '{}' already exists in this class",
                subject.name
            )));
        }
        if self
            .subjects
            .iter()
            .any(|s| s.code.trim().to_lowercase() == code)
        {
            return Err(RecordsError::Duplicate(format!(
                "Subject code '{}' already exists in this class",
                subject.code
            )));
        }

        self.subjects.push(subject);
        Ok(())
    }

    /// Sets the canonical teacher. Returns `false` when nothing changed.
    pub fn set_teacher(
        &mut self,
        subject_id: &str,
        teacher_id: Option<&str>,
    ) -> Result<bool, RecordsError> {
        let subject = self.subject_mut(subject_id)?;
        if subject.teacher_id.as_deref() == teacher_id {
            return Ok(false);
        }
        subject.teacher_id = teacher_id.map(str::to_string);
        Ok(true)
    }

    pub fn remove_subject(&mut self, subject_id: &str) -> Result<AssignedSubject, RecordsError> {
        let index = self
            .subjects
            .iter()
            .position(|s| s.subject_id == subject_id)
            .ok_or_else(|| RecordsError::not_found("subject", subject_id))?;
        Ok(self.subjects.remove(index))
    }

    /// True when the teacher is canonically assigned to any subject here.
    pub fn teaches_in_class(&self, teacher_id: &str) -> bool {
        self.subjects
            .iter()
            .any(|s| s.teacher_id.as_deref() == Some(teacher_id))
    }
}

/// DTO for adding a subject to a class.
#[derive(Debug, Deserialize, Validate)]
pub struct AddSubjectRequest {
    #[validate(length(min = 1, max = 100, message = "Subject name must be 1-100 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "Subject code must be 1-20 characters."))]
    pub code: String,
    #[validate(length(min = 1, max = 64, message = "Teacher id must be 1-64 characters."))]
    pub teacher_id: Option<String>,
    #[validate(range(max = 100, message = "Credits must not exceed 100."))]
    pub credits: Option<u32>,
}

/// DTO for assigning a teacher to a subject.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignTeacherRequest {
    #[validate(length(min = 1, max = 64, message = "Teacher id must be 1-64 characters."))]
    pub teacher_id: String,
}
