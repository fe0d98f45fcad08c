// src/services/assignments.rs

use serde::Serialize;
use validator::Validate;

use super::{Academics, PropagationReport, RecordsError};
use crate::models::assignment::{
    AddSubjectRequest, AssignTeacherRequest, AssignedSubject, SubjectAssignment,
};

/// Result of a canonical teacher change.
/// The change itself always stands; `propagation` says how far the copies got.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentChange {
    pub subject: AssignedSubject,
    pub propagation: PropagationReport,
}

impl Academics {
    /// Creates the class's assignment document. No-op if it already exists.
    pub async fn ensure_subject_assignment(
        &self,
        class_id: &str,
        caller: &str,
    ) -> Result<SubjectAssignment, RecordsError> {
        let class = self.require_class_admin(class_id, caller).await?;
        let doc = SubjectAssignment::new(&class.class_id, &class.school_id, &class.class_admin_id);

        if self.store.insert_assignment(&doc).await? {
            tracing::info!("Created subject assignment document for class {}", class_id);
            return Ok(doc);
        }
        self.load_assignment(class_id).await
    }

    /// Subjects of a class; empty before any subject was added.
    pub async fn list_subjects(&self, class_id: &str) -> Result<Vec<AssignedSubject>, RecordsError> {
        self.require_class(class_id).await?;
        Ok(self
            .store
            .find_assignment(class_id)
            .await?
            .map(|doc| doc.subjects)
            .unwrap_or_default())
    }

    /// Subjects canonically assigned to `teacher_id` in the class.
    pub async fn subjects_for_teacher(
        &self,
        class_id: &str,
        teacher_id: &str,
    ) -> Result<Vec<AssignedSubject>, RecordsError> {
        Ok(self
            .list_subjects(class_id)
            .await?
            .into_iter()
            .filter(|s| s.teacher_id.as_deref() == Some(teacher_id))
            .collect())
    }

    pub async fn add_subject(
        &self,
        class_id: &str,
        caller: &str,
        req: AddSubjectRequest,
    ) -> Result<AssignedSubject, RecordsError> {
        req.validate()?;
        self.ensure_subject_assignment(class_id, caller).await?;

        let subject = AssignedSubject {
            subject_id: uuid::Uuid::new_v4().to_string(),
            name: req.name.trim().to_string(),
            code: req.code.trim().to_string(),
            teacher_id: req
                .teacher_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            credits: req.credits.unwrap_or(1),
            is_active: true,
        };

        let add = |doc: &mut SubjectAssignment| -> Result<bool, RecordsError> {
            doc.add_subject(subject.clone())?;
            Ok(true)
        };
        self.store
            .update_assignment(class_id, &add)
            .await?
            .ok_or_else(|| RecordsError::not_found("subject assignment for class", class_id))?;

        tracing::info!(
            "Added subject {} ({}) to class {}",
            subject.code,
            subject.subject_id,
            class_id
        );
        Ok(subject)
    }

    /// Deletes the subject from the class. Exams and mark records that already
    /// reference it are kept as history.
    pub async fn remove_subject(
        &self,
        class_id: &str,
        caller: &str,
        subject_id: &str,
    ) -> Result<AssignedSubject, RecordsError> {
        self.require_class_admin(class_id, caller).await?;
        let removed = self
            .load_assignment(class_id)
            .await?
            .subject(subject_id)
            .cloned()
            .ok_or_else(|| RecordsError::not_found("subject", subject_id))?;

        let remove = |doc: &mut SubjectAssignment| -> Result<bool, RecordsError> {
            doc.remove_subject(subject_id)?;
            Ok(true)
        };
        self.store
            .update_assignment(class_id, &remove)
            .await?
            .ok_or_else(|| RecordsError::not_found("subject assignment for class", class_id))?;

        tracing::info!("Removed subject {} from class {}", subject_id, class_id);
        Ok(removed)
    }

    pub async fn assign_teacher(
        &self,
        class_id: &str,
        caller: &str,
        subject_id: &str,
        teacher_id: &str,
    ) -> Result<AssignmentChange, RecordsError> {
        let req = AssignTeacherRequest {
            teacher_id: teacher_id.trim().to_string(),
        };
        req.validate()?;
        self.change_teacher(class_id, caller, subject_id, Some(&req.teacher_id))
            .await
    }

    pub async fn remove_teacher(
        &self,
        class_id: &str,
        caller: &str,
        subject_id: &str,
    ) -> Result<AssignmentChange, RecordsError> {
        self.change_teacher(class_id, caller, subject_id, None).await
    }

    /// Writes the canonical value first, then fans it out. A failed fan-out
    /// is reported, not returned as an error.
    async fn change_teacher(
        &self,
        class_id: &str,
        caller: &str,
        subject_id: &str,
        teacher_id: Option<&str>,
    ) -> Result<AssignmentChange, RecordsError> {
        self.require_class_admin(class_id, caller).await?;

        let set = |doc: &mut SubjectAssignment| doc.set_teacher(subject_id, teacher_id);
        let doc = self
            .store
            .update_assignment(class_id, &set)
            .await?
            .ok_or_else(|| RecordsError::not_found("subject assignment for class", class_id))?;
        let subject = doc
            .subject(subject_id)
            .cloned()
            .ok_or_else(|| RecordsError::not_found("subject", subject_id))?;

        match teacher_id {
            Some(teacher) => tracing::info!(
                "Assigned teacher {} to subject {} in class {}",
                teacher,
                subject_id,
                class_id
            ),
            None => tracing::info!(
                "Removed teacher from subject {} in class {}",
                subject_id,
                class_id
            ),
        }

        let propagation = self
            .propagate_teacher(class_id, subject_id, teacher_id)
            .await;
        Ok(AssignmentChange {
            subject,
            propagation,
        })
    }
}
