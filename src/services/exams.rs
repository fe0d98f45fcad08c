// src/services/exams.rs

use std::collections::HashSet;

use serde::Serialize;
use validator::Validate;

use super::{Academics, InitReport, RecordsError};
use crate::models::{
    assignment::SubjectAssignment,
    exam::{AddExamSubjectsRequest, CreateExamRequest, Exam, ExamSubject, ExamSubjectInput},
    mark::MarkRecord,
};

/// A new exam together with the seeding of its marks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamCreated {
    pub exam: Exam,
    pub marks: InitReport,
}

/// An exam after its subject list changed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamUpdated {
    pub exam: Exam,
    /// Present when new subjects were seeded into mark records.
    pub marks: Option<InitReport>,
    pub mark_records_updated: u64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRemoved {
    pub exam_id: String,
    pub mark_records_updated: u64,
    pub warnings: Vec<String>,
}

/// Snapshots the canonical subject data (name, teacher, credits) for the
/// chosen subjects.
fn snapshot_subjects(
    assignment: &SubjectAssignment,
    inputs: &[ExamSubjectInput],
) -> Result<Vec<ExamSubject>, RecordsError> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            if !seen.insert(input.subject_id.as_str()) {
                return Err(RecordsError::Validation(format!(
                    "Subject '{}' listed more than once",
                    input.subject_id
                )));
            }
            let subject = assignment
                .subject(&input.subject_id)
                .ok_or_else(|| RecordsError::not_found("subject", &input.subject_id))?;
            if !subject.is_active {
                return Err(RecordsError::Validation(format!(
                    "Subject '{}' is inactive",
                    subject.name
                )));
            }
            Ok(ExamSubject {
                subject_id: subject.subject_id.clone(),
                subject_name: subject.name.clone(),
                teacher_id: subject.teacher_id.clone(),
                credits: subject.credits,
                full_marks: input.full_marks,
            })
        })
        .collect()
}

impl Academics {
    /// Creates an exam and seeds every active student's marks for it.
    /// If seeding fails the exam is deleted again and the error returned.
    pub async fn create_exam(
        &self,
        class_id: &str,
        caller: &str,
        req: CreateExamRequest,
    ) -> Result<ExamCreated, RecordsError> {
        req.validate()?;
        let class = self.require_class_admin(class_id, caller).await?;
        let assignment = self.load_assignment(class_id).await?;
        let subjects = snapshot_subjects(&assignment, &req.subjects)?;

        let exam_name = req.exam_name.trim().to_string();
        let exam_code = req.exam_code.trim().to_string();
        if self
            .store
            .list_exams(class_id)
            .await?
            .iter()
            .any(|e| e.clashes_with(&exam_name, &exam_code))
        {
            return Err(RecordsError::Duplicate(format!(
                "Exam name '{}' or code '{}' already used in this class",
                exam_name, exam_code
            )));
        }

        let exam = Exam {
            exam_id: uuid::Uuid::new_v4().to_string(),
            class_id: class.class_id,
            school_id: class.school_id,
            class_admin_id: class.class_admin_id,
            exam_name,
            exam_code,
            exam_date: req.exam_date,
            duration: req.duration,
            subjects,
        };

        self.create_then_seed(exam).await
    }

    /// Two-phase creation without a multi-document transaction: persist the
    /// exam, seed the marks, and delete the exam if seeding fails.
    async fn create_then_seed(&self, exam: Exam) -> Result<ExamCreated, RecordsError> {
        self.store.insert_exam(&exam).await?;
        tracing::info!(
            "Created exam {} ({}) in class {}",
            exam.exam_code,
            exam.exam_id,
            exam.class_id
        );

        match self.seed_exam_marks(&exam.class_id, &exam.exam_id).await {
            Ok(marks) => Ok(ExamCreated { exam, marks }),
            Err(e) => {
                tracing::warn!(
                    "Mark initialization failed for exam {}, rolling back: {}",
                    exam.exam_id,
                    e
                );
                if let Err(rollback) = self.store.delete_exam(&exam.exam_id).await {
                    tracing::error!(
                        "Failed to roll back exam {} after seeding failure: {}",
                        exam.exam_id,
                        rollback
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn list_exams(&self, class_id: &str) -> Result<Vec<Exam>, RecordsError> {
        self.require_class(class_id).await?;
        self.store.list_exams(class_id).await
    }

    pub async fn get_exam(&self, class_id: &str, exam_id: &str) -> Result<Exam, RecordsError> {
        self.load_exam_in_class(class_id, exam_id).await
    }

    /// Adds subjects to an exam and seeds just those subjects into mark
    /// records. Scored entries are never touched.
    pub async fn add_subjects_to_exam(
        &self,
        class_id: &str,
        caller: &str,
        exam_id: &str,
        req: AddExamSubjectsRequest,
    ) -> Result<ExamUpdated, RecordsError> {
        req.validate()?;
        self.require_class_admin(class_id, caller).await?;
        self.load_exam_in_class(class_id, exam_id).await?;
        let assignment = self.load_assignment(class_id).await?;
        let additions = snapshot_subjects(&assignment, &req.subjects)?;

        let extend = |exam: &mut Exam| -> Result<bool, RecordsError> {
            if let Some(dup) = additions.iter().find(|s| exam.subject(&s.subject_id).is_some()) {
                return Err(RecordsError::Duplicate(format!(
                    "Subject '{}' is already part of this exam",
                    dup.subject_name
                )));
            }
            exam.subjects.extend(additions.iter().cloned());
            Ok(true)
        };
        let exam = self
            .store
            .update_exam(exam_id, &extend)
            .await?
            .ok_or_else(|| RecordsError::not_found("exam", exam_id))?;

        let mut warnings = Vec::new();
        let marks = match self.seed_exam_marks(class_id, exam_id).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Seeding new subjects of exam {} failed: {}", exam_id, e);
                warnings.push(e.to_string());
                None
            }
        };

        let mark_records_updated = marks
            .as_ref()
            .map(|m| (m.created + m.updated) as u64)
            .unwrap_or(0);

        Ok(ExamUpdated {
            exam,
            marks,
            mark_records_updated,
            warnings,
        })
    }

    /// Drops a subject from an exam and from the matching mark entries.
    pub async fn remove_subject_from_exam(
        &self,
        class_id: &str,
        caller: &str,
        exam_id: &str,
        subject_id: &str,
    ) -> Result<ExamUpdated, RecordsError> {
        self.require_class_admin(class_id, caller).await?;
        self.load_exam_in_class(class_id, exam_id).await?;

        let shrink = |exam: &mut Exam| -> Result<bool, RecordsError> {
            if exam.subject(subject_id).is_none() {
                return Err(RecordsError::not_found("exam subject", subject_id));
            }
            if exam.subjects.len() == 1 {
                return Err(RecordsError::Validation(
                    "An exam needs at least one subject".to_string(),
                ));
            }
            exam.subjects.retain(|s| s.subject_id != subject_id);
            Ok(true)
        };
        let exam = self
            .store
            .update_exam(exam_id, &shrink)
            .await?
            .ok_or_else(|| RecordsError::not_found("exam", exam_id))?;

        let (mark_records_updated, warnings) = self
            .sweep_mark_records(class_id, &|record: &mut MarkRecord| {
                record.remove_exam_subject(exam_id, subject_id)
            })
            .await;

        Ok(ExamUpdated {
            exam,
            marks: None,
            mark_records_updated,
            warnings,
        })
    }

    /// Deletes an exam and, best-effort, its entries in mark records.
    pub async fn delete_exam(
        &self,
        class_id: &str,
        caller: &str,
        exam_id: &str,
    ) -> Result<ExamRemoved, RecordsError> {
        self.require_class_admin(class_id, caller).await?;
        self.load_exam_in_class(class_id, exam_id).await?;

        if !self.store.delete_exam(exam_id).await? {
            return Err(RecordsError::not_found("exam", exam_id));
        }
        tracing::info!("Deleted exam {} from class {}", exam_id, class_id);

        let (mark_records_updated, warnings) = self
            .sweep_mark_records(class_id, &|record: &mut MarkRecord| {
                record.remove_exam(exam_id)
            })
            .await;

        Ok(ExamRemoved {
            exam_id: exam_id.to_string(),
            mark_records_updated,
            warnings,
        })
    }

    async fn sweep_mark_records(
        &self,
        class_id: &str,
        edit: &(dyn Fn(&mut MarkRecord) -> bool + Send + Sync),
    ) -> (u64, Vec<String>) {
        match self.store.update_mark_records_in_class(class_id, edit).await {
            Ok(n) => (n, Vec::new()),
            Err(e) => {
                let failure = RecordsError::PropagationFailure(format!(
                    "mark records of class {}: {}",
                    class_id, e
                ));
                tracing::warn!("{}", failure);
                (0, vec![failure.to_string()])
            }
        }
    }
}
