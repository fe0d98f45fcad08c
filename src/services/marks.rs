// src/services/marks.rs

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::Serialize;

use super::{Academics, RecordsError};
use crate::models::{
    exam::Exam,
    mark::{MarkRecord, SubjectMark},
};

/// Outcome of seeding one exam into the class's mark records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitReport {
    pub exam_id: String,
    pub students: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Students whose record could not be written. A retry picks them up.
    pub failed: Vec<String>,
}

enum Seeded {
    Created,
    Updated,
    Unchanged,
}

impl Academics {
    /// Makes sure every active student has this exam, with all of its
    /// subjects, in their mark record. Safe to re-run.
    pub async fn initialize_exam_marks(
        &self,
        class_id: &str,
        caller: &str,
        exam_id: &str,
    ) -> Result<InitReport, RecordsError> {
        self.require_class_admin(class_id, caller).await?;
        self.seed_exam_marks(class_id, exam_id).await
    }

    /// Per-student failures are collected in the report. The call only fails
    /// when the inputs cannot be loaded or no student at all could be seeded.
    pub(crate) async fn seed_exam_marks(
        &self,
        class_id: &str,
        exam_id: &str,
    ) -> Result<InitReport, RecordsError> {
        let exam = self.load_exam_in_class(class_id, exam_id).await?;
        let students = self.directory.active_students(class_id).await?;
        let class_exams = self.store.list_exams(class_id).await?;

        let mut report = InitReport {
            exam_id: exam_id.to_string(),
            students: students.len(),
            ..InitReport::default()
        };

        for student_id in &students {
            match self.seed_student(student_id, &exam, &class_exams).await {
                Ok(Seeded::Created) => report.created += 1,
                Ok(Seeded::Updated) => report.updated += 1,
                Ok(Seeded::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to seed marks of exam {} for student {}: {}",
                        exam_id,
                        student_id,
                        e
                    );
                    report.failed.push(student_id.clone());
                }
            }
        }

        if !students.is_empty() && report.failed.len() == students.len() {
            return Err(RecordsError::PropagationFailure(format!(
                "mark initialization failed for all {} students of exam {}",
                students.len(),
                exam_id
            )));
        }

        tracing::info!(
            "Seeded exam {} marks: {} created, {} updated, {} unchanged, {} failed",
            exam_id,
            report.created,
            report.updated,
            report.unchanged,
            report.failed.len()
        );
        Ok(report)
    }

    async fn seed_student(
        &self,
        student_id: &str,
        exam: &Exam,
        class_exams: &[Exam],
    ) -> Result<Seeded, RecordsError> {
        let added = AtomicBool::new(false);
        let ensure = |record: &mut MarkRecord| -> Result<bool, RecordsError> {
            let changed = record.ensure_exam(exam);
            if changed {
                added.store(true, Ordering::Relaxed);
            }
            Ok(changed)
        };

        if self
            .store
            .update_mark_record(student_id, &exam.class_id, &ensure)
            .await?
            .is_some()
        {
            return Ok(if added.load(Ordering::Relaxed) {
                Seeded::Updated
            } else {
                Seeded::Unchanged
            });
        }

        // New record: carry every exam the class has, not only this one.
        let mut record = MarkRecord::new(student_id, exam);
        for other in class_exams.iter().filter(|e| e.exam_id != exam.exam_id) {
            record.ensure_exam(other);
        }
        record.ensure_exam(exam);

        if self.store.insert_mark_record(&record).await? {
            return Ok(Seeded::Created);
        }

        // Created concurrently; fall back to appending.
        self.store
            .update_mark_record(student_id, &exam.class_id, &ensure)
            .await?;
        Ok(Seeded::Updated)
    }

    /// Records one score.
    ///
    /// Permission comes from the canonical assignment, the range from the
    /// exam's `fullMarks`. A missing mark record, exam entry or subject entry
    /// is created on the spot from the exam definition.
    pub async fn submit_marks(
        &self,
        class_id: &str,
        caller: &str,
        student_id: &str,
        exam_id: &str,
        subject_id: &str,
        marks_scored: f64,
    ) -> Result<SubjectMark, RecordsError> {
        self.require_class(class_id).await?;
        let exam = self.load_exam_in_class(class_id, exam_id).await?;
        let exam_subject = exam
            .subject(subject_id)
            .ok_or_else(|| RecordsError::not_found("exam subject", subject_id))?;

        let assignment = self.load_assignment(class_id).await?;
        if assignment.teacher_of(subject_id) != Some(caller) {
            return Err(RecordsError::SubjectNotAssignedToCaller {
                subject_id: subject_id.to_string(),
            });
        }

        if !marks_scored.is_finite() || marks_scored < 0.0 || marks_scored > exam_subject.full_marks
        {
            return Err(RecordsError::MarksOutOfRange {
                marks: marks_scored,
                full_marks: exam_subject.full_marks,
            });
        }

        if !self
            .directory
            .is_active_student(class_id, student_id)
            .await?
        {
            return Err(RecordsError::StudentNotInClass {
                student_id: student_id.to_string(),
                class_id: class_id.to_string(),
            });
        }

        let scored_at = Utc::now();
        let score = |record: &mut MarkRecord| -> Result<bool, RecordsError> {
            record.ensure_exam(&exam);
            if record.record_score(exam_id, subject_id, marks_scored, caller, scored_at) {
                Ok(true)
            } else {
                Err(RecordsError::not_found("exam subject", subject_id))
            }
        };

        let record = match self
            .store
            .update_mark_record(student_id, class_id, &score)
            .await?
        {
            Some(record) => record,
            None => {
                let mut fresh = MarkRecord::new(student_id, &exam);
                score(&mut fresh)?;
                if self.store.insert_mark_record(&fresh).await? {
                    tracing::info!(
                        "Created mark record for student {} in class {} on first score",
                        student_id,
                        class_id
                    );
                    fresh
                } else {
                    self.store
                        .update_mark_record(student_id, class_id, &score)
                        .await?
                        .ok_or_else(|| RecordsError::not_found("mark record", student_id))?
                }
            }
        };

        tracing::info!(
            "Teacher {} scored {} for student {} in exam {} subject {}",
            caller,
            marks_scored,
            student_id,
            exam_id,
            subject_id
        );

        record
            .exam(exam_id)
            .and_then(|e| e.subject(subject_id))
            .cloned()
            .ok_or_else(|| RecordsError::not_found("exam subject", subject_id))
    }

    /// A student's raw mark record.
    pub async fn get_mark_record(
        &self,
        class_id: &str,
        caller: &str,
        student_id: &str,
    ) -> Result<MarkRecord, RecordsError> {
        self.authorize_read(class_id, caller, Some(student_id))
            .await?;
        self.store
            .find_mark_record(student_id, class_id)
            .await?
            .ok_or_else(|| RecordsError::not_found("mark record", student_id))
    }
}
