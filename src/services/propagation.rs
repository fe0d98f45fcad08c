// src/services/propagation.rs

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::{Academics, RecordsError};
use crate::models::{exam::Exam, mark::MarkRecord};

/// How far a teacher change reached the denormalized copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationReport {
    pub exams_updated: u64,
    pub mark_records_updated: u64,
    /// One entry per failed fan-out step. Empty when fully propagated.
    pub warnings: Vec<String>,
}

impl PropagationReport {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Outcome of a reconciliation pass over one class.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub class_id: String,
    pub exams_repaired: u64,
    pub mark_records_scanned: u64,
    pub mark_records_repaired: u64,
}

impl SyncReport {
    /// True if drift was found (and fixed).
    pub fn repaired_anything(&self) -> bool {
        self.exams_repaired > 0 || self.mark_records_repaired > 0
    }
}

impl Academics {
    /// Copies a canonical teacher value into every exam and mark record of the
    /// class. Idempotent; each document is updated on its own, so a failure
    /// can leave the class partly updated. Failures are logged and reported.
    ///
    /// Removing a teacher also drops `scoredBy` on existing marks; the scores stay.
    pub(crate) async fn propagate_teacher(
        &self,
        class_id: &str,
        subject_id: &str,
        teacher_id: Option<&str>,
    ) -> PropagationReport {
        let mut report = PropagationReport::default();

        let exam_edit = |exam: &mut Exam| exam.set_subject_teacher(subject_id, teacher_id);
        match self.store.update_exams_in_class(class_id, &exam_edit).await {
            Ok(n) => report.exams_updated = n,
            Err(e) => {
                let failure = RecordsError::PropagationFailure(format!(
                    "exams of class {} for subject {}: {}",
                    class_id, subject_id, e
                ));
                tracing::warn!("{}", failure);
                report.warnings.push(failure.to_string());
            }
        }

        let clear_scorer = teacher_id.is_none();
        let mark_edit = |record: &mut MarkRecord| {
            record.set_subject_teacher(subject_id, teacher_id, clear_scorer)
        };
        match self
            .store
            .update_mark_records_in_class(class_id, &mark_edit)
            .await
        {
            Ok(n) => report.mark_records_updated = n,
            Err(e) => {
                let failure = RecordsError::PropagationFailure(format!(
                    "mark records of class {} for subject {}: {}",
                    class_id, subject_id, e
                ));
                tracing::warn!("{}", failure);
                report.warnings.push(failure.to_string());
            }
        }

        tracing::debug!(
            "Propagated subject {} in class {}: {} exams, {} mark records",
            subject_id,
            class_id,
            report.exams_updated,
            report.mark_records_updated
        );
        report
    }

    /// Re-derives every teacher copy in the class from the canonical
    /// assignment and fixes whatever drifted. Subjects no longer in the
    /// assignment are left untouched.
    pub async fn sync_assignments(
        &self,
        class_id: &str,
        caller: &str,
    ) -> Result<SyncReport, RecordsError> {
        self.require_class_admin(class_id, caller).await?;
        let assignment = self.load_assignment(class_id).await?;

        let canonical: Vec<(String, Option<String>)> = assignment
            .subjects
            .iter()
            .map(|s| (s.subject_id.clone(), s.teacher_id.clone()))
            .collect();

        let exam_edit = |exam: &mut Exam| {
            canonical.iter().fold(false, |changed, (subject_id, teacher)| {
                exam.set_subject_teacher(subject_id, teacher.as_deref()) || changed
            })
        };
        let exams_repaired = self
            .store
            .update_exams_in_class(class_id, &exam_edit)
            .await?;

        let scanned = AtomicU64::new(0);
        let mark_edit = |record: &mut MarkRecord| {
            scanned.fetch_add(1, Ordering::Relaxed);
            canonical.iter().fold(false, |changed, (subject_id, teacher)| {
                record.set_subject_teacher(subject_id, teacher.as_deref(), teacher.is_none())
                    || changed
            })
        };
        let mark_records_repaired = self
            .store
            .update_mark_records_in_class(class_id, &mark_edit)
            .await?;

        let report = SyncReport {
            class_id: class_id.to_string(),
            exams_repaired,
            mark_records_scanned: scanned.load(Ordering::Relaxed),
            mark_records_repaired,
        };

        if report.repaired_anything() {
            tracing::info!(
                "Consistency repair in class {}: {} exams and {} of {} mark records corrected",
                class_id,
                report.exams_repaired,
                report.mark_records_repaired,
                report.mark_records_scanned
            );
        } else {
            tracing::debug!("Class {} already consistent", class_id);
        }
        Ok(report)
    }
}
