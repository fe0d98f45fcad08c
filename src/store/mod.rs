// src/store/mod.rs

//! Persistence seam for the three academic collections and the class directory.
//!
//! Every `update_*` call is atomic for the one document it touches. The
//! `*_in_class` variants visit each document of a class in turn; each visit is
//! atomic but the sweep as a whole is not. A document that cannot be written
//! is skipped, the sweep carries on, and the skipped documents are reported
//! in the returned error.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{assignment::SubjectAssignment, exam::Exam, mark::MarkRecord};
use crate::services::RecordsError;

pub use memory::{Collection, MemoryDirectory, MemoryStore};
pub use postgres::{PgDirectory, PgStore};

/// Read-modify-write of a single document. Returns whether the document
/// changed; an unchanged document is not written back. An `Err` aborts the
/// update without writing.
pub type DocEdit<'a, D> = &'a (dyn Fn(&mut D) -> Result<bool, RecordsError> + Send + Sync);

/// Edit applied to each document of a bulk sweep. Returns whether it changed.
pub type BulkEdit<'a, D> = &'a (dyn Fn(&mut D) -> bool + Send + Sync);

#[async_trait]
pub trait AcademicStore: Send + Sync {
    async fn find_assignment(&self, class_id: &str)
    -> Result<Option<SubjectAssignment>, RecordsError>;

    /// Inserts the document unless the class already has one.
    /// Returns `false` if one existed.
    async fn insert_assignment(&self, doc: &SubjectAssignment) -> Result<bool, RecordsError>;

    /// `Ok(None)` when the class has no assignment document.
    async fn update_assignment(
        &self,
        class_id: &str,
        edit: DocEdit<'_, SubjectAssignment>,
    ) -> Result<Option<SubjectAssignment>, RecordsError>;

    async fn find_exam(&self, exam_id: &str) -> Result<Option<Exam>, RecordsError>;

    async fn list_exams(&self, class_id: &str) -> Result<Vec<Exam>, RecordsError>;

    /// Fails with `Duplicate` if the id, or the name/code within the class, is taken.
    async fn insert_exam(&self, exam: &Exam) -> Result<(), RecordsError>;

    async fn update_exam(
        &self,
        exam_id: &str,
        edit: DocEdit<'_, Exam>,
    ) -> Result<Option<Exam>, RecordsError>;

    /// Returns the number of exams changed. Fails with `Store` naming the
    /// exams that could not be written; the others are still updated.
    async fn update_exams_in_class(
        &self,
        class_id: &str,
        edit: BulkEdit<'_, Exam>,
    ) -> Result<u64, RecordsError>;

    async fn delete_exam(&self, exam_id: &str) -> Result<bool, RecordsError>;

    async fn find_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Option<MarkRecord>, RecordsError>;

    async fn list_mark_records(&self, class_id: &str) -> Result<Vec<MarkRecord>, RecordsError>;

    /// Inserts the record unless the student already has one in the class.
    /// Returns `false` if one existed.
    async fn insert_mark_record(&self, record: &MarkRecord) -> Result<bool, RecordsError>;

    async fn update_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
        edit: DocEdit<'_, MarkRecord>,
    ) -> Result<Option<MarkRecord>, RecordsError>;

    /// Returns the number of records changed. Fails with `Store` naming the
    /// students whose records could not be written; the others are still updated.
    async fn update_mark_records_in_class(
        &self,
        class_id: &str,
        edit: BulkEdit<'_, MarkRecord>,
    ) -> Result<u64, RecordsError>;
}

/// Outcome of a sweep: the changed count, or an error listing skipped documents.
pub(crate) fn sweep_outcome(
    collection: &str,
    changed: u64,
    failed: Vec<String>,
) -> Result<u64, RecordsError> {
    if failed.is_empty() {
        return Ok(changed);
    }
    Err(RecordsError::Store(format!(
        "{} {} not written ({} updated): {}",
        failed.len(),
        collection,
        changed,
        failed.join("; ")
    )))
}

/// Directory entry for a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub class_id: String,
    pub school_id: String,
    pub class_admin_id: String,
}

/// Class membership, owned outside this subsystem.
#[async_trait]
pub trait ClassDirectory: Send + Sync {
    async fn class_info(&self, class_id: &str) -> Result<Option<ClassInfo>, RecordsError>;

    async fn active_students(&self, class_id: &str) -> Result<Vec<String>, RecordsError>;

    async fn is_active_student(&self, class_id: &str, student_id: &str)
    -> Result<bool, RecordsError>;
}
