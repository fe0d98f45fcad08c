// src/store/memory.rs

//! In-process store and directory. Used by the test-suite and for running the
//! service without a database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{AcademicStore, BulkEdit, ClassDirectory, ClassInfo, DocEdit, sweep_outcome};
use crate::models::{assignment::SubjectAssignment, exam::Exam, mark::MarkRecord};
use crate::services::RecordsError;

/// Collections whose writes can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Assignments,
    Exams,
    MarkRecords,
}

/// Remaining write allowance per collection; negative means unlimited.
struct WriteBudget {
    assignments: AtomicI64,
    exams: AtomicI64,
    mark_records: AtomicI64,
}

impl WriteBudget {
    fn slot(&self, collection: Collection) -> &AtomicI64 {
        match collection {
            Collection::Assignments => &self.assignments,
            Collection::Exams => &self.exams,
            Collection::MarkRecords => &self.mark_records,
        }
    }

    fn take(&self, collection: Collection) -> Result<(), RecordsError> {
        let slot = self.slot(collection);
        let granted = slot
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                n if n < 0 => Some(n),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok();
        if granted {
            Ok(())
        } else {
            Err(RecordsError::Store(format!(
                "write to {:?} rejected by injected failure",
                collection
            )))
        }
    }
}

#[derive(Default)]
struct Collections {
    assignments: HashMap<String, SubjectAssignment>,
    exams: Vec<Exam>,
    mark_records: HashMap<(String, String), MarkRecord>,
}

pub struct MemoryStore {
    data: RwLock<Collections>,
    budget: WriteBudget,
    /// Students whose mark record rejects every write.
    blocked_records: RwLock<HashSet<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Collections::default()),
            budget: WriteBudget {
                assignments: AtomicI64::new(-1),
                exams: AtomicI64::new(-1),
                mark_records: AtomicI64::new(-1),
            },
            blocked_records: RwLock::new(HashSet::new()),
        }
    }

    /// Every following write to `collection` fails.
    pub fn fail_writes(&self, collection: Collection) {
        self.fail_writes_after(collection, 0);
    }

    /// The next `allowed` writes to `collection` succeed, later ones fail.
    pub fn fail_writes_after(&self, collection: Collection, allowed: u32) {
        self.budget
            .slot(collection)
            .store(i64::from(allowed), Ordering::SeqCst);
    }

    /// Writes to this student's mark record fail until
    /// `restore_writes(Collection::MarkRecords)`.
    pub fn fail_mark_record_writes(&self, student_id: &str) {
        self.blocked_records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(student_id.to_string());
    }

    pub fn restore_writes(&self, collection: Collection) {
        self.budget.slot(collection).store(-1, Ordering::SeqCst);
        if collection == Collection::MarkRecords {
            self.blocked_records
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    fn take_mark_record(&self, student_id: &str) -> Result<(), RecordsError> {
        let blocked = self
            .blocked_records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(student_id);
        if blocked {
            return Err(RecordsError::Store(format!(
                "write to mark record of {} rejected by injected failure",
                student_id
            )));
        }
        self.budget.take(Collection::MarkRecords)
    }

    /// Overwrites a stored exam as-is, bypassing propagation. Lets tests
    /// reproduce drift between the canonical assignment and its copies.
    pub fn put_exam(&self, exam: Exam) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.exams.retain(|e| e.exam_id != exam.exam_id);
        data.exams.push(exam);
    }

    /// Overwrites a stored mark record as-is.
    pub fn put_mark_record(&self, record: MarkRecord) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.mark_records.insert(
            (record.student_id.clone(), record.class_id.clone()),
            record,
        );
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Collections> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Collections> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Applies `edit` to a copy and commits it only on success.
fn edit_copy<D: Clone>(
    doc: &mut D,
    edit: DocEdit<'_, D>,
    commit: impl FnOnce() -> Result<(), RecordsError>,
) -> Result<D, RecordsError> {
    let mut draft = doc.clone();
    if edit(&mut draft)? {
        commit()?;
        *doc = draft.clone();
    }
    Ok(draft)
}

#[async_trait]
impl AcademicStore for MemoryStore {
    async fn find_assignment(
        &self,
        class_id: &str,
    ) -> Result<Option<SubjectAssignment>, RecordsError> {
        Ok(self.read().assignments.get(class_id).cloned())
    }

    async fn insert_assignment(&self, doc: &SubjectAssignment) -> Result<bool, RecordsError> {
        let mut data = self.write();
        if data.assignments.contains_key(&doc.class_id) {
            return Ok(false);
        }
        self.budget.take(Collection::Assignments)?;
        data.assignments.insert(doc.class_id.clone(), doc.clone());
        Ok(true)
    }

    async fn update_assignment(
        &self,
        class_id: &str,
        edit: DocEdit<'_, SubjectAssignment>,
    ) -> Result<Option<SubjectAssignment>, RecordsError> {
        let mut data = self.write();
        let Some(doc) = data.assignments.get_mut(class_id) else {
            return Ok(None);
        };
        edit_copy(doc, edit, || self.budget.take(Collection::Assignments)).map(Some)
    }

    async fn find_exam(&self, exam_id: &str) -> Result<Option<Exam>, RecordsError> {
        Ok(self.read().exams.iter().find(|e| e.exam_id == exam_id).cloned())
    }

    async fn list_exams(&self, class_id: &str) -> Result<Vec<Exam>, RecordsError> {
        let mut exams: Vec<Exam> = self
            .read()
            .exams
            .iter()
            .filter(|e| e.class_id == class_id)
            .cloned()
            .collect();
        exams.sort_by(|a, b| a.exam_date.cmp(&b.exam_date));
        Ok(exams)
    }

    async fn insert_exam(&self, exam: &Exam) -> Result<(), RecordsError> {
        let mut data = self.write();
        if data.exams.iter().any(|e| e.exam_id == exam.exam_id) {
            return Err(RecordsError::Duplicate(format!(
                "Exam id '{}' already exists",
                exam.exam_id
            )));
        }
        if data
            .exams
            .iter()
            .any(|e| e.class_id == exam.class_id && e.clashes_with(&exam.exam_name, &exam.exam_code))
        {
            return Err(RecordsError::Duplicate(
                "Exam name or code already used in this class".to_string(),
            ));
        }
        self.budget.take(Collection::Exams)?;
        data.exams.push(exam.clone());
        Ok(())
    }

    async fn update_exam(
        &self,
        exam_id: &str,
        edit: DocEdit<'_, Exam>,
    ) -> Result<Option<Exam>, RecordsError> {
        let mut data = self.write();
        let Some(exam) = data.exams.iter_mut().find(|e| e.exam_id == exam_id) else {
            return Ok(None);
        };
        edit_copy(exam, edit, || self.budget.take(Collection::Exams)).map(Some)
    }

    async fn update_exams_in_class(
        &self,
        class_id: &str,
        edit: BulkEdit<'_, Exam>,
    ) -> Result<u64, RecordsError> {
        let mut data = self.write();
        let mut changed = 0;
        let mut failed = Vec::new();
        for exam in data.exams.iter_mut().filter(|e| e.class_id == class_id) {
            let mut draft = exam.clone();
            if edit(&mut draft) {
                match self.budget.take(Collection::Exams) {
                    Ok(()) => {
                        *exam = draft;
                        changed += 1;
                    }
                    Err(e) => failed.push(format!("{}: {}", exam.exam_id, e)),
                }
            }
        }
        sweep_outcome("exams", changed, failed)
    }

    async fn delete_exam(&self, exam_id: &str) -> Result<bool, RecordsError> {
        let mut data = self.write();
        if !data.exams.iter().any(|e| e.exam_id == exam_id) {
            return Ok(false);
        }
        self.budget.take(Collection::Exams)?;
        data.exams.retain(|e| e.exam_id != exam_id);
        Ok(true)
    }

    async fn find_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Option<MarkRecord>, RecordsError> {
        let key = (student_id.to_string(), class_id.to_string());
        Ok(self.read().mark_records.get(&key).cloned())
    }

    async fn list_mark_records(&self, class_id: &str) -> Result<Vec<MarkRecord>, RecordsError> {
        let mut records: Vec<MarkRecord> = self
            .read()
            .mark_records
            .values()
            .filter(|r| r.class_id == class_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(records)
    }

    async fn insert_mark_record(&self, record: &MarkRecord) -> Result<bool, RecordsError> {
        let mut data = self.write();
        let key = (record.student_id.clone(), record.class_id.clone());
        if data.mark_records.contains_key(&key) {
            return Ok(false);
        }
        self.take_mark_record(&record.student_id)?;
        data.mark_records.insert(key, record.clone());
        Ok(true)
    }

    async fn update_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
        edit: DocEdit<'_, MarkRecord>,
    ) -> Result<Option<MarkRecord>, RecordsError> {
        let mut data = self.write();
        let key = (student_id.to_string(), class_id.to_string());
        let Some(record) = data.mark_records.get_mut(&key) else {
            return Ok(None);
        };
        edit_copy(record, edit, || self.take_mark_record(student_id)).map(Some)
    }

    async fn update_mark_records_in_class(
        &self,
        class_id: &str,
        edit: BulkEdit<'_, MarkRecord>,
    ) -> Result<u64, RecordsError> {
        let mut data = self.write();
        let mut keys: Vec<(String, String)> = data
            .mark_records
            .keys()
            .filter(|(_, class)| class == class_id)
            .cloned()
            .collect();
        keys.sort();

        let mut changed = 0;
        let mut failed = Vec::new();
        for key in keys {
            let Some(record) = data.mark_records.get_mut(&key) else {
                continue;
            };
            let mut draft = record.clone();
            if edit(&mut draft) {
                match self.take_mark_record(&key.0) {
                    Ok(()) => {
                        *record = draft;
                        changed += 1;
                    }
                    Err(e) => failed.push(format!("{}: {}", key.0, e)),
                }
            }
        }
        sweep_outcome("mark records", changed, failed)
    }
}

#[derive(Debug, Clone)]
struct Membership {
    info: ClassInfo,
    students: Vec<(String, bool)>,
}

/// In-process class directory.
#[derive(Default)]
pub struct MemoryDirectory {
    classes: RwLock<HashMap<String, Membership>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&self, class_id: &str, school_id: &str, class_admin_id: &str) {
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        classes.insert(
            class_id.to_string(),
            Membership {
                info: ClassInfo {
                    class_id: class_id.to_string(),
                    school_id: school_id.to_string(),
                    class_admin_id: class_admin_id.to_string(),
                },
                students: Vec::new(),
            },
        );
    }

    /// Adds (or re-activates) a student. Ignored for unknown classes.
    pub fn enroll(&self, class_id: &str, student_id: &str) {
        self.set_active(class_id, student_id, true);
    }

    pub fn deactivate(&self, class_id: &str, student_id: &str) {
        self.set_active(class_id, student_id, false);
    }

    fn set_active(&self, class_id: &str, student_id: &str, active: bool) {
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        let Some(class) = classes.get_mut(class_id) else {
            return;
        };
        match class.students.iter_mut().find(|(id, _)| id == student_id) {
            Some(entry) => entry.1 = active,
            None => class.students.push((student_id.to_string(), active)),
        }
    }
}

#[async_trait]
impl ClassDirectory for MemoryDirectory {
    async fn class_info(&self, class_id: &str) -> Result<Option<ClassInfo>, RecordsError> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(classes.get(class_id).map(|c| c.info.clone()))
    }

    async fn active_students(&self, class_id: &str) -> Result<Vec<String>, RecordsError> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(classes
            .get(class_id)
            .map(|c| {
                c.students
                    .iter()
                    .filter(|(_, active)| *active)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_active_student(
        &self,
        class_id: &str,
        student_id: &str,
    ) -> Result<bool, RecordsError> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(classes.get(class_id).is_some_and(|c| {
            c.students
                .iter()
                .any(|(id, active)| id == student_id && *active)
        }))
    }
}
