// src/models/mark.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::exam::{Exam, ExamSubject};

/// One subject's score inside a student's exam entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMark {
    pub subject_id: String,
    pub subject_name: String,
    pub teacher_id: Option<String>,
    pub full_marks: f64,
    /// `None` until scored.
    pub marks_scored: Option<f64>,
    pub scored_by: Option<String>,
    pub scored_at: Option<DateTime<Utc>>,
}

impl SubjectMark {
    pub fn unscored(subject: &ExamSubject) -> Self {
        Self {
            subject_id: subject.subject_id.clone(),
            subject_name: subject.subject_name.clone(),
            teacher_id: subject.teacher_id.clone(),
            full_marks: subject.full_marks,
            marks_scored: None,
            scored_by: None,
            scored_at: None,
        }
    }
}

/// A student's entry for one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMarks {
    pub exam_id: String,
    pub exam_name: String,
    pub exam_code: String,
    pub exam_date: NaiveDate,
    pub subjects: Vec<SubjectMark>,
}

impl ExamMarks {
    /// Entry with every subject of the exam, none scored.
    pub fn seeded_from(exam: &Exam) -> Self {
        Self {
            exam_id: exam.exam_id.clone(),
            exam_name: exam.exam_name.clone(),
            exam_code: exam.exam_code.clone(),
            exam_date: exam.exam_date,
            subjects: exam.subjects.iter().map(SubjectMark::unscored).collect(),
        }
    }

    pub fn subject(&self, subject_id: &str) -> Option<&SubjectMark> {
        self.subjects.iter().find(|s| s.subject_id == subject_id)
    }
}

/// The `mark_records` document: one per (student, class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRecord {
    pub student_id: String,
    pub class_id: String,
    pub school_id: String,
    pub class_admin_id: String,
    pub exams: Vec<ExamMarks>,
}

impl MarkRecord {
    pub fn new(student_id: &str, exam: &Exam) -> Self {
        Self {
            student_id: student_id.to_string(),
            class_id: exam.class_id.clone(),
            school_id: exam.school_id.clone(),
            class_admin_id: exam.class_admin_id.clone(),
            exams: Vec::new(),
        }
    }

    pub fn exam(&self, exam_id: &str) -> Option<&ExamMarks> {
        self.exams.iter().find(|e| e.exam_id == exam_id)
    }

    /// Adds whatever part of the exam is missing: the whole entry, or the
    /// subjects not yet present in it. Existing subjects are never touched.
    /// Returns `true` if anything was added.
    pub fn ensure_exam(&mut self, exam: &Exam) -> bool {
        let Some(entry) = self.exams.iter_mut().find(|e| e.exam_id == exam.exam_id) else {
            self.exams.push(ExamMarks::seeded_from(exam));
            return true;
        };

        let mut added = false;
        for subject in &exam.subjects {
            if entry.subject(&subject.subject_id).is_none() {
                entry.subjects.push(SubjectMark::unscored(subject));
                added = true;
            }
        }
        added
    }

    /// Records a score against an existing subject entry.
    /// Returns `false` if the exam/subject entry is absent.
    pub fn record_score(
        &mut self,
        exam_id: &str,
        subject_id: &str,
        marks: f64,
        scored_by: &str,
        scored_at: DateTime<Utc>,
    ) -> bool {
        let slot = self
            .exams
            .iter_mut()
            .find(|e| e.exam_id == exam_id)
            .and_then(|e| e.subjects.iter_mut().find(|s| s.subject_id == subject_id));

        match slot {
            Some(mark) => {
                mark.marks_scored = Some(marks);
                mark.scored_by = Some(scored_by.to_string());
                mark.scored_at = Some(scored_at);
                true
            }
            None => false,
        }
    }

    /// Rewrites the teacher copy of a subject across every exam entry.
    /// With `clear_scorer`, the scorer attribution is dropped too while the
    /// score itself stays.
    pub fn set_subject_teacher(
        &mut self,
        subject_id: &str,
        teacher_id: Option<&str>,
        clear_scorer: bool,
    ) -> bool {
        let mut changed = false;
        for mark in self
            .exams
            .iter_mut()
            .flat_map(|e| e.subjects.iter_mut())
            .filter(|s| s.subject_id == subject_id)
        {
            if mark.teacher_id.as_deref() != teacher_id {
                mark.teacher_id = teacher_id.map(str::to_string);
                changed = true;
            }
            if clear_scorer && mark.scored_by.is_some() {
                mark.scored_by = None;
                changed = true;
            }
        }
        changed
    }

    pub fn remove_exam(&mut self, exam_id: &str) -> bool {
        let before = self.exams.len();
        self.exams.retain(|e| e.exam_id != exam_id);
        self.exams.len() != before
    }

    pub fn remove_exam_subject(&mut self, exam_id: &str, subject_id: &str) -> bool {
        let Some(entry) = self.exams.iter_mut().find(|e| e.exam_id == exam_id) else {
            return false;
        };
        let before = entry.subjects.len();
        entry.subjects.retain(|s| s.subject_id != subject_id);
        entry.subjects.len() != before
    }
}

/// DTO for submitting one score.
#[derive(Debug, Deserialize)]
pub struct SubmitMarksRequest {
    pub marks_scored: f64,
}
