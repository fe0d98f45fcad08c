// src/models/report.rs

use chrono::NaiveDate;
use serde::Serialize;

/// One subject line of a student's exam report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject_id: String,
    pub subject_name: String,
    pub full_marks: f64,
    pub marks_scored: Option<f64>,
    pub percentage: Option<f64>,
    pub grade: Option<&'static str>,
}

/// A student's result for one exam. Computed on read, never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub exam_id: String,
    pub exam_name: String,
    pub exam_code: String,
    pub exam_date: NaiveDate,
    pub subjects: Vec<SubjectResult>,
    /// Sum of scored marks.
    pub total_scored: f64,
    /// Sum of full marks over every subject of the exam.
    pub total_full_marks: f64,
    pub percentage: Option<f64>,
    pub grade: Option<&'static str>,
    pub passed: Option<bool>,
    pub scored_subjects: usize,
    pub total_subjects: usize,
    /// `scored_subjects / total_subjects`.
    pub completion: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student_id: String,
    pub class_id: String,
    pub exams: Vec<ExamResult>,
}

/// Per-student line in the class results for one exam.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExamResult {
    pub student_id: String,
    pub result: ExamResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResults {
    pub exam_id: String,
    pub class_id: String,
    pub students: Vec<StudentExamResult>,
}

/// A score and the student who holds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreHolder {
    pub student_id: String,
    pub marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBucket {
    pub grade: &'static str,
    /// Marks range for the band on this subject's scale, e.g. `"45-50"`.
    pub range: String,
    pub count: usize,
}

/// Class statistics for one subject in one exam.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatistics {
    pub exam_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub full_marks: f64,
    pub total_students: usize,
    pub scored_count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub highest: Option<ScoreHolder>,
    pub lowest: Option<ScoreHolder>,
    pub pass_percentage: f64,
    pub passed: usize,
    pub failed: usize,
    pub distribution: Vec<GradeBucket>,
}
