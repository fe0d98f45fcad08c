// src/services/reports.rs

use super::{Academics, RecordsError};
use crate::grading::{self, GradeScale};
use crate::models::{
    exam::ExamSubject,
    mark::ExamMarks,
    report::{
        ExamResult, ExamResults, GradeBucket, ScoreHolder, StudentExamResult, StudentReport,
        SubjectResult, SubjectStatistics,
    },
};

/// Totals, percentage, grade and completion for one exam entry.
/// Unscored subjects count as zero against their full marks; `completion`
/// shows how many of them have been scored. An entry with nothing scored
/// has no percentage yet.
pub fn build_exam_result(entry: &ExamMarks, scale: GradeScale) -> ExamResult {
    let subjects: Vec<SubjectResult> = entry
        .subjects
        .iter()
        .map(|s| {
            let percentage = s
                .marks_scored
                .and_then(|m| grading::percentage(m, s.full_marks));
            SubjectResult {
                subject_id: s.subject_id.clone(),
                subject_name: s.subject_name.clone(),
                full_marks: s.full_marks,
                marks_scored: s.marks_scored,
                percentage: percentage.map(grading::round2),
                grade: percentage.map(|p| scale.grade_for(p)),
            }
        })
        .collect();

    let total_scored: f64 = entry.subjects.iter().filter_map(|s| s.marks_scored).sum();
    let total_full_marks: f64 = entry.subjects.iter().map(|s| s.full_marks).sum();
    let scored_subjects = entry
        .subjects
        .iter()
        .filter(|s| s.marks_scored.is_some())
        .count();

    let percentage = match scored_subjects {
        0 => None,
        _ => grading::percentage(total_scored, total_full_marks),
    };
    let total_subjects = entry.subjects.len();
    let completion = if total_subjects == 0 {
        0.0
    } else {
        scored_subjects as f64 / total_subjects as f64
    };

    ExamResult {
        exam_id: entry.exam_id.clone(),
        exam_name: entry.exam_name.clone(),
        exam_code: entry.exam_code.clone(),
        exam_date: entry.exam_date,
        subjects,
        total_scored,
        total_full_marks,
        percentage: percentage.map(grading::round2),
        grade: percentage.map(|p| scale.grade_for(p)),
        passed: percentage.map(|p| scale.is_pass(p)),
        scored_subjects,
        total_subjects,
        completion,
    }
}

/// Class statistics for one subject. `marks` holds one `(student, score)`
/// pair per student with an entry; unscored entries count towards
/// `total_students` only. Percentages use the exam's `full_marks`.
pub fn build_subject_statistics(
    exam_id: &str,
    subject: &ExamSubject,
    marks: &[(String, Option<f64>)],
    scale: GradeScale,
) -> SubjectStatistics {
    let scored: Vec<(&str, f64)> = marks
        .iter()
        .filter_map(|(student, m)| m.map(|m| (student.as_str(), m)))
        .collect();
    let values: Vec<f64> = scored.iter().map(|(_, m)| *m).collect();

    let mut highest: Option<ScoreHolder> = None;
    let mut lowest: Option<ScoreHolder> = None;
    for (student, m) in &scored {
        if highest.as_ref().is_none_or(|h| *m > h.marks) {
            highest = Some(ScoreHolder {
                student_id: student.to_string(),
                marks: *m,
            });
        }
        if lowest.as_ref().is_none_or(|l| *m < l.marks) {
            lowest = Some(ScoreHolder {
                student_id: student.to_string(),
                marks: *m,
            });
        }
    }

    let pass_percentage = scale.pass_percentage();
    let percentages: Vec<f64> = values
        .iter()
        .filter_map(|m| grading::percentage(*m, subject.full_marks))
        .collect();
    let passed = percentages.iter().filter(|p| scale.is_pass(**p)).count();

    let distribution = scale
        .band_ranges(subject.full_marks)
        .into_iter()
        .map(|(grade, range)| GradeBucket {
            grade,
            range,
            count: percentages
                .iter()
                .filter(|p| scale.grade_for(**p) == grade)
                .count(),
        })
        .collect();

    SubjectStatistics {
        exam_id: exam_id.to_string(),
        subject_id: subject.subject_id.clone(),
        subject_name: subject.subject_name.clone(),
        full_marks: subject.full_marks,
        total_students: marks.len(),
        scored_count: scored.len(),
        mean: grading::mean(&values).map(grading::round2),
        median: grading::median(&values),
        highest,
        lowest,
        pass_percentage,
        passed,
        failed: percentages.len() - passed,
        distribution,
    }
}

impl Academics {
    /// Every exam result of one student.
    pub async fn student_report(
        &self,
        class_id: &str,
        caller: &str,
        student_id: &str,
    ) -> Result<StudentReport, RecordsError> {
        self.authorize_read(class_id, caller, Some(student_id))
            .await?;

        let exams = match self.store.find_mark_record(student_id, class_id).await? {
            Some(record) => record
                .exams
                .iter()
                .map(|e| build_exam_result(e, self.scale))
                .collect(),
            None => {
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
                Vec::new()
            }
        };

        Ok(StudentReport {
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            exams,
        })
    }

    /// One result line per student holding an entry for the exam.
    pub async fn exam_results(
        &self,
        class_id: &str,
        caller: &str,
        exam_id: &str,
    ) -> Result<ExamResults, RecordsError> {
        self.authorize_read(class_id, caller, None).await?;
        self.load_exam_in_class(class_id, exam_id).await?;

        let students = self
            .store
            .list_mark_records(class_id)
            .await?
            .iter()
            .filter_map(|record| {
                record.exam(exam_id).map(|entry| StudentExamResult {
                    student_id: record.student_id.clone(),
                    result: build_exam_result(entry, self.scale),
                })
            })
            .collect();

        Ok(ExamResults {
            exam_id: exam_id.to_string(),
            class_id: class_id.to_string(),
            students,
        })
    }

    /// Statistics for one subject of one exam. Readable by the class admin
    /// and the subject's current teacher (checked against the canonical
    /// assignment).
    pub async fn subject_statistics(
        &self,
        class_id: &str,
        caller: &str,
        exam_id: &str,
        subject_id: &str,
    ) -> Result<SubjectStatistics, RecordsError> {
        let class = self.require_class(class_id).await?;
        if class.class_admin_id != caller {
            let assignment = self.load_assignment(class_id).await?;
            if assignment.teacher_of(subject_id) != Some(caller) {
                return Err(RecordsError::SubjectNotAssignedToCaller {
                    subject_id: subject_id.to_string(),
                });
            }
        }

        let exam = self.load_exam_in_class(class_id, exam_id).await?;
        let subject = exam
            .subject(subject_id)
            .ok_or_else(|| RecordsError::not_found("exam subject", subject_id))?;

        let marks: Vec<(String, Option<f64>)> = self
            .store
            .list_mark_records(class_id)
            .await?
            .into_iter()
            .filter_map(|record| {
                let scored = record
                    .exam(exam_id)
                    .and_then(|e| e.subject(subject_id))
                    .map(|s| s.marks_scored)?;
                Some((record.student_id, scored))
            })
            .collect();

        Ok(build_subject_statistics(exam_id, subject, &marks, self.scale))
    }
}
