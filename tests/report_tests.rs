// tests/report_tests.rs

use std::sync::Arc;

use academic_records::{
    grading::GradeScale,
    models::{
        assignment::AddSubjectRequest,
        exam::{CreateExamRequest, ExamSubject, ExamSubjectInput},
        mark::{ExamMarks, SubjectMark},
    },
    services::{Academics, RecordsError, build_exam_result, build_subject_statistics},
    store::{MemoryDirectory, MemoryStore},
};
use chrono::NaiveDate;

const CLASS: &str = "class-9";
const ADMIN: &str = "admin-9";
const MATH_TEACHER: &str = "t-math";
const SCIENCE_TEACHER: &str = "t-science";

struct Scored {
    academics: Academics,
    exam_id: String,
    math: String,
    science: String,
}

/// Math out of 100 and science out of 50. Scores:
/// s1: 82 + 40, s2: 20 + unscored, s3: nothing.
async fn scored_exam(scale: GradeScale) -> Scored {
    let directory = Arc::new(MemoryDirectory::new());
    directory.add_class(CLASS, "school-3", ADMIN);
    for student in ["s1", "s2", "s3"] {
        directory.enroll(CLASS, student);
    }
    let academics = Academics::new(Arc::new(MemoryStore::new()), directory, scale);

    let mut ids = Vec::new();
    for (name, code, teacher) in [
        ("Mathematics", "MATH", MATH_TEACHER),
        ("Science", "SCI", SCIENCE_TEACHER),
    ] {
        let subject = academics
            .add_subject(
                CLASS,
                ADMIN,
                AddSubjectRequest {
                    name: name.to_string(),
                    code: code.to_string(),
                    teacher_id: Some(teacher.to_string()),
                    credits: Some(4),
                },
            )
            .await
            .expect("Failed to add subject");
        ids.push(subject.subject_id);
    }
    let (math, science) = (ids[0].clone(), ids[1].clone());

    let exam_id = academics
        .create_exam(
            CLASS,
            ADMIN,
            CreateExamRequest {
                exam_name: "Term 1".to_string(),
                exam_code: "T1".to_string(),
                exam_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                duration: 120,
                subjects: vec![
                    ExamSubjectInput {
                        subject_id: math.clone(),
                        full_marks: 100.0,
                    },
                    ExamSubjectInput {
                        subject_id: science.clone(),
                        full_marks: 50.0,
                    },
                ],
            },
        )
        .await
        .expect("Failed to create exam")
        .exam
        .exam_id;

    for (teacher, student, subject, marks) in [
        (MATH_TEACHER, "s1", &math, 82.0),
        (SCIENCE_TEACHER, "s1", &science, 40.0),
        (MATH_TEACHER, "s2", &math, 20.0),
    ] {
        academics
            .submit_marks(CLASS, teacher, student, &exam_id, subject, marks)
            .await
            .expect("Failed to submit marks");
    }

    Scored {
        academics,
        exam_id,
        math,
        science,
    }
}

#[tokio::test]
async fn student_report_totals_and_grades() {
    let s = scored_exam(GradeScale::Extended).await;

    let report = s.academics.student_report(CLASS, "s1", "s1").await.unwrap();
    let result = &report.exams[0];
    assert_eq!(result.total_scored, 122.0);
    assert_eq!(result.total_full_marks, 150.0);
    assert_eq!(result.percentage, Some(81.33));
    assert_eq!(result.grade, Some("A"));
    assert_eq!(result.passed, Some(true));
    assert_eq!(result.completion, 1.0);
    assert_eq!(result.subjects[1].grade, Some("A"));

    let report = s.academics.student_report(CLASS, ADMIN, "s2").await.unwrap();
    let result = &report.exams[0];
    assert_eq!(result.total_scored, 20.0);
    assert_eq!(result.total_full_marks, 150.0);
    assert_eq!(result.percentage, Some(13.33));
    assert_eq!(result.grade, Some("F"));
    assert_eq!(result.passed, Some(false));
    assert_eq!(result.scored_subjects, 1);
    assert_eq!(result.completion, 0.5);

    let report = s.academics.student_report(CLASS, ADMIN, "s3").await.unwrap();
    let result = &report.exams[0];
    assert_eq!(result.total_scored, 0.0);
    assert_eq!(result.total_full_marks, 150.0);
    assert_eq!(result.completion, 0.0);
    assert_eq!(result.percentage, None);
    assert_eq!(result.grade, None);
    assert_eq!(result.passed, None);
}

#[tokio::test]
async fn compact_scale_changes_grades_and_pass_line() {
    let s = scored_exam(GradeScale::Compact).await;

    let report = s.academics.student_report(CLASS, ADMIN, "s1").await.unwrap();
    assert_eq!(report.exams[0].grade, Some("A"));

    let stats = s
        .academics
        .subject_statistics(CLASS, ADMIN, &s.exam_id, &s.math)
        .await
        .unwrap();
    assert_eq!(stats.pass_percentage, 50.0);
    assert_eq!(stats.distribution.len(), 6);
}

#[tokio::test]
async fn reports_are_readable_by_class_members_only() {
    let s = scored_exam(GradeScale::Extended).await;

    s.academics
        .student_report(CLASS, SCIENCE_TEACHER, "s2")
        .await
        .unwrap();

    let err = s
        .academics
        .student_report(CLASS, "s2", "s1")
        .await
        .unwrap_err();
    assert!(matches!(err, RecordsError::ReadNotPermitted { .. }));

    let err = s
        .academics
        .exam_results(CLASS, "outsider", &s.exam_id)
        .await
        .unwrap_err();
    assert!(matches!(err, RecordsError::ReadNotPermitted { .. }));

    let err = s
        .academics
        .student_report(CLASS, ADMIN, "never-enrolled")
        .await
        .unwrap_err();
    assert!(matches!(err, RecordsError::StudentNotInClass { .. }));
}

#[tokio::test]
async fn exam_results_list_every_seeded_student() {
    let s = scored_exam(GradeScale::Extended).await;

    let results = s
        .academics
        .exam_results(CLASS, MATH_TEACHER, &s.exam_id)
        .await
        .unwrap();
    let students: Vec<&str> = results
        .students
        .iter()
        .map(|r| r.student_id.as_str())
        .collect();
    assert_eq!(students, vec!["s1", "s2", "s3"]);
    assert_eq!(results.students[0].result.percentage, Some(81.33));
}

#[tokio::test]
async fn subject_statistics_summarise_the_class() {
    let s = scored_exam(GradeScale::Extended).await;

    let stats = s
        .academics
        .subject_statistics(CLASS, MATH_TEACHER, &s.exam_id, &s.math)
        .await
        .unwrap();
    assert_eq!(stats.total_students, 3);
    assert_eq!(stats.scored_count, 2);
    assert_eq!(stats.mean, Some(51.0));
    assert_eq!(stats.median, Some(51.0));
    assert_eq!(stats.highest.as_ref().map(|h| h.student_id.as_str()), Some("s1"));
    assert_eq!(stats.lowest.as_ref().map(|l| l.marks), Some(20.0));
    assert_eq!(stats.pass_percentage, 33.0);
    assert_eq!(stats.passed, 1);
    assert_eq!(stats.failed, 1);

    let a = stats.distribution.iter().find(|b| b.grade == "A").unwrap();
    assert_eq!(a.count, 1);
    assert_eq!(a.range, "80-90");
    let f = stats.distribution.iter().find(|b| b.grade == "F").unwrap();
    assert_eq!(f.count, 1);
    assert_eq!(f.range, "0-33");
}

#[tokio::test]
async fn subject_statistics_follow_the_canonical_teacher() {
    let s = scored_exam(GradeScale::Extended).await;

    let err = s
        .academics
        .subject_statistics(CLASS, SCIENCE_TEACHER, &s.exam_id, &s.math)
        .await
        .unwrap_err();
    assert!(matches!(err, RecordsError::SubjectNotAssignedToCaller { .. }));

    let stats = s
        .academics
        .subject_statistics(CLASS, SCIENCE_TEACHER, &s.exam_id, &s.science)
        .await
        .unwrap();
    assert_eq!(stats.scored_count, 1);
    assert_eq!(stats.full_marks, 50.0);
}

#[test]
fn statistics_with_no_scores_are_empty() {
    let subject = ExamSubject {
        subject_id: "sub-1".to_string(),
        subject_name: "Geography".to_string(),
        teacher_id: None,
        credits: 1,
        full_marks: 40.0,
    };
    let marks: Vec<(String, Option<f64>)> = vec![("a".to_string(), None), ("b".to_string(), None)];

    let stats = build_subject_statistics("exam-1", &subject, &marks, GradeScale::Extended);
    assert_eq!(stats.total_students, 2);
    assert_eq!(stats.scored_count, 0);
    assert_eq!(stats.mean, None);
    assert_eq!(stats.median, None);
    assert!(stats.highest.is_none());
    assert_eq!(stats.passed + stats.failed, 0);
    assert!(stats.distribution.iter().all(|b| b.count == 0));
}

#[test]
fn ties_keep_the_first_holder() {
    let subject = ExamSubject {
        subject_id: "sub-1".to_string(),
        subject_name: "Geography".to_string(),
        teacher_id: None,
        credits: 1,
        full_marks: 10.0,
    };
    let marks: Vec<(String, Option<f64>)> = vec![
        ("a".to_string(), Some(7.0)),
        ("b".to_string(), Some(9.0)),
        ("c".to_string(), Some(9.0)),
        ("d".to_string(), Some(7.0)),
    ];

    let stats = build_subject_statistics("exam-1", &subject, &marks, GradeScale::Extended);
    assert_eq!(stats.highest.unwrap().student_id, "b");
    assert_eq!(stats.lowest.unwrap().student_id, "a");
    assert_eq!(stats.median, Some(8.0));
}

fn paper(subject_id: &str, full_marks: f64, marks_scored: Option<f64>) -> SubjectMark {
    SubjectMark {
        subject_id: subject_id.to_string(),
        subject_name: subject_id.to_uppercase(),
        teacher_id: Some("t-1".to_string()),
        full_marks,
        marks_scored,
        scored_by: marks_scored.map(|_| "t-1".to_string()),
        scored_at: None,
    }
}

#[test]
fn unscored_papers_count_against_the_exam_total() {
    let entry = ExamMarks {
        exam_id: "exam-1".to_string(),
        exam_name: "Term 2".to_string(),
        exam_code: "T2".to_string(),
        exam_date: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
        subjects: vec![paper("math", 100.0, Some(50.0)), paper("art", 100.0, None)],
    };

    let result = build_exam_result(&entry, GradeScale::Extended);
    assert_eq!(result.total_scored, 50.0);
    assert_eq!(result.total_full_marks, 200.0);
    assert_eq!(result.percentage, Some(25.0));
    assert_eq!(result.grade, Some("F"));
    assert_eq!(result.passed, Some(false));
    assert_eq!(result.completion, 0.5);
    assert_eq!(result.subjects[0].grade, Some("C+"));
    assert_eq!(result.subjects[1].grade, None);
}
