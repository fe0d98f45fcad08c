// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use super::{AcademicStore, BulkEdit, ClassDirectory, ClassInfo, DocEdit, sweep_outcome};
use crate::models::{assignment::SubjectAssignment, exam::Exam, mark::MarkRecord};
use crate::services::RecordsError;

/// Postgres-backed store. Each document is one JSONB row.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks one exam, applies the edit and writes it back when it changed.
    async fn sweep_exam(
        &self,
        exam_id: &str,
        edit: BulkEdit<'_, Exam>,
    ) -> Result<bool, RecordsError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(Json<Exam>,)> =
            sqlx::query_as("SELECT doc FROM exams WHERE exam_id = $1 FOR UPDATE")
                .bind(exam_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut exam),)) = row else {
            return Ok(false);
        };
        let changed = edit(&mut exam);
        if changed {
            sqlx::query("UPDATE exams SET doc = $2, updated_at = NOW() WHERE exam_id = $1")
                .bind(exam_id)
                .bind(Json(&exam))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(changed)
    }

    async fn sweep_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
        edit: BulkEdit<'_, MarkRecord>,
    ) -> Result<bool, RecordsError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(Json<MarkRecord>,)> = sqlx::query_as(
            "SELECT doc FROM mark_records WHERE student_id = $1 AND class_id = $2 FOR UPDATE",
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((Json(mut record),)) = row else {
            return Ok(false);
        };
        let changed = edit(&mut record);
        if changed {
            sqlx::query(
                r#"
                UPDATE mark_records SET doc = $3, updated_at = NOW()
                WHERE student_id = $1 AND class_id = $2
                "#,
            )
            .bind(student_id)
            .bind(class_id)
            .bind(Json(&record))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(changed)
    }
}

#[async_trait]
impl AcademicStore for PgStore {
    async fn find_assignment(
        &self,
        class_id: &str,
    ) -> Result<Option<SubjectAssignment>, RecordsError> {
        let row: Option<(Json<SubjectAssignment>,)> =
            sqlx::query_as("SELECT doc FROM subject_assignments WHERE class_id = $1")
                .bind(class_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn insert_assignment(&self, doc: &SubjectAssignment) -> Result<bool, RecordsError> {
        let result = sqlx::query(
            r#"
            INSERT INTO subject_assignments (class_id, doc)
            VALUES ($1, $2)
            ON CONFLICT (class_id) DO NOTHING
            "#,
        )
        .bind(&doc.class_id)
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_assignment(
        &self,
        class_id: &str,
        edit: DocEdit<'_, SubjectAssignment>,
    ) -> Result<Option<SubjectAssignment>, RecordsError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Json<SubjectAssignment>,)> = sqlx::query_as(
            "SELECT doc FROM subject_assignments WHERE class_id = $1 FOR UPDATE",
        )
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((Json(mut doc),)) = row else {
            return Ok(None);
        };

        if edit(&mut doc)? {
            sqlx::query(
                "UPDATE subject_assignments SET doc = $2, updated_at = NOW() WHERE class_id = $1",
            )
            .bind(class_id)
            .bind(Json(&doc))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(Some(doc))
    }

    async fn find_exam(&self, exam_id: &str) -> Result<Option<Exam>, RecordsError> {
        let row: Option<(Json<Exam>,)> = sqlx::query_as("SELECT doc FROM exams WHERE exam_id = $1")
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(exam),)| exam))
    }

    async fn list_exams(&self, class_id: &str) -> Result<Vec<Exam>, RecordsError> {
        let rows: Vec<(Json<Exam>,)> = sqlx::query_as(
            "SELECT doc FROM exams WHERE class_id = $1 ORDER BY exam_date, created_at",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(exam),)| exam).collect())
    }

    async fn insert_exam(&self, exam: &Exam) -> Result<(), RecordsError> {
        // Unique indexes on (class_id, lower(name)) and (class_id, lower(code))
        // turn a clash into `RecordsError::Duplicate`.
        sqlx::query(
            r#"
            INSERT INTO exams (exam_id, class_id, exam_name, exam_code, exam_date, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&exam.exam_id)
        .bind(&exam.class_id)
        .bind(&exam.exam_name)
        .bind(&exam.exam_code)
        .bind(exam.exam_date)
        .bind(Json(exam))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_exam(
        &self,
        exam_id: &str,
        edit: DocEdit<'_, Exam>,
    ) -> Result<Option<Exam>, RecordsError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Json<Exam>,)> =
            sqlx::query_as("SELECT doc FROM exams WHERE exam_id = $1 FOR UPDATE")
                .bind(exam_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut exam),)) = row else {
            return Ok(None);
        };

        if edit(&mut exam)? {
            sqlx::query("UPDATE exams SET doc = $2, updated_at = NOW() WHERE exam_id = $1")
                .bind(exam_id)
                .bind(Json(&exam))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(Some(exam))
    }

    async fn update_exams_in_class(
        &self,
        class_id: &str,
        edit: BulkEdit<'_, Exam>,
    ) -> Result<u64, RecordsError> {
        let ids: Vec<(String,)> = sqlx::query_as("SELECT exam_id FROM exams WHERE class_id = $1")
            .bind(class_id)
            .fetch_all(&self.pool)
            .await?;

        let mut changed = 0;
        let mut failed = Vec::new();
        for (exam_id,) in ids {
            match self.sweep_exam(&exam_id, edit).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Skipping exam {} in class {}: {}", exam_id, class_id, e);
                    failed.push(format!("{}: {}", exam_id, e));
                }
            }
        }
        sweep_outcome("exams", changed, failed)
    }

    async fn delete_exam(&self, exam_id: &str) -> Result<bool, RecordsError> {
        let result = sqlx::query("DELETE FROM exams WHERE exam_id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Option<MarkRecord>, RecordsError> {
        let row: Option<(Json<MarkRecord>,)> = sqlx::query_as(
            "SELECT doc FROM mark_records WHERE student_id = $1 AND class_id = $2",
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(Json(record),)| record))
    }

    async fn list_mark_records(&self, class_id: &str) -> Result<Vec<MarkRecord>, RecordsError> {
        let rows: Vec<(Json<MarkRecord>,)> = sqlx::query_as(
            "SELECT doc FROM mark_records WHERE class_id = $1 ORDER BY student_id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(record),)| record).collect())
    }

    async fn insert_mark_record(&self, record: &MarkRecord) -> Result<bool, RecordsError> {
        let result = sqlx::query(
            r#"
            INSERT INTO mark_records (student_id, class_id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, class_id) DO NOTHING
            "#,
        )
        .bind(&record.student_id)
        .bind(&record.class_id)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_mark_record(
        &self,
        student_id: &str,
        class_id: &str,
        edit: DocEdit<'_, MarkRecord>,
    ) -> Result<Option<MarkRecord>, RecordsError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Json<MarkRecord>,)> = sqlx::query_as(
            "SELECT doc FROM mark_records WHERE student_id = $1 AND class_id = $2 FOR UPDATE",
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((Json(mut record),)) = row else {
            return Ok(None);
        };

        if edit(&mut record)? {
            sqlx::query(
                r#"
                UPDATE mark_records SET doc = $3, updated_at = NOW()
                WHERE student_id = $1 AND class_id = $2
                "#,
            )
            .bind(student_id)
            .bind(class_id)
            .bind(Json(&record))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(Some(record))
    }

    async fn update_mark_records_in_class(
        &self,
        class_id: &str,
        edit: BulkEdit<'_, MarkRecord>,
    ) -> Result<u64, RecordsError> {
        let ids: Vec<(String,)> = sqlx::query_as(
            "SELECT student_id FROM mark_records WHERE class_id = $1 ORDER BY student_id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        let mut changed = 0;
        let mut failed = Vec::new();
        for (student_id,) in ids {
            match self.sweep_mark_record(&student_id, class_id, edit).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        "Skipping mark record of {} in class {}: {}",
                        student_id,
                        class_id,
                        e
                    );
                    failed.push(format!("{}: {}", student_id, e));
                }
            }
        }
        sweep_outcome("mark records", changed, failed)
    }
}

/// Directory backed by the `classes` / `class_students` tables.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ClassRow {
    class_id: String,
    school_id: String,
    class_admin_id: String,
}

#[async_trait]
impl ClassDirectory for PgDirectory {
    async fn class_info(&self, class_id: &str) -> Result<Option<ClassInfo>, RecordsError> {
        let row: Option<ClassRow> = sqlx::query_as(
            "SELECT class_id, school_id, class_admin_id FROM classes WHERE class_id = $1",
        )
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ClassInfo {
            class_id: r.class_id,
            school_id: r.school_id,
            class_admin_id: r.class_admin_id,
        }))
    }

    async fn active_students(&self, class_id: &str) -> Result<Vec<String>, RecordsError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT student_id FROM class_students
            WHERE class_id = $1 AND is_active = TRUE
            ORDER BY student_id
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn is_active_student(
        &self,
        class_id: &str,
        student_id: &str,
    ) -> Result<bool, RecordsError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT is_active FROM class_students WHERE class_id = $1 AND student_id = $2",
        )
        .bind(class_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(matches!(row, Some((true,))))
    }
}
