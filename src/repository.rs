// src/repository.rs

use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, prelude::FromRow};

use crate::{
    error::AppError,
    models::exam_question::{
        AnswerOptionInfoRow, DefaultQuestionInfoRow, ExamQuestionAggregate, ExamQuestionCreate,
        ExportRequest,
    },
};

/// Outcome of a successful save. A duplicate with `replace = false` is
/// reported as `AppError::Conflict` instead.
#[derive(Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    /// A prior valid row was marked invalid before the insert.
    Replaced,
    /// The duplicate vanished between detection and update; the insert
    /// proceeded anyway (race-tolerant, non-fatal).
    ReplacedMissing,
}

/// Exact-match duplicate lookup on the full dedup tuple plus validity.
pub async fn find_duplicate(
    pool: &SqlitePool,
    exam: &str,
    exam_year: i64,
    exam_month: i64,
    question_numbers: &str,
    subject: &str,
    grade: &str,
) -> Result<Option<i64>, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT q.id
        FROM exam_questions q
        JOIN default_question_infos d ON q.default_question_info_id = d.id
        WHERE q.subject = ?
          AND q.valid = 1
          AND q.question_numbers = ?
          AND d.exam = ?
          AND d.exam_year = ?
          AND d.exam_month = ?
          AND d.grade = ?
        "#,
    )
    .bind(subject)
    .bind(question_numbers)
    .bind(exam)
    .bind(exam_year)
    .bind(exam_month)
    .bind(grade)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Persists a full aggregate (question + default info + answer options)
/// in one transaction.
///
/// * Duplicate present, `replace = false`: `Conflict`, nothing mutated.
/// * Duplicate present, `replace = true`: old row flipped to invalid,
///   then the new aggregate is inserted.
/// * The partial unique index on `dedup_key WHERE valid = 1` closes the
///   check-then-insert race; a violation surfaces as `Conflict`.
pub async fn save_exam_question(
    pool: &SqlitePool,
    data: &ExamQuestionCreate,
    replace: bool,
) -> Result<SaveOutcome, AppError> {
    let question_numbers = data.question_numbers();
    let dedup_key = data.dedup_key();
    let info = &data.default_question_info;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT q.id
        FROM exam_questions q
        JOIN default_question_infos d ON q.default_question_info_id = d.id
        WHERE q.subject = ?
          AND q.valid = 1
          AND q.question_numbers = ?
          AND d.exam = ?
          AND d.exam_year = ?
          AND d.exam_month = ?
          AND d.grade = ?
        "#,
    )
    .bind(&data.subject)
    .bind(&question_numbers)
    .bind(&info.exam)
    .bind(info.exam_year)
    .bind(info.exam_month)
    .bind(&info.grade)
    .fetch_optional(&mut *tx)
    .await?;

    let mut outcome = SaveOutcome::Created;

    if let Some(existing_id) = existing {
        if !replace {
            return Err(AppError::Conflict(format!(
                "Question with numbers '{}' already exists for this exam",
                question_numbers
            )));
        }

        let updated = sqlx::query("UPDATE exam_questions SET valid = 0 WHERE id = ? AND valid = 1")
            .bind(existing_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tracing::warn!(
                "Duplicate question {} vanished before invalidation, inserting anyway",
                existing_id
            );
            outcome = SaveOutcome::ReplacedMissing;
        } else {
            outcome = SaveOutcome::Replaced;
        }
    }

    let info_id = sqlx::query(
        r#"
        INSERT INTO default_question_infos
            (exam, exam_year, exam_month, grade, file_path, selected_file_bytes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&info.exam)
    .bind(info.exam_year)
    .bind(info.exam_month)
    .bind(&info.grade)
    .bind(&info.file_path)
    .bind(&info.selected_file_bytes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let content_json = serde_json::to_string(&data.question_content_text_map)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let question_id = sqlx::query(
        r#"
        INSERT INTO exam_questions
            (subject, type, valid, question_content_text_map, question_numbers,
             dedup_key, default_question_info_id)
        VALUES (?, ?, 1, ?, ?, ?, ?)
        "#,
    )
    .bind(&data.subject)
    .bind(&data.question_type)
    .bind(&content_json)
    .bind(&question_numbers)
    .bind(&dedup_key)
    .bind(info_id)
    .execute(&mut *tx)
    .await
    .map_err(map_unique_violation)?
    .last_insert_rowid();

    for option in &data.answer_option_info_list {
        sqlx::query(
            r#"
            INSERT INTO answer_option_infos
                (exam_question_id, question_number, question_score, question_text,
                 option1, option2, option3, option4, option5, answer, memo)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(question_id)
        .bind(option.question_number)
        .bind(option.question_score)
        .bind(&option.question_text)
        .bind(option.options.first().map(String::as_str).unwrap_or(""))
        .bind(option.options.get(1).map(String::as_str).unwrap_or(""))
        .bind(option.options.get(2).map(String::as_str).unwrap_or(""))
        .bind(option.options.get(3).map(String::as_str).unwrap_or(""))
        .bind(option.options.get(4).map(String::as_str).unwrap_or(""))
        .bind(option.selected_answer)
        .bind(&option.memo)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.map_err(map_unique_violation)?;

    Ok(outcome)
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
            AppError::Conflict("Duplicate question submitted concurrently".to_string())
        }
        _ => AppError::InternalServerError(err.to_string()),
    }
}

/// Deletes an aggregate: answer options, the question row, and the
/// owned DefaultQuestionInfo when no other question references it.
pub async fn delete_exam_question(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let info_id = sqlx::query_scalar::<_, i64>(
        "SELECT default_question_info_id FROM exam_questions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Exam question {} not found", id)))?;

    sqlx::query("DELETE FROM answer_option_infos WHERE exam_question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM exam_questions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let remaining = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM exam_questions WHERE default_question_info_id = ?",
    )
    .bind(info_id)
    .fetch_one(&mut *tx)
    .await?;

    if remaining == 0 {
        sqlx::query("DELETE FROM default_question_infos WHERE id = ?")
            .bind(info_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Deleted exam question {}", id);
    Ok(())
}

/// Flat row shape for the filtered export query.
#[derive(Debug, FromRow)]
struct QuestionWithInfoRow {
    id: i64,
    subject: String,
    question_type: String,
    question_numbers: String,
    question_content_text_map: String,
    info_id: i64,
    exam: String,
    exam_year: i64,
    exam_month: i64,
    grade: String,
    file_path: String,
    selected_file_bytes: Option<Vec<u8>>,
}

/// Runs the export filter and loads the matching aggregates in id order.
///
/// The national exam "수능" has no month/grade axis, so those predicates
/// are skipped entirely for it. Empty selection/year/month/grade lists
/// place no restriction on their axis.
pub async fn query_exam_questions(
    pool: &SqlitePool,
    filter: &ExportRequest,
) -> Result<Vec<ExamQuestionAggregate>, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT
            q.id, q.subject, q.type AS question_type, q.question_numbers,
            q.question_content_text_map,
            d.id AS info_id, d.exam, d.exam_year, d.exam_month, d.grade,
            d.file_path, d.selected_file_bytes
        FROM exam_questions q
        JOIN default_question_infos d ON q.default_question_info_id = d.id
        WHERE q.valid = 1 AND q.subject = "#,
    );
    qb.push_bind(&filter.subject);
    qb.push(" AND d.exam = ");
    qb.push_bind(&filter.exam);

    if !filter.selections.is_empty() {
        qb.push(" AND q.type IN (");
        let mut separated = qb.separated(",");
        for selection in &filter.selections {
            separated.push_bind(selection);
        }
        separated.push_unseparated(")");
    }

    if !filter.years.is_empty() {
        qb.push(" AND d.exam_year IN (");
        let mut separated = qb.separated(",");
        for year in &filter.years {
            separated.push_bind(year);
        }
        separated.push_unseparated(")");
    }

    // 수능 has no month/grade axis; applying those filters would be wrong.
    if filter.exam != "수능" {
        if !filter.months.is_empty() {
            qb.push(" AND d.exam_month IN (");
            let mut separated = qb.separated(",");
            for month in &filter.months {
                separated.push_bind(month);
            }
            separated.push_unseparated(")");
        }
        if !filter.grades.is_empty() {
            qb.push(" AND d.grade IN (");
            let mut separated = qb.separated(",");
            for grade in &filter.grades {
                separated.push_bind(grade);
            }
            separated.push_unseparated(")");
        }
    }

    qb.push(" ORDER BY q.id");

    let rows: Vec<QuestionWithInfoRow> = qb.build_query_as().fetch_all(pool).await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut options_qb = QueryBuilder::<Sqlite>::new(
        "SELECT * FROM answer_option_infos WHERE exam_question_id IN (",
    );
    let mut separated = options_qb.separated(",");
    for row in &rows {
        separated.push_bind(row.id);
    }
    separated.push_unseparated(") ORDER BY exam_question_id, id");

    let option_rows: Vec<AnswerOptionInfoRow> =
        options_qb.build_query_as().fetch_all(pool).await?;

    let mut options_by_question: HashMap<i64, Vec<AnswerOptionInfoRow>> = HashMap::new();
    for option in option_rows {
        options_by_question
            .entry(option.exam_question_id)
            .or_default()
            .push(option);
    }

    let mut aggregates = Vec::with_capacity(rows.len());
    for row in rows {
        let content_map: Map<String, Value> =
            serde_json::from_str(&row.question_content_text_map)
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        aggregates.push(ExamQuestionAggregate {
            id: row.id,
            subject: row.subject,
            question_type: row.question_type,
            content_map,
            question_numbers: row.question_numbers,
            info: DefaultQuestionInfoRow {
                id: row.info_id,
                exam: row.exam,
                exam_year: row.exam_year,
                exam_month: row.exam_month,
                grade: row.grade,
                file_path: row.file_path,
                selected_file_bytes: row.selected_file_bytes,
            },
            answer_options: options_by_question.remove(&row.id).unwrap_or_default(),
        });
    }

    Ok(aggregates)
}
