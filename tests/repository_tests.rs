// tests/repository_tests.rs

use exam_bank::error::AppError;
use exam_bank::models::exam_question::{
    AnswerOptionInfoCreate, DefaultQuestionInfoCreate, ExamQuestionCreate, ExportRequest,
};
use exam_bank::repository::{self, SaveOutcome};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

fn answer_option(number: i64) -> AnswerOptionInfoCreate {
    AnswerOptionInfoCreate {
        question_number: number,
        question_score: 2,
        question_text: format!("Question text {}", number),
        options: vec![
            "one".to_string(),
            "two".to_string(),
            "three".to_string(),
            "four".to_string(),
            "five".to_string(),
        ],
        selected_answer: 3,
        memo: String::new(),
    }
}

fn make_create(exam: &str, exam_month: i64, grade: &str, numbers: &[i64]) -> ExamQuestionCreate {
    ExamQuestionCreate {
        subject: "영어".to_string(),
        default_question_info: DefaultQuestionInfoCreate {
            exam: exam.to_string(),
            exam_year: 2024,
            exam_month,
            grade: grade.to_string(),
            file_path: String::new(),
            selected_file_bytes: None,
        },
        question_content_text_map: serde_json::Map::new(),
        answer_option_info_list: numbers.iter().map(|n| answer_option(*n)).collect(),
        question_type: "빈칸 추론".to_string(),
    }
}

fn export_filter(exam: &str, months: Vec<i64>, grades: Vec<String>) -> ExportRequest {
    ExportRequest {
        subject: "영어".to_string(),
        exam: exam.to_string(),
        selections: vec!["빈칸 추론".to_string()],
        years: vec![2024],
        months,
        grades,
    }
}

#[tokio::test]
async fn save_is_idempotent_with_conflict() {
    let pool = setup_pool().await;
    let data = make_create("모의고사", 6, "고3", &[21]);

    let first = repository::save_exam_question(&pool, &data, false).await.unwrap();
    assert_eq!(first, SaveOutcome::Created);

    let second = repository::save_exam_question(&pool, &data, false).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exam_questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn replace_keeps_one_valid_row_and_history() {
    let pool = setup_pool().await;
    let data = make_create("모의고사", 6, "고3", &[21]);

    repository::save_exam_question(&pool, &data, false).await.unwrap();
    let outcome = repository::save_exam_question(&pool, &data, true).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Replaced);

    let valid: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_questions WHERE dedup_key = ? AND valid = 1",
    )
    .bind(data.dedup_key())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(valid, 1);

    let invalid: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_questions WHERE dedup_key = ? AND valid = 0",
    )
    .bind(data.dedup_key())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(invalid, 1);
}

#[tokio::test]
async fn find_duplicate_matches_all_fields() {
    let pool = setup_pool().await;
    let data = make_create("모의고사", 6, "고3", &[21, 22]);
    repository::save_exam_question(&pool, &data, false).await.unwrap();

    let hit = repository::find_duplicate(&pool, "모의고사", 2024, 6, "21,22", "영어", "고3")
        .await
        .unwrap();
    assert!(hit.is_some());

    let miss = repository::find_duplicate(&pool, "모의고사", 2024, 9, "21,22", "영어", "고3")
        .await
        .unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn delete_missing_question_is_not_found() {
    let pool = setup_pool().await;
    let err = repository::delete_exam_question(&pool, 12345).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_cascades_and_cleans_up_orphaned_info() {
    let pool = setup_pool().await;
    let data = make_create("모의고사", 6, "고3", &[21]);
    repository::save_exam_question(&pool, &data, false).await.unwrap();

    let id: i64 = sqlx::query_scalar("SELECT id FROM exam_questions")
        .fetch_one(&pool)
        .await
        .unwrap();

    repository::delete_exam_question(&pool, id).await.unwrap();

    let options: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answer_option_infos")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(options, 0);

    let infos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM default_question_infos")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(infos, 0);
}

#[tokio::test]
async fn shared_info_survives_deleting_one_referrer() {
    let pool = setup_pool().await;

    // Two questions sharing one DefaultQuestionInfo, seeded directly.
    let info_id = sqlx::query(
        "INSERT INTO default_question_infos (exam, exam_year, exam_month, grade, file_path) \
         VALUES ('모의고사', 2024, 6, '고3', '')",
    )
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    let mut question_ids = Vec::new();
    for numbers in ["21", "22"] {
        let id = sqlx::query(
            "INSERT INTO exam_questions \
             (subject, type, valid, question_content_text_map, question_numbers, dedup_key, default_question_info_id) \
             VALUES ('영어', '빈칸 추론', 1, '{}', ?, ?, ?)",
        )
        .bind(numbers)
        .bind(format!("모의고사|2024|6|고3|영어|{}", numbers))
        .bind(info_id)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();
        question_ids.push(id);
    }

    repository::delete_exam_question(&pool, question_ids[0]).await.unwrap();

    let infos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM default_question_infos")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(infos, 1, "shared info must survive while referenced");

    repository::delete_exam_question(&pool, question_ids[1]).await.unwrap();

    let infos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM default_question_infos")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(infos, 0, "last delete removes the orphaned info");
}

#[tokio::test]
async fn suneung_ignores_month_and_grade_filters() {
    let pool = setup_pool().await;
    let data = make_create("수능", 11, "고3", &[21]);
    repository::save_exam_question(&pool, &data, false).await.unwrap();

    // Month/grade values that match nothing; 수능 must ignore them.
    let filter = export_filter("수능", vec![6], vec!["고1".to_string()]);
    let results = repository::query_exam_questions(&pool, &filter).await.unwrap();
    assert_eq!(results.len(), 1);

    let filter = export_filter("수능", vec![11], vec!["고3".to_string()]);
    let also = repository::query_exam_questions(&pool, &filter).await.unwrap();
    assert_eq!(also.len(), 1, "result set is independent of month/grade");
}

#[tokio::test]
async fn other_exams_apply_month_and_grade_filters() {
    let pool = setup_pool().await;
    let data = make_create("모의고사", 6, "고3", &[21]);
    repository::save_exam_question(&pool, &data, false).await.unwrap();

    let matching = export_filter("모의고사", vec![6], vec!["고3".to_string()]);
    assert_eq!(
        repository::query_exam_questions(&pool, &matching).await.unwrap().len(),
        1
    );

    let wrong_month = export_filter("모의고사", vec![9], vec!["고3".to_string()]);
    assert_eq!(
        repository::query_exam_questions(&pool, &wrong_month).await.unwrap().len(),
        0
    );

    let wrong_grade = export_filter("모의고사", vec![6], vec!["고1".to_string()]);
    assert_eq!(
        repository::query_exam_questions(&pool, &wrong_grade).await.unwrap().len(),
        0
    );
}

#[tokio::test]
async fn invalid_rows_are_excluded_from_queries() {
    let pool = setup_pool().await;
    let data = make_create("모의고사", 6, "고3", &[21]);
    repository::save_exam_question(&pool, &data, false).await.unwrap();
    repository::save_exam_question(&pool, &data, true).await.unwrap();

    let filter = export_filter("모의고사", vec![6], vec!["고3".to_string()]);
    let results = repository::query_exam_questions(&pool, &filter).await.unwrap();
    assert_eq!(results.len(), 1, "superseded rows must not be exported");
    assert_eq!(results[0].answer_options.len(), 1);
}
