// src/handlers/question_bank.rs

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam_question::QuestionRequest,
    repository::{self, SaveOutcome},
};

#[derive(Debug, Deserialize)]
pub struct ReplaceQuery {
    #[serde(default)]
    pub replace: bool,
}

/// Ingests a full exam-question aggregate as JSON.
///
/// Returns 409 when an identical question already exists and `replace`
/// was not requested.
pub async fn add_question(
    State(pool): State<SqlitePool>,
    Query(params): Query<ReplaceQuery>,
    Json(payload): Json<QuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let outcome = repository::save_exam_question(&pool, &payload.question_model, params.replace)
        .await?;

    Ok((StatusCode::OK, Json(outcome_body(outcome))))
}

/// Ingests an aggregate plus an attached raw file (multipart): the `body`
/// field carries the JSON payload, the `file` field the raw bytes, which
/// are stored on the aggregate's default info before persistence.
pub async fn add_question_with_file(
    State(pool): State<SqlitePool>,
    Query(params): Query<ReplaceQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut payload: Option<QuestionRequest> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart request: {}", e)))?
    {
        match field.name() {
            Some("body") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                payload = Some(serde_json::from_str(&text)?);
            }
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file_bytes = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let mut payload = payload
        .ok_or_else(|| AppError::BadRequest("Missing 'body' multipart field".to_string()))?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    payload
        .question_model
        .default_question_info
        .selected_file_bytes = file_bytes;

    let outcome = repository::save_exam_question(&pool, &payload.question_model, params.replace)
        .await?;

    Ok((StatusCode::OK, Json(outcome_body(outcome))))
}

/// Deletes an aggregate, cascading to its answer options and cleaning up
/// the default info when it becomes unreferenced.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    repository::delete_exam_question(&pool, id).await?;

    Ok(Json(serde_json::json!({
        "message": format!("Exam question {} deleted", id)
    })))
}

fn outcome_body(outcome: SaveOutcome) -> serde_json::Value {
    match outcome {
        SaveOutcome::Created => serde_json::json!({ "outcome": "created" }),
        SaveOutcome::Replaced => serde_json::json!({ "outcome": "replaced" }),
        SaveOutcome::ReplacedMissing => serde_json::json!({
            "outcome": "created",
            "detail": "Existing question not found."
        }),
    }
}
