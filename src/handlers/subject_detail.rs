// src/handlers/subject_detail.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::{error::AppError, taxonomy};

/// Applies a nested mapping onto the subject's taxonomy tree (idempotent).
pub async fn upsert_subject_tree(
    State(pool): State<SqlitePool>,
    Path(subject): Path<String>,
    Json(mapping): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    taxonomy::upsert_path(&pool, &subject, &mapping).await?;

    Ok(Json(serde_json::json!({ "subject": subject })))
}

/// Returns the reconstructed taxonomy tree for a subject.
pub async fn get_subject_tree(
    State(pool): State<SqlitePool>,
    Path(subject): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tree = taxonomy::read_tree(&pool, &subject).await?;

    Ok(Json(Value::Object(tree)))
}
