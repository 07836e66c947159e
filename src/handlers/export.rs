// src/handlers/export.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};

use crate::{error::AppError, export, models::exam_question::ExportRequest, state::AppState};

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Exports the filtered question set as a paginated DOCX download.
/// A copy is written under the export directory for the cleanup job.
pub async fn export_questions(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let document = export::export_questions(&state.pool, &request).await?;

    export::write_export_file(&state.config.export_dir, &document)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        DOCX_MIME.parse().map_err(|_| {
            AppError::InternalServerError("Invalid content type header".to_string())
        })?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", document.file_name)
            .parse()
            .map_err(|_| {
                AppError::InternalServerError("Invalid content disposition header".to_string())
            })?,
    );

    Ok((headers, document.bytes))
}
