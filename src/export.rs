// src/export.rs

use std::path::PathBuf;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    classify::derive_passage_text,
    error::AppError,
    models::exam_question::{ExamQuestionAggregate, ExportRequest},
    render::{SubquestionInput, TableFlowManager, docx::pack_document, media::probe_image},
    repository::query_exam_questions,
};

/// A finished export: the unique file name and the packed DOCX bytes.
#[derive(Debug)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Filters questions, drives one call-scoped layout manager over the
/// results, and appends the answer key.
///
/// Read-only against question data. Any render failure (malformed
/// markup, math conversion, image decode) aborts the whole export; no
/// partial document is produced.
pub async fn export_questions(
    pool: &SqlitePool,
    request: &ExportRequest,
) -> Result<ExportedDocument, AppError> {
    let questions = query_exam_questions(pool, request).await?;

    tracing::info!(
        "Exporting {} questions for subject '{}', exam '{}'",
        questions.len(),
        request.subject,
        request.exam
    );

    let flow = layout_questions(&questions)?;

    let bytes = pack_document(&flow)?;
    let file_name = format!("questions_{}.docx", Uuid::new_v4());

    Ok(ExportedDocument { file_name, bytes })
}

/// Lays out the given questions in result order with one fresh manager:
/// passage, sub-questions, optional image per question, then the answer
/// key accumulated in emission order.
pub fn layout_questions(
    questions: &[ExamQuestionAggregate],
) -> Result<TableFlowManager, AppError> {
    let mut flow = TableFlowManager::new();
    let mut answer_key: Vec<(u32, i64)> = Vec::new();
    let mut ordinal = 0u32;

    for question in questions {
        let passage_text = derive_passage_text(question);

        let subquestions: Vec<SubquestionInput> = question
            .answer_options
            .iter()
            .map(|option| SubquestionInput {
                text_markup: option.question_text.clone(),
                option_markups: option.options().iter().map(|s| s.to_string()).collect(),
            })
            .collect();

        let probed = match &question.info.selected_file_bytes {
            Some(bytes) if !bytes.is_empty() => Some(probe_image(bytes)?),
            _ => None,
        };

        flow.add_question(&passage_text, &subquestions, probed.as_ref())?;

        for option in &question.answer_options {
            ordinal += 1;
            answer_key.push((ordinal, option.answer));
        }
    }

    flow.add_answers(&answer_key);
    Ok(flow)
}

/// Writes an exported document under the export directory.
pub fn write_export_file(
    export_dir: &str,
    document: &ExportedDocument,
) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(export_dir)
        .map_err(|e| AppError::InternalServerError(format!("Cannot create export dir: {}", e)))?;

    let path = PathBuf::from(export_dir).join(&document.file_name);
    std::fs::write(&path, &document.bytes)
        .map_err(|e| AppError::InternalServerError(format!("Cannot write export file: {}", e)))?;

    Ok(path)
}
