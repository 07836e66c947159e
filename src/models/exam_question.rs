// src/models/exam_question.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'default_question_infos' table. One-to-one with an
/// exam question, shared metadata for all of its sub-questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DefaultQuestionInfoRow {
    pub id: i64,
    pub exam: String,
    pub exam_year: i64,
    pub exam_month: i64,
    pub grade: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_file_bytes: Option<Vec<u8>>,
}

/// Represents the 'answer_option_infos' table. Many-to-one with an
/// exam question, deleted with its parent.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOptionInfoRow {
    pub id: i64,
    pub exam_question_id: i64,
    pub question_number: i64,
    pub question_score: i64,
    pub question_text: String,
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
    pub option5: String,
    /// Selected answer index (1-5).
    pub answer: i64,
    pub memo: String,
}

impl AnswerOptionInfoRow {
    pub fn options(&self) -> [&str; 5] {
        [
            &self.option1,
            &self.option2,
            &self.option3,
            &self.option4,
            &self.option5,
        ]
    }
}

/// An exam question with its owned children, loaded as one unit.
#[derive(Debug, Clone, Serialize)]
pub struct ExamQuestionAggregate {
    pub id: i64,
    pub subject: String,
    pub question_type: String,
    /// Ordered mapping from opaque key to passage fragment text.
    pub content_map: Map<String, Value>,
    pub question_numbers: String,
    pub info: DefaultQuestionInfoRow,
    pub answer_options: Vec<AnswerOptionInfoRow>,
}

/// DTO for the default-info block of an ingest payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultQuestionInfoCreate {
    #[serde(default)]
    pub exam: String,
    #[serde(rename = "examYear", default)]
    pub exam_year: i64,
    #[serde(rename = "examMonth", default)]
    pub exam_month: i64,
    #[serde(default)]
    pub grade: String,
    #[serde(rename = "filePath", default)]
    pub file_path: String,
    /// Raw file bytes attached by the multipart ingest route.
    #[serde(skip)]
    pub selected_file_bytes: Option<Vec<u8>>,
}

/// DTO for one answer option of an ingest payload.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AnswerOptionInfoCreate {
    #[serde(rename = "questionNumber")]
    #[validate(range(min = 1, message = "questionNumber must be positive"))]
    pub question_number: i64,
    #[serde(rename = "questionScore")]
    pub question_score: i64,
    #[serde(rename = "questionText")]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[serde(rename = "selectedAnswer")]
    #[validate(range(min = 1, max = 5, message = "selectedAnswer must be 1-5"))]
    pub selected_answer: i64,
    #[serde(default)]
    pub memo: String,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != 5 {
        return Err(validator::ValidationError::new("exactly_5_options_required"));
    }
    Ok(())
}

/// DTO for creating a full exam-question aggregate.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ExamQuestionCreate {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub subject: String,
    #[serde(rename = "defaultQuestionInfo")]
    pub default_question_info: DefaultQuestionInfoCreate,
    #[serde(rename = "questionContentTextMap", default)]
    pub question_content_text_map: Map<String, Value>,
    #[serde(rename = "answerOptionInfoList", default)]
    #[validate(nested)]
    pub answer_option_info_list: Vec<AnswerOptionInfoCreate>,
    #[serde(rename = "type", default)]
    pub question_type: String,
}

impl ExamQuestionCreate {
    /// Comma-joined ordinal list used as the dedup key component.
    pub fn question_numbers(&self) -> String {
        self.answer_option_info_list
            .iter()
            .map(|o| o.question_number.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The full dedup tuple, joined for the partial unique index.
    pub fn dedup_key(&self) -> String {
        let info = &self.default_question_info;
        format!(
            "{}|{}|{}|{}|{}|{}",
            info.exam,
            info.exam_year,
            info.exam_month,
            info.grade,
            self.subject,
            self.question_numbers()
        )
    }
}

/// Top-level ingest request shape.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct QuestionRequest {
    #[serde(rename = "questionId")]
    pub question_id: i64,
    pub subject: String,
    #[serde(rename = "questionType")]
    pub question_type: String,
    #[serde(rename = "questionModel")]
    #[validate(nested)]
    pub question_model: ExamQuestionCreate,
}

/// Filter shape for the export endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportRequest {
    pub subject: String,
    pub exam: String,
    /// Question categories to include.
    #[serde(default)]
    pub selections: Vec<String>,
    #[serde(default)]
    pub years: Vec<i64>,
    #[serde(default)]
    pub months: Vec<i64>,
    #[serde(default)]
    pub grades: Vec<String>,
}
