// src/classify.rs

use serde_json::Value;

use crate::models::exam_question::ExamQuestionAggregate;

const TYPES_NORMAL: &[&str] = &[
    "글의 목적",
    "글의 분위기 / 심경",
    "대의 파악",
    "함의 추론",
    "도표 이해",
    "내용 일치 / 불일치",
    "실용문 일치 / 불일치",
    "어법성 판단",
    "단어 쓰임 판단",
    "빈칸 추론",
    "무관한 문장",
    "주어진 문장 넣기",
];
const TYPES_ORDER: &[&str] = &["글의 순서"];
const TYPES_SUMMARY: &[&str] = &["요약문 완성"];
const TYPES_LONG_SINGLE: &[&str] = &["기본 장문 독해"];
const TYPES_LONG_ABC: &[&str] = &["복합 문단 독해"];

/// Assembles the passage text for a question from its ordered content map,
/// dispatching on the question category.
///
/// Ordering and compound categories interleave literal "(A)/(B)/(C)" labels
/// between fragments. Unknown categories yield an empty string so exports
/// degrade gracefully instead of failing. Missing fragments are treated as
/// empty. The result is trimmed and embedded newlines are removed.
pub fn derive_passage_text(question: &ExamQuestionAggregate) -> String {
    // Only English passages are assembled; other subjects carry their
    // content in the sub-question texts.
    if question.subject != "영어" {
        return String::new();
    }

    let fragment = |index: usize| -> &str {
        question
            .content_map
            .values()
            .nth(index)
            .and_then(Value::as_str)
            .unwrap_or("")
    };

    let question_type = question.question_type.as_str();

    let big_text = if TYPES_NORMAL.contains(&question_type)
        || TYPES_LONG_SINGLE.contains(&question_type)
    {
        fragment(0).to_string()
    } else if TYPES_ORDER.contains(&question_type) || TYPES_LONG_ABC.contains(&question_type) {
        format!(
            "{}\n\n(A) {}\n\n(B) {}\n\n(C) {}",
            fragment(0),
            fragment(1),
            fragment(2),
            fragment(3)
        )
    } else if TYPES_SUMMARY.contains(&question_type) {
        format!("{}\n\n{}", fragment(0), fragment(1))
    } else {
        String::new()
    };

    big_text.trim().replace('\n', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam_question::DefaultQuestionInfoRow;
    use serde_json::{Map, json};

    fn aggregate(subject: &str, question_type: &str, fragments: &[&str]) -> ExamQuestionAggregate {
        let mut content_map = Map::new();
        for (i, fragment) in fragments.iter().enumerate() {
            content_map.insert(format!("part{}", i), json!(fragment));
        }
        ExamQuestionAggregate {
            id: 1,
            subject: subject.to_string(),
            question_type: question_type.to_string(),
            content_map,
            question_numbers: "1".to_string(),
            info: DefaultQuestionInfoRow {
                id: 1,
                exam: "모의고사".to_string(),
                exam_year: 2024,
                exam_month: 6,
                grade: "고3".to_string(),
                file_path: String::new(),
                selected_file_bytes: None,
            },
            answer_options: Vec::new(),
        }
    }

    #[test]
    fn normal_type_uses_first_fragment() {
        let q = aggregate("영어", "빈칸 추론", &["The passage.", "ignored"]);
        assert_eq!(derive_passage_text(&q), "The passage.");
    }

    #[test]
    fn order_type_labels_fragments() {
        let q = aggregate("영어", "글의 순서", &["intro", "one", "two", "three"]);
        assert_eq!(
            derive_passage_text(&q),
            "intro(A) one(B) two(C) three"
        );
    }

    #[test]
    fn summary_type_joins_two_fragments() {
        let q = aggregate("영어", "요약문 완성", &["passage", "summary"]);
        assert_eq!(derive_passage_text(&q), "passagesummary");
    }

    #[test]
    fn unknown_type_is_empty() {
        let q = aggregate("영어", "없는 유형", &["anything"]);
        assert_eq!(derive_passage_text(&q), "");
    }

    #[test]
    fn non_english_subject_is_empty() {
        let q = aggregate("수학", "빈칸 추론", &["anything"]);
        assert_eq!(derive_passage_text(&q), "");
    }

    #[test]
    fn missing_fragments_are_empty() {
        let q = aggregate("영어", "글의 순서", &["only intro"]);
        assert_eq!(derive_passage_text(&q), "only intro(A) (B) (C)");
    }
}
