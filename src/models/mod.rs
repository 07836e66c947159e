// src/models/mod.rs

pub mod exam_question;
pub mod subject_detail;
