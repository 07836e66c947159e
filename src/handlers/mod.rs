// src/handlers/mod.rs

pub mod export;
pub mod question_bank;
pub mod subject_detail;
