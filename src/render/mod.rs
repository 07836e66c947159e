// src/render/mod.rs

pub mod docx;
pub mod layout;
pub mod math;
pub mod media;
pub mod rich_text;

pub use layout::{SubquestionInput, TableFlowManager};
