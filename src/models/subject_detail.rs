// src/models/subject_detail.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// A node of the per-subject taxonomy tree ('subject_details' table).
///
/// Arena-style: nodes reference their parent by id, the materialized
/// `path` is the " > " joined breadcrumb from the root. Non-leaf nodes
/// have a null `value`; leaf nodes store their payload as JSON text.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubjectDetailRow {
    pub id: i64,
    pub subject: String,
    pub name: String,
    pub parent_id: Option<i64>,
    pub path: String,
    pub value: Option<String>,
}
