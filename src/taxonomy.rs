// src/taxonomy.rs

use std::collections::VecDeque;

use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::{error::AppError, models::subject_detail::SubjectDetailRow};

/// Recursively applies a nested mapping onto the per-subject taxonomy tree.
///
/// Each key becomes (or matches) a child node under the current parent,
/// keyed by `(subject, name, parent_id)`. Scalar values are stored on leaf
/// nodes; array values are normalized to an empty object (lists are not
/// supported as leaf containers). Re-applying the same mapping is
/// idempotent; only changed leaf values are updated.
pub async fn upsert_path(
    pool: &SqlitePool,
    subject: &str,
    mapping: &Map<String, Value>,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    // Breadth-first walk keeps sibling order stable.
    let mut queue: VecDeque<(Option<i64>, String, Map<String, Value>)> = VecDeque::new();
    queue.push_back((None, String::new(), mapping.clone()));

    while let Some((parent_id, parent_path, map)) = queue.pop_front() {
        for (name, raw_value) in &map {
            // Lists are not supported as leaf containers.
            let value = if raw_value.is_array() {
                Value::Object(Map::new())
            } else {
                raw_value.clone()
            };

            let path = if parent_path.is_empty() {
                name.clone()
            } else {
                format!("{} > {}", parent_path, name)
            };

            let leaf_value = match &value {
                Value::Object(_) => None,
                other => Some(serde_json::to_string(other)
                    .map_err(|e| AppError::InternalServerError(e.to_string()))?),
            };

            let existing = sqlx::query_as::<_, SubjectDetailRow>(
                r#"
                SELECT id, subject, name, parent_id, path, value
                FROM subject_details
                WHERE subject = ? AND name = ? AND IFNULL(parent_id, 0) = ?
                "#,
            )
            .bind(subject)
            .bind(name)
            .bind(parent_id.unwrap_or(0))
            .fetch_optional(&mut *tx)
            .await?;

            let node_id = match existing {
                Some(node) => {
                    if node.value != leaf_value {
                        sqlx::query("UPDATE subject_details SET value = ? WHERE id = ?")
                            .bind(&leaf_value)
                            .bind(node.id)
                            .execute(&mut *tx)
                            .await?;
                    }
                    node.id
                }
                None => sqlx::query(
                    r#"
                    INSERT INTO subject_details (subject, name, parent_id, path, value)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(subject)
                .bind(name)
                .bind(parent_id)
                .bind(&path)
                .bind(&leaf_value)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid(),
            };

            if let Value::Object(children) = value {
                if !children.is_empty() {
                    queue.push_back((Some(node_id), path, children));
                }
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Loads all nodes for a subject and reconstructs the nested mapping by
/// walking each node's materialized path. Root nodes (null parent) become
/// top-level keys; leaf values are restored at the terminals.
pub async fn read_tree(pool: &SqlitePool, subject: &str) -> Result<Map<String, Value>, AppError> {
    let nodes = sqlx::query_as::<_, SubjectDetailRow>(
        r#"
        SELECT id, subject, name, parent_id, path, value
        FROM subject_details
        WHERE subject = ?
        ORDER BY id
        "#,
    )
    .bind(subject)
    .fetch_all(pool)
    .await?;

    let mut tree = Map::new();

    for node in &nodes {
        let segments: Vec<&str> = node.path.split(" > ").collect();
        let leaf = match &node.value {
            Some(raw) => Some(
                serde_json::from_str(raw)
                    .map_err(|e| AppError::InternalServerError(e.to_string()))?,
            ),
            None => None,
        };
        insert_at_path(&mut tree, &segments, leaf);
    }

    Ok(tree)
}

fn insert_at_path(tree: &mut Map<String, Value>, segments: &[&str], leaf: Option<Value>) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        // Paths always descend through non-leaf nodes.
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().expect("just ensured object");
    }

    match leaf {
        Some(value) => {
            current.insert(last.to_string(), value);
        }
        None => {
            current
                .entry(last.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
}
