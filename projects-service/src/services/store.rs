use crate::models::{ProjectRow, RowFields};
use async_trait::async_trait;
use service_core::error::AppError;

/// A single write recorded in a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Overwrite the named fields of an existing document; other fields survive.
    Merge { id: String, fields: RowFields },
    /// Create a new document. `fields` already carries the `row` number.
    Insert { fields: RowFields },
}

/// An ordered set of writes applied all-or-nothing by [`ProjectStore::commit_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a merge-update. Merging an empty mapping changes nothing, so it is dropped.
    pub fn merge_update(&mut self, id: impl Into<String>, fields: RowFields) -> &mut Self {
        if !fields.is_empty() {
            self.ops.push(WriteOp::Merge {
                id: id.into(),
                fields,
            });
        }
        self
    }

    pub fn insert(&mut self, fields: RowFields) -> &mut Self {
        self.ops.push(WriteOp::Insert { fields });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn merge_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::Merge { .. }))
            .count()
    }

    pub fn insert_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::Insert { .. }))
            .count()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Storage seam for the projects collection.
///
/// Handlers and the sheet reconciliation only talk to this trait, so the same
/// logic runs against MongoDB in production and [`super::InMemoryProjectStore`]
/// in tests.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Every document, in the store's native order.
    async fn list_rows(&self) -> Result<Vec<ProjectRow>, AppError>;

    /// Documents whose `row` field is one of `rows`.
    async fn find_by_row_numbers(&self, rows: &[i64]) -> Result<Vec<ProjectRow>, AppError>;

    /// Applies every write in `batch`, or none of them.
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    /// Releases connections. Called once during shutdown.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> RowFields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_merges_are_skipped() {
        let mut batch = WriteBatch::new();
        batch
            .merge_update("a", RowFields::new())
            .merge_update("b", fields(json!({ "Status": "done" })))
            .insert(fields(json!({ "row": 3 })));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.merge_count(), 1);
        assert_eq!(batch.insert_count(), 1);
        assert_eq!(
            batch.ops()[0],
            WriteOp::Merge {
                id: "b".to_string(),
                fields: fields(json!({ "Status": "done" }))
            }
        );
    }
}
