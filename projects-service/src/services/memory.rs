use crate::models::{ProjectRow, RowFields};
use crate::services::store::{ProjectStore, WriteBatch, WriteOp};
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::RwLock;
use uuid::Uuid;

/// Process-local store backing the `memory` backend and the test suites.
///
/// Rows keep insertion order, which is the "native order" `list_rows` reports.
#[derive(Default)]
pub struct InMemoryProjectStore {
    rows: RwLock<Vec<ProjectRow>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with documents as they would exist before any request.
    pub fn with_rows(rows: impl IntoIterator<Item = ProjectRow>) -> Self {
        Self {
            rows: RwLock::new(rows.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> AppError {
        AppError::InternalError(anyhow::anyhow!("in-memory project store lock poisoned"))
    }
}

fn merge_into(target: &mut RowFields, fields: RowFields) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn list_rows(&self) -> Result<Vec<ProjectRow>, AppError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.clone())
    }

    async fn find_by_row_numbers(&self, rows: &[i64]) -> Result<Vec<ProjectRow>, AppError> {
        let stored = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(stored
            .iter()
            .filter(|row| row.row().is_some_and(|n| rows.contains(&n)))
            .cloned()
            .collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), AppError> {
        // Single write guard for the whole batch: readers see all of it or none of it.
        let mut stored = self.rows.write().map_err(|_| Self::poisoned())?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Merge { id, fields } => {
                    match stored.iter_mut().find(|row| row.id == id) {
                        Some(existing) => merge_into(&mut existing.fields, fields),
                        None => stored.push(ProjectRow::new(id, fields)),
                    }
                }
                WriteOp::Insert { fields } => {
                    stored.push(ProjectRow::new(Uuid::new_v4().to_string(), fields));
                }
            }
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.rows.read().map(|_| ()).map_err(|_| Self::poisoned())
    }
}
