//! Reconciles a block of spreadsheet rows with the projects collection.
//!
//! Rows already present (matched on their `row` number) are merge-updated;
//! every other row in the range is inserted. All writes go out as one batch.

use crate::dtos::SheetUpdate;
use crate::models::{ProjectRow, RowFields, ROW_FIELD};
use crate::services::store::{ProjectStore, WriteBatch};
use serde_json::Value;
use service_core::error::AppError;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub inserted: usize,
    pub merged: usize,
}

/// Pairs column names with one row of values. Pairing is positional and stops
/// at the shorter side; a repeated column name keeps its last value.
pub fn row_fields(column_names: &[String], values: &[Value]) -> RowFields {
    column_names
        .iter()
        .zip(values)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// The values row belonging to sheet row `row`, i.e. `values[row - start]`.
fn values_for(update: &SheetUpdate, row: i64) -> Option<&[Value]> {
    let index = usize::try_from(row.checked_sub(update.rows.start)?).ok()?;
    update.values.get(index).map(Vec::as_slice)
}

/// Builds the write batch for `update` given the documents already stored for its range.
pub fn plan_batch(update: &SheetUpdate, existing: &[ProjectRow]) -> WriteBatch {
    let mut batch = WriteBatch::new();
    let mut found = HashSet::new();

    for document in existing {
        let Some(row) = document.row() else { continue };
        let Some(values) = values_for(update, row) else { continue };
        found.insert(row);
        batch.merge_update(document.id.clone(), row_fields(&update.column_names, values));
    }

    for row in update.rows.row_numbers() {
        if found.contains(&row) {
            continue;
        }
        let Some(values) = values_for(update, row) else { continue };
        let mut fields = row_fields(&update.column_names, values);
        fields.insert(ROW_FIELD.to_string(), Value::from(row));
        batch.insert(fields);
    }

    batch
}

/// Rejects requests the store should never see.
fn check_limits(update: &SheetUpdate, max_batch_rows: usize) -> Result<(), AppError> {
    let row_count = update.rows.len();

    if row_count > max_batch_rows as u64 {
        return Err(AppError::bad_request(format!(
            "row range {}..={} covers {} rows, limit is {}",
            update.rows.start, update.rows.end, row_count, max_batch_rows
        )));
    }

    if (update.values.len() as u64) < row_count {
        return Err(AppError::bad_request(format!(
            "values has {} rows but range {}..={} covers {}",
            update.values.len(),
            update.rows.start,
            update.rows.end,
            row_count
        )));
    }

    Ok(())
}

/// Applies a bulk upsert. An empty range (`end < start`) succeeds without touching the store.
pub async fn sync_sheet(
    store: &dyn ProjectStore,
    update: SheetUpdate,
    max_batch_rows: usize,
) -> Result<SyncOutcome, AppError> {
    if update.rows.is_empty() {
        tracing::info!(
            start = update.rows.start,
            end = update.rows.end,
            "Empty row range, nothing to sync"
        );
        return Ok(SyncOutcome::default());
    }

    check_limits(&update, max_batch_rows)?;

    let row_numbers = update.rows.row_numbers();
    let existing = match store.find_by_row_numbers(&row_numbers).await {
        Ok(existing) => existing,
        Err(e) => {
            metrics::counter!("sheet_sync_failures_total").increment(1);
            return Err(e);
        }
    };

    let batch = plan_batch(&update, &existing);
    let outcome = SyncOutcome {
        inserted: batch.insert_count(),
        merged: batch.merge_count(),
    };

    tracing::info!(
        start = update.rows.start,
        end = update.rows.end,
        existing = existing.len(),
        inserted = outcome.inserted,
        merged = outcome.merged,
        "Committing sheet batch"
    );

    if let Err(e) = store.commit_batch(batch).await {
        metrics::counter!("sheet_sync_failures_total").increment(1);
        return Err(e);
    }

    metrics::counter!("sheet_rows_inserted_total").increment(outcome.inserted as u64);
    metrics::counter!("sheet_rows_merged_total").increment(outcome.merged as u64);

    Ok(outcome)
}
