use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;

/// Inclusive range of sheet rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RowRange {
    pub start: i64,
    pub end: i64,
}

impl RowRange {
    /// Explicit row numbers, `start..=end`. Empty when `end < start`.
    pub fn row_numbers(&self) -> Vec<i64> {
        (self.start..=self.end).collect()
    }

    /// Number of rows covered, without materializing them.
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end.abs_diff(self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Body of `POST /sheetToDb` as sent by the spreadsheet.
///
/// Every field is optional at the serde level so that a missing one produces a
/// 400 with the usual error body instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetToDbRequest {
    pub rows: Option<RowRange>,
    pub column_names: Option<Vec<String>>,
    pub values: Option<Vec<Vec<Value>>>,
}

/// A bulk upsert request with every required part present.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetUpdate {
    pub rows: RowRange,
    pub column_names: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

impl TryFrom<SheetToDbRequest> for SheetUpdate {
    type Error = AppError;

    fn try_from(request: SheetToDbRequest) -> Result<Self, Self::Error> {
        let SheetToDbRequest {
            rows,
            column_names,
            values,
        } = request;

        match (rows, column_names, values) {
            (Some(rows), Some(column_names), Some(values)) => Ok(SheetUpdate {
                rows,
                column_names,
                values,
            }),
            (rows, column_names, values) => {
                let missing: Vec<&str> = [
                    ("rows", rows.is_none()),
                    ("columnNames", column_names.is_none()),
                    ("values", values.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(AppError::bad_request(format!(
                    "missing required field(s): {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
