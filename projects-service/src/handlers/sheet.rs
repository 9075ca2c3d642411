use crate::dtos::{MessageResponse, SheetToDbRequest, SheetUpdate};
use crate::services::{sync_sheet, SyncOutcome};
use crate::startup::AppState;
use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use service_core::error::AppError;

pub const SYNC_SUCCESS_MESSAGE: &str = "Data successfully updated";

/// `POST /sheetToDb`: bulk upsert of a block of spreadsheet rows.
pub async fn sheet_to_db(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SheetToDbRequest>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    match apply_sheet(&state, payload).await {
        Ok(outcome) => {
            tracing::info!(
                inserted = outcome.inserted,
                merged = outcome.merged,
                "Sheet rows synced"
            );
            Ok(Json(MessageResponse {
                message: SYNC_SUCCESS_MESSAGE.to_string(),
            }))
        }
        Err(e) if e.status().is_client_error() => {
            tracing::warn!("Invalid sheet payload: {}", e);
            Err(e)
        }
        Err(e) => {
            tracing::error!("Error updating projects from sheet: {}", e);
            Err(e)
        }
    }
}

async fn apply_sheet(state: &AppState, payload: SheetToDbRequest) -> Result<SyncOutcome, AppError> {
    let update = SheetUpdate::try_from(payload)?;
    sync_sheet(state.store.as_ref(), update, state.config.sheet.max_batch_rows).await
}
