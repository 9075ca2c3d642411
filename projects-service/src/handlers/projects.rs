use crate::models::ProjectRow;
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

/// `GET /projects`: every row record, annotated with its id.
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectRow>>, AppError> {
    let rows = state.store.list_rows().await.map_err(|e| {
        tracing::error!("Error fetching projects: {}", e);
        e
    })?;

    tracing::info!(count = rows.len(), "Listed projects");

    Ok(Json(rows))
}
