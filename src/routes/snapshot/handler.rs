use axum::{extract::State, response::IntoResponse};

use crate::{AppState, error::AppError, utils::success_to_api_response, ws::SnapshotFeed};

/// GET /api/snapshot 读取一次当前快照
#[axum::debug_handler]
pub async fn current_snapshot(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let feed = SnapshotFeed::from_config(state.snapshots.clone(), &state.config);
    let snapshot = feed.snapshot().await?;
    Ok(success_to_api_response(snapshot))
}
