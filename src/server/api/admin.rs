use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::ReclaimedResponse;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::tags;

/// Sweeps tag rows with no remaining attachment. Admin-only; detaching
/// never deletes, so this is the only way rows leave the table.
pub async fn reclaim_unused_tags(
    _auth: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let deleted = tags::reclaim_unused_tags(state.store.as_ref())
        .api_err("Failed to reclaim unused tags")?;

    tracing::info!("Reclaimed {deleted} unused tags");

    Ok::<_, ApiError>(Json(ApiResponse::success(ReclaimedResponse { deleted })))
}
