use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;
use crate::server::dto::StatsResponse;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::EntityKind;

pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();

    let stats = StatsResponse {
        users: store.count(EntityKind::User).api_err("Failed to count users")?,
        repositories: store
            .count(EntityKind::Repository)
            .api_err("Failed to count repositories")?,
        resources: store
            .count(EntityKind::Resource)
            .api_err("Failed to count resources")?,
        tags: store.count(EntityKind::Tag).api_err("Failed to count tags")?,
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(stats)))
}
