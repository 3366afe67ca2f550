use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::caching;
use crate::server::dto::{CreateResourceRequest, ResourceDetail};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::{EntityKind, Store, UnitOfWork};
use crate::types::{Resource, ResourceUpdate};
use crate::validation;

use super::access::{require_authorized, resolve_repo, resolve_resource};

fn resource_detail(store: &dyn Store, resource: Resource) -> Result<ResourceDetail, ApiError> {
    let tags = store
        .list_resource_tags(&resource.meta.id)
        .api_err("Failed to list tags")?;
    Ok(ResourceDetail { resource, tags })
}

pub async fn list_repo_resources(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository) = resolve_repo(store, &owner, &name)?;
    let resources = store
        .list_repository_resources(&repository.meta.id)
        .api_err("Failed to list resources")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(resources)))
}

pub async fn create_resource(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
    Json(req): Json<CreateResourceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (user, repository) = resolve_repo(store, &owner, &name)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    let resource = Resource::new(&repository.meta.id, &req.title, &req.url, req.description)?;
    if !validation::is_resource_available(store, &repository.meta.id, &resource.url)
        .api_err("Failed to check resource URL")?
    {
        return Err(ApiError::conflict("Resource already exists"));
    }

    let mut work = UnitOfWork::new();
    work.create(resource.clone());
    store.commit(work)?;

    let location = format!(
        "/api/v1/repos/{}/{}/resources/{}",
        user.username, repository.name, resource.meta.id
    );
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponse::success(resource)),
    ))
}

pub async fn list_resources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resources = state
        .store
        .list_resources()
        .api_err("Failed to list resources")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(resources)))
}

pub async fn get_resource_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let resource = store
        .find_resource(&id)
        .api_err("Failed to get resource")?
        .or_not_found("Resource not found")?;

    let last_modified = caching::last_modified(&resource.meta.updated_at);
    let detail = resource_detail(store, resource)?;

    Ok::<_, ApiError>((
        [(header::LAST_MODIFIED, last_modified)],
        Json(ApiResponse::success(detail)),
    ))
}

/// Conditional read: a well-formed If-Modified-Since that is not older
/// than the record short-circuits to 304; a malformed one is a 412.
pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    Path((owner, name, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let store = state.store.as_ref();

    let (_, _, resource) = resolve_resource(store, &owner, &name, &id)?;

    if let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|h| h.to_str().ok())
    {
        if !caching::is_modified_since(&resource.meta.updated_at, since)? {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    let last_modified = caching::last_modified(&resource.meta.updated_at);
    let detail = resource_detail(store, resource)?;

    Ok((
        [(header::LAST_MODIFIED, last_modified)],
        Json(ApiResponse::success(detail)),
    )
        .into_response())
}

pub async fn update_resource(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name, id)): Path<(String, String, String)>,
    Json(req): Json<ResourceUpdate>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository, mut resource) = resolve_resource(store, &owner, &name, &id)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    if let Some(new_url) = &req.url {
        if new_url != &resource.url
            && !validation::is_resource_available(store, &repository.meta.id, new_url)
                .api_err("Failed to check resource URL")?
        {
            return Err(ApiError::conflict("Resource already exists"));
        }
    }

    resource.apply_update(req)?;
    resource.meta.touch();

    let mut work = UnitOfWork::new();
    work.update(resource.clone());
    store.commit(work)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(resource)))
}

pub async fn delete_resource(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name, id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository, resource) = resolve_resource(store, &owner, &name, &id)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    let mut work = UnitOfWork::new();
    work.delete(EntityKind::Resource, &resource.meta.id);
    store.commit(work)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
