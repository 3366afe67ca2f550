use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::caching;
use crate::server::dto::{CreateRepositoryRequest, RepositoryDetail};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::{EntityKind, Store, UnitOfWork};
use crate::types::{Repository, RepositoryUpdate};
use crate::validation;

use super::access::{require_authorized, resolve_repo, resolve_user};

fn repository_detail(store: &dyn Store, repository: Repository) -> Result<RepositoryDetail, ApiError> {
    let tags = store
        .list_repository_tags(&repository.meta.id)
        .api_err("Failed to list tags")?;
    let resources = store
        .list_repository_resources(&repository.meta.id)
        .api_err("Failed to list resources")?;
    Ok(RepositoryDetail {
        repository,
        tags,
        resources,
    })
}

pub async fn list_user_repos(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = resolve_user(store, &username)?;
    let repositories = store
        .list_owner_repositories(&user.meta.id)
        .api_err("Failed to list repositories")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(repositories)))
}

pub async fn create_repo(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Json(req): Json<CreateRepositoryRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let user = resolve_user(store, &username)?;
    require_authorized(&state, &auth.0, &user.meta.id)?;

    let repository = Repository::new(&user.meta.id, &req.name, req.description)?;
    if !validation::is_repo_available(store, &user.username, &repository.name)
        .api_err("Failed to check repository name")?
    {
        return Err(ApiError::conflict("Repository already exists"));
    }

    let mut work = UnitOfWork::new();
    work.create(repository.clone());
    store.commit(work)?;

    let location = format!("/api/v1/repos/{}/{}", user.username, repository.name);
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponse::success(repository)),
    ))
}

pub async fn list_repositories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let repositories = state
        .store
        .list_repositories()
        .api_err("Failed to list repositories")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(repositories)))
}

pub async fn get_repository_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let repository = store
        .get_repository(&id)
        .api_err("Failed to get repository")?
        .or_not_found("Repository not found")?;

    let last_modified = caching::last_modified(&repository.meta.updated_at);
    let detail = repository_detail(store, repository)?;

    Ok::<_, ApiError>((
        [(header::LAST_MODIFIED, last_modified)],
        Json(ApiResponse::success(detail)),
    ))
}

pub async fn get_repo(
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository) = resolve_repo(store, &owner, &name)?;

    let last_modified = caching::last_modified(&repository.meta.updated_at);
    let detail = repository_detail(store, repository)?;

    Ok::<_, ApiError>((
        [(header::LAST_MODIFIED, last_modified)],
        Json(ApiResponse::success(detail)),
    ))
}

pub async fn update_repo(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
    Json(req): Json<RepositoryUpdate>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (user, mut repository) = resolve_repo(store, &owner, &name)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    if let Some(new_name) = &req.name {
        if new_name != &repository.name
            && !validation::is_repo_available(store, &user.username, new_name)
                .api_err("Failed to check repository name")?
        {
            return Err(ApiError::conflict("Repository already exists"));
        }
    }

    repository.apply_update(req)?;
    repository.meta.touch();

    let mut work = UnitOfWork::new();
    work.update(repository.clone());
    store.commit(work)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(repository)))
}

pub async fn delete_repo(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((owner, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let (_, repository) = resolve_repo(store, &owner, &name)?;
    require_authorized(&state, &auth.0, &repository.owner_id)?;

    let mut work = UnitOfWork::new();
    work.delete(EntityKind::Repository, &repository.meta.id);
    store.commit(work)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
