use crate::auth::Identity;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Repository, Resource, User};

pub fn resolve_user(store: &dyn Store, username: &str) -> Result<User, ApiError> {
    store
        .get_user_by_username(username)
        .api_err("Failed to get user")?
        .or_not_found("User not found")
}

pub fn resolve_repo(
    store: &dyn Store,
    owner: &str,
    name: &str,
) -> Result<(User, Repository), ApiError> {
    let user = resolve_user(store, owner)?;
    let repository = store
        .get_repository_by_name(&user.meta.id, name)
        .api_err("Failed to get repository")?
        .or_not_found("Repository not found")?;
    Ok((user, repository))
}

pub fn resolve_resource(
    store: &dyn Store,
    owner: &str,
    name: &str,
    id: &str,
) -> Result<(User, Repository, Resource), ApiError> {
    let (user, repository) = resolve_repo(store, owner, name)?;
    let resource = store
        .get_resource(&repository.meta.id, id)
        .api_err("Failed to get resource")?
        .or_not_found("Resource not found")?;
    Ok((user, repository, resource))
}

/// The ownership gate for mutations. Callers resolve the record first, so
/// a missing record is a 404 and a foreign one a 403.
pub fn require_authorized(
    state: &AppState,
    identity: &Identity,
    owner_id: &str,
) -> Result<(), ApiError> {
    if state.auth.is_authorized(Some(identity), owner_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to modify this record"))
    }
}
