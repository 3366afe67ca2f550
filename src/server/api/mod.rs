mod access;
mod admin;
mod auth;
mod repo_tags;
mod repos;
mod resource_tags;
mod resources;
mod stats;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Registration and tokens
        .route("/register", post(auth::register))
        .route("/token", get(auth::issue_token))
        .route("/stats", get(stats::get_stats))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}", put(users::update_user))
        .route("/users/{username}", delete(users::delete_user))
        // Repositories
        .route("/users/{username}/repos", get(repos::list_user_repos))
        .route("/users/{username}/repos", post(repos::create_repo))
        .route("/repositories", get(repos::list_repositories))
        .route("/repositories/{id}", get(repos::get_repository_by_id))
        .route("/repos/{owner}/{name}", get(repos::get_repo))
        .route("/repos/{owner}/{name}", put(repos::update_repo))
        .route("/repos/{owner}/{name}", delete(repos::delete_repo))
        // Resources
        .route(
            "/repos/{owner}/{name}/resources",
            get(resources::list_repo_resources),
        )
        .route(
            "/repos/{owner}/{name}/resources",
            post(resources::create_resource),
        )
        .route("/resources", get(resources::list_resources))
        .route("/resources/{id}", get(resources::get_resource_by_id))
        .route(
            "/repos/{owner}/{name}/resources/{id}",
            get(resources::get_resource),
        )
        .route(
            "/repos/{owner}/{name}/resources/{id}",
            put(resources::update_resource),
        )
        .route(
            "/repos/{owner}/{name}/resources/{id}",
            delete(resources::delete_resource),
        )
        // Repo tags (shared rows, attached by name)
        .route("/repos/{owner}/{name}/tags", get(repo_tags::list_repo_tags))
        .route("/repos/{owner}/{name}/tags", post(repo_tags::add_repo_tag))
        .route(
            "/repos/{owner}/{name}/tags/{tag}",
            delete(repo_tags::remove_repo_tag),
        )
        // Resource tags
        .route(
            "/resources/{id}/tags",
            get(resource_tags::list_resource_tags),
        )
        .route(
            "/resources/{id}/tags",
            post(resource_tags::add_resource_tag),
        )
        .route(
            "/resources/{id}/tags/{tag}",
            delete(resource_tags::remove_resource_tag),
        )
        // Admin
        .route("/tags/unused", delete(admin::reclaim_unused_tags))
}
