use serde::{Deserialize, Serialize};

use crate::types::{Repository, Resource, Tag, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    /// Lifetime override in seconds. Absent means the configured default.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub repositories: i64,
    pub resources: i64,
    pub tags: i64,
}

#[derive(Debug, Serialize)]
pub struct ReclaimedResponse {
    pub deleted: usize,
}

/// Full user view: the summary fields plus owned repositories.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub repositories: Vec<Repository>,
}

/// Full repository view: the summary fields plus tags and resources.
#[derive(Debug, Serialize)]
pub struct RepositoryDetail {
    #[serde(flatten)]
    pub repository: Repository,
    pub tags: Vec<Tag>,
    pub resources: Vec<Resource>,
}

/// Full resource view: the summary fields plus tags.
#[derive(Debug, Serialize)]
pub struct ResourceDetail {
    #[serde(flatten)]
    pub resource: Resource,
    pub tags: Vec<Tag>,
}
