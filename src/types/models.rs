use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{generate_random_password, hash_password, verify_password};
use crate::error::{Error, Result};
use crate::validation;

/// Length of generated passwords (bootstrap admin, resets).
pub const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Identity and audit stamps shared by every stored entity.
///
/// Embedded (flattened) in each entity rather than inherited, so the
/// entities stay plain data with one place for id/timestamp handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityMeta {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp the entity as modified now. Called on every save.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// An account. The email and password hash never appear in responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub username: String,
    #[serde(skip)]
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl User {
    pub fn new(username: &str, email: &str, password: &str) -> Result<Self> {
        let mut user = Self {
            meta: EntityMeta::new(),
            username: String::new(),
            email: String::new(),
            password_hash: String::new(),
            bio: None,
        };
        user.set_username(username)?;
        user.set_email(email)?;
        user.set_password(password)?;
        Ok(user)
    }

    pub fn set_username(&mut self, username: &str) -> Result<()> {
        if !validation::is_username_valid(username) {
            return Err(Error::validation(
                "username",
                "must contain only lowercase letters, numbers, and underscores",
            ));
        }
        self.username = username.to_string();
        Ok(())
    }

    pub fn set_email(&mut self, email: &str) -> Result<()> {
        if !validation::is_email_valid(email) {
            return Err(Error::validation("email", "is not a valid email address"));
        }
        self.email = email.to_string();
        Ok(())
    }

    /// Hashes and stores the new password. The plaintext is never retained.
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::validation("password", "must not be empty"));
        }
        self.password_hash = hash_password(password)?;
        Ok(())
    }

    pub fn verify_password(&self, candidate: &str) -> Result<bool> {
        verify_password(candidate, &self.password_hash)
    }

    /// Replaces the password only when the current one verifies.
    /// Returns false (and changes nothing) on a mismatch.
    pub fn change_password(&mut self, current: &str, new: &str) -> Result<bool> {
        if !self.verify_password(current)? {
            return Ok(false);
        }
        self.set_password(new)?;
        Ok(true)
    }

    /// Replaces the password with a generated one and returns the plaintext.
    /// The caller is responsible for delivering it; it is not stored.
    pub fn reset_password(&mut self) -> Result<String> {
        let plaintext = generate_random_password(GENERATED_PASSWORD_LENGTH);
        self.set_password(&plaintext)?;
        Ok(plaintext)
    }

    pub fn apply_update(&mut self, update: UserUpdate) -> Result<()> {
        if let Some(username) = &update.username {
            self.set_username(username)?;
        }
        if let Some(email) = &update.email {
            self.set_email(email)?;
        }
        if let Some(password) = &update.password {
            self.set_password(password)?;
        }
        if let Some(bio) = update.bio {
            self.bio = if bio.is_empty() { None } else { Some(bio) };
        }
        Ok(())
    }
}

/// Allow-listed partial update for a user. Unknown keys (including `id`,
/// `created_at`, and `updated_at`) are rejected at deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
}

/// A named collection of resources. Names are unique per owner; the owner
/// never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
}

impl Repository {
    pub fn new(owner_id: &str, name: &str, description: Option<String>) -> Result<Self> {
        let mut repository = Self {
            meta: EntityMeta::new(),
            name: String::new(),
            description: description.filter(|d| !d.is_empty()),
            owner_id: owner_id.to_string(),
        };
        repository.set_name(name)?;
        Ok(repository)
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if !validation::is_repo_name_valid(name) {
            return Err(Error::validation(
                "name",
                "must contain only lowercase letters, numbers, and hyphens",
            ));
        }
        self.name = name.to_string();
        Ok(())
    }

    pub fn apply_update(&mut self, update: RepositoryUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            self.set_name(name)?;
        }
        if let Some(description) = update.description {
            self.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A link inside a repository. URLs are unique within their repository;
/// the owning repository never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub repository_id: String,
}

impl Resource {
    pub fn new(
        repository_id: &str,
        title: &str,
        url: &str,
        description: Option<String>,
    ) -> Result<Self> {
        let mut resource = Self {
            meta: EntityMeta::new(),
            title: String::new(),
            url: String::new(),
            description: description.filter(|d| !d.is_empty()),
            repository_id: repository_id.to_string(),
        };
        resource.set_title(title)?;
        resource.set_url(url)?;
        Ok(resource)
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::validation("title", "must not be empty"));
        }
        self.title = title.to_string();
        Ok(())
    }

    pub fn set_url(&mut self, url: &str) -> Result<()> {
        if !validation::is_url_valid(url) {
            return Err(Error::validation(
                "url",
                "must be a valid http, https, or ftp URL",
            ));
        }
        self.url = url.to_string();
        Ok(())
    }

    pub fn apply_update(&mut self, update: ResourceUpdate) -> Result<()> {
        if let Some(title) = &update.title {
            self.set_title(title)?;
        }
        if let Some(url) = &update.url {
            self.set_url(url)?;
        }
        if let Some(description) = update.description {
            self.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceUpdate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

/// A label shared across repositories and resources. Names are global and
/// canonically lowercase; a tag with no associations is "unused" and stays
/// in place until an explicit reclamation pass removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
}

impl Tag {
    pub fn new(name: &str) -> Result<Self> {
        if !validation::is_tag_name_valid(name) {
            return Err(Error::validation(
                "name",
                "must contain only lowercase letters and numbers",
            ));
        }
        Ok(Self {
            meta: EntityMeta::new(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_constructor_validates_fields() {
        assert!(User::new("alice", "alice@example.com", "secret").is_ok());
        assert!(User::new("Alice", "alice@example.com", "secret").is_err());
        assert!(User::new("al ice", "alice@example.com", "secret").is_err());
        assert!(User::new("alice", "not-an-email", "secret").is_err());
        assert!(User::new("alice", "alice@example.com", "").is_err());
    }

    #[test]
    fn test_password_is_hashed_and_verifies() {
        let user = User::new("alice", "alice@example.com", "hunter2xyz").expect("create user");
        assert_ne!(user.password_hash, "hunter2xyz");
        assert!(user.password_hash.starts_with("$argon2"));
        assert!(user.verify_password("hunter2xyz").expect("verify"));
        assert!(!user.verify_password("hunter2xy").expect("verify"));
    }

    #[test]
    fn test_change_password_requires_current() {
        let mut user = User::new("alice", "alice@example.com", "oldpass").expect("create user");
        assert!(!user.change_password("wrong", "newpass").expect("change"));
        assert!(user.verify_password("oldpass").expect("verify"));
        assert!(user.change_password("oldpass", "newpass").expect("change"));
        assert!(user.verify_password("newpass").expect("verify"));
    }

    #[test]
    fn test_reset_password_returns_usable_plaintext() {
        let mut user = User::new("alice", "alice@example.com", "original").expect("create user");
        let generated = user.reset_password().expect("reset");
        assert!(!user.verify_password("original").expect("verify"));
        assert!(user.verify_password(&generated).expect("verify"));
        assert_ne!(user.password_hash, generated);
    }

    #[test]
    fn test_user_serialization_hides_secrets() {
        let user = User::new("alice", "alice@example.com", "secretpw").expect("create user");
        let json = serde_json::to_value(&user).expect("serialize");
        assert_eq!(json["username"], "alice");
        assert!(json.get("email").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("id").is_some());
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn test_user_update_rejects_unknown_fields() {
        let update: std::result::Result<UserUpdate, _> =
            serde_json::from_str(r#"{"bio": "hi", "id": "forged"}"#);
        assert!(update.is_err());

        let update: std::result::Result<UserUpdate, _> =
            serde_json::from_str(r#"{"created_at": "now"}"#);
        assert!(update.is_err());

        let update: UserUpdate =
            serde_json::from_str(r#"{"bio": "hi"}"#).expect("valid update parses");
        assert_eq!(update.bio.as_deref(), Some("hi"));
    }

    #[test]
    fn test_apply_update_validates_and_clears() {
        let mut user = User::new("alice", "alice@example.com", "secretpw").expect("create user");
        let bad = UserUpdate {
            username: Some("Not Valid".to_string()),
            ..Default::default()
        };
        assert!(user.apply_update(bad).is_err());
        assert_eq!(user.username, "alice");

        user.apply_update(UserUpdate {
            bio: Some("likes links".to_string()),
            ..Default::default()
        })
        .expect("apply bio");
        assert_eq!(user.bio.as_deref(), Some("likes links"));

        user.apply_update(UserUpdate {
            bio: Some(String::new()),
            ..Default::default()
        })
        .expect("clear bio");
        assert!(user.bio.is_none());
    }

    #[test]
    fn test_repository_name_rules() {
        let repo = Repository::new("owner-1", "rust-reading", None).expect("create repo");
        assert_eq!(repo.name, "rust-reading");
        assert!(Repository::new("owner-1", "Rust Reading", None).is_err());
        assert!(Repository::new("owner-1", "", None).is_err());
        assert!(Repository::new("owner-1", "rust_reading", None).is_err());
    }

    #[test]
    fn test_resource_requires_title_and_url() {
        assert!(Resource::new("repo-1", "Docs", "https://doc.rust-lang.org/book", None).is_ok());
        assert!(Resource::new("repo-1", "  ", "https://example.com", None).is_err());
        assert!(Resource::new("repo-1", "Docs", "example.com", None).is_err());
    }

    #[test]
    fn test_tag_name_rules() {
        assert!(Tag::new("go").is_ok());
        assert!(Tag::new("web3").is_ok());
        assert!(Tag::new("Go").is_err());
        assert!(Tag::new("c++").is_err());
        assert!(Tag::new("").is_err());
    }

    #[test]
    fn test_touch_advances_updated_at() {
        let mut meta = EntityMeta::new();
        let created = meta.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        meta.touch();
        assert!(meta.updated_at > created);
        assert_eq!(meta.created_at, created);
    }
}
