mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::{Repository, Resource, Tag, User};

/// The kinds of entity the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Repository,
    Resource,
    Tag,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Repository => "repository",
            EntityKind::Resource => "resource",
            EntityKind::Tag => "tag",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored entity, carried through staged changes.
#[derive(Debug, Clone)]
pub enum Entity {
    User(User),
    Repository(Repository),
    Resource(Resource),
    Tag(Tag),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Repository(_) => EntityKind::Repository,
            Entity::Resource(_) => EntityKind::Resource,
            Entity::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::User(user) => &user.meta.id,
            Entity::Repository(repository) => &repository.meta.id,
            Entity::Resource(resource) => &resource.meta.id,
            Entity::Tag(tag) => &tag.meta.id,
        }
    }
}

impl From<User> for Entity {
    fn from(user: User) -> Self {
        Entity::User(user)
    }
}

impl From<Repository> for Entity {
    fn from(repository: Repository) -> Self {
        Entity::Repository(repository)
    }
}

impl From<Resource> for Entity {
    fn from(resource: Resource) -> Self {
        Entity::Resource(resource)
    }
}

impl From<Tag> for Entity {
    fn from(tag: Tag) -> Self {
        Entity::Tag(tag)
    }
}

/// Which side of the tag many-to-many a staged attach or detach touches.
#[derive(Debug, Clone)]
pub enum TagTarget {
    Repository(String),
    Resource(String),
}

/// A single staged write.
#[derive(Debug, Clone)]
pub enum Change {
    Create(Entity),
    Update(Entity),
    Delete(EntityKind, String),
    AttachTag { target: TagTarget, tag_id: String },
    DetachTag { target: TagTarget, tag_id: String },
}

/// Staged writes for one request scope.
///
/// Changes are buffered here until `Store::commit` applies them in a single
/// transaction. Dropping the value discards the staged work, so a request
/// that bails early releases everything without cleanup code.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    changes: Vec<Change>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, entity: impl Into<Entity>) {
        self.changes.push(Change::Create(entity.into()));
    }

    pub fn create_all<I>(&mut self, entities: I)
    where
        I: IntoIterator,
        I::Item: Into<Entity>,
    {
        for entity in entities {
            self.create(entity);
        }
    }

    pub fn update(&mut self, entity: impl Into<Entity>) {
        self.changes.push(Change::Update(entity.into()));
    }

    pub fn delete(&mut self, kind: EntityKind, id: &str) {
        self.changes.push(Change::Delete(kind, id.to_string()));
    }

    pub fn attach_tag(&mut self, target: TagTarget, tag_id: &str) {
        self.changes.push(Change::AttachTag {
            target,
            tag_id: tag_id.to_string(),
        });
    }

    pub fn detach_tag(&mut self, target: TagTarget, tag_id: &str) {
        self.changes.push(Change::DetachTag {
            target,
            tag_id: tag_id.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub(crate) fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

/// Store defines the database interface. Reads always query live data;
/// writes are staged in a `UnitOfWork` and applied by `commit`.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    /// Applies every staged change in one transaction, in order. On any
    /// failure nothing is persisted and the error surfaces to the caller;
    /// uniqueness violations come back as `Error::Conflict`.
    fn commit(&self, work: UnitOfWork) -> Result<()>;

    // User operations
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;

    // Repository operations
    fn get_repository(&self, id: &str) -> Result<Option<Repository>>;
    fn get_repository_by_name(&self, owner_id: &str, name: &str) -> Result<Option<Repository>>;
    fn list_repositories(&self) -> Result<Vec<Repository>>;
    fn list_owner_repositories(&self, owner_id: &str) -> Result<Vec<Repository>>;

    // Resource operations
    fn get_resource(&self, repository_id: &str, id: &str) -> Result<Option<Resource>>;
    fn find_resource(&self, id: &str) -> Result<Option<Resource>>;
    fn get_resource_by_url(&self, repository_id: &str, url: &str) -> Result<Option<Resource>>;
    fn list_resources(&self) -> Result<Vec<Resource>>;
    fn list_repository_resources(&self, repository_id: &str) -> Result<Vec<Resource>>;

    // Tag operations (many-to-many with repositories and resources)
    fn get_tag(&self, id: &str) -> Result<Option<Tag>>;
    fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    fn list_tags(&self) -> Result<Vec<Tag>>;
    fn list_repository_tags(&self, repository_id: &str) -> Result<Vec<Tag>>;
    fn list_resource_tags(&self, resource_id: &str) -> Result<Vec<Tag>>;
    fn repository_has_tag(&self, repository_id: &str, tag_id: &str) -> Result<bool>;
    fn resource_has_tag(&self, resource_id: &str, tag_id: &str) -> Result<bool>;
    fn list_unused_tags(&self) -> Result<Vec<Tag>>;

    /// Deletes every tag with no repository and no resource associations in
    /// a single pass. Returns how many were removed. Runs only when
    /// explicitly invoked; nothing sweeps tags implicitly.
    fn delete_unused_tags(&self) -> Result<usize>;

    fn count(&self, kind: EntityKind) -> Result<i64>;

    /// Safe to call with no work pending.
    fn close(&self) -> Result<()>;
}
