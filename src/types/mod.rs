mod models;

pub use models::{
    EntityMeta, GENERATED_PASSWORD_LENGTH, Repository, RepositoryUpdate, Resource, ResourceUpdate,
    Tag, User, UserUpdate,
};
