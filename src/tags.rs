//! Tag lifecycle. Attaching resolves the name to a global row, creating it
//! when missing, inside the same commit as the association. Detaching only
//! removes the association; rows linger until an explicit reclamation pass.

use crate::error::{Error, Result};
use crate::store::{Store, TagTarget, UnitOfWork};
use crate::types::Tag;
use crate::validation;

fn attach(store: &dyn Store, target: TagTarget, name: &str) -> Result<Tag> {
    if !validation::is_tag_name_valid(name) {
        return Err(Error::validation(
            "name",
            "must contain only lowercase letters and numbers",
        ));
    }

    let available = match &target {
        TagTarget::Repository(id) => validation::is_repo_tag_available(store, id, name)?,
        TagTarget::Resource(id) => validation::is_resource_tag_available(store, id, name)?,
    };
    if !available {
        return Err(Error::conflict("tag already attached"));
    }

    let mut work = UnitOfWork::new();
    let tag = match store.get_tag_by_name(name)? {
        Some(existing) => existing,
        None => {
            let tag = Tag::new(name)?;
            work.create(tag.clone());
            tag
        }
    };
    work.attach_tag(target, &tag.meta.id);
    store.commit(work)?;

    Ok(tag)
}

fn detach(store: &dyn Store, target: TagTarget, name: &str) -> Result<()> {
    let Some(tag) = store.get_tag_by_name(name)? else {
        return Err(Error::not_found("tag"));
    };

    let attached = match &target {
        TagTarget::Repository(id) => store.repository_has_tag(id, &tag.meta.id)?,
        TagTarget::Resource(id) => store.resource_has_tag(id, &tag.meta.id)?,
    };
    if !attached {
        return Err(Error::not_found("tag"));
    }

    let mut work = UnitOfWork::new();
    work.detach_tag(target, &tag.meta.id);
    store.commit(work)
}

pub fn attach_repository_tag(store: &dyn Store, repository_id: &str, name: &str) -> Result<Tag> {
    attach(store, TagTarget::Repository(repository_id.to_string()), name)
}

pub fn attach_resource_tag(store: &dyn Store, resource_id: &str, name: &str) -> Result<Tag> {
    attach(store, TagTarget::Resource(resource_id.to_string()), name)
}

pub fn detach_repository_tag(store: &dyn Store, repository_id: &str, name: &str) -> Result<()> {
    detach(store, TagTarget::Repository(repository_id.to_string()), name)
}

pub fn detach_resource_tag(store: &dyn Store, resource_id: &str, name: &str) -> Result<()> {
    detach(store, TagTarget::Resource(resource_id.to_string()), name)
}

/// Deletes every tag row with no remaining attachment. Returns how many
/// rows went away; running it again immediately returns zero.
pub fn reclaim_unused_tags(store: &dyn Store) -> Result<usize> {
    store.delete_unused_tags()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{Repository, Resource, User};

    fn seeded_store() -> (TempDir, SqliteStore, Repository, Resource) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let user = User::new("alice", "alice@example.com", "password1").unwrap();
        let repository = Repository::new(&user.meta.id, "reading", None).unwrap();
        let resource =
            Resource::new(&repository.meta.id, "Article", "https://example.com/a", None).unwrap();

        let mut work = UnitOfWork::new();
        work.create(user);
        work.create(repository.clone());
        work.create(resource.clone());
        store.commit(work).unwrap();

        (temp, store, repository, resource)
    }

    #[test]
    fn test_attach_creates_missing_tag() {
        let (_temp, store, repository, _) = seeded_store();

        let tag = attach_repository_tag(&store, &repository.meta.id, "go").unwrap();
        assert_eq!(tag.name, "go");
        assert!(store
            .repository_has_tag(&repository.meta.id, &tag.meta.id)
            .unwrap());
    }

    #[test]
    fn test_attach_reuses_existing_row() {
        let (_temp, store, repository, resource) = seeded_store();

        let first = attach_repository_tag(&store, &repository.meta.id, "go").unwrap();
        let second = attach_resource_tag(&store, &resource.meta.id, "go").unwrap();

        assert_eq!(first.meta.id, second.meta.id);
        assert_eq!(store.list_tags().unwrap().len(), 1);
    }

    #[test]
    fn test_attach_rejects_duplicate() {
        let (_temp, store, repository, _) = seeded_store();

        attach_repository_tag(&store, &repository.meta.id, "go").unwrap();
        let result = attach_repository_tag(&store, &repository.meta.id, "go");
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_attach_rejects_invalid_name() {
        let (_temp, store, repository, _) = seeded_store();

        let result = attach_repository_tag(&store, &repository.meta.id, "Not Valid");
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(store.list_tags().unwrap().is_empty());
    }

    #[test]
    fn test_detach_keeps_the_row() {
        let (_temp, store, repository, _) = seeded_store();

        let tag = attach_repository_tag(&store, &repository.meta.id, "go").unwrap();
        detach_repository_tag(&store, &repository.meta.id, "go").unwrap();

        assert!(!store
            .repository_has_tag(&repository.meta.id, &tag.meta.id)
            .unwrap());
        assert!(store.get_tag_by_name("go").unwrap().is_some());
    }

    #[test]
    fn test_detach_requires_attachment() {
        let (_temp, store, repository, resource) = seeded_store();

        // Unknown tag name.
        let result = detach_repository_tag(&store, &repository.meta.id, "go");
        assert!(matches!(result, Err(Error::NotFound { .. })));

        // Known tag, but attached elsewhere.
        attach_resource_tag(&store, &resource.meta.id, "go").unwrap();
        let result = detach_repository_tag(&store, &repository.meta.id, "go");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_reclaim_sweeps_only_detached_rows() {
        let (_temp, store, repository, resource) = seeded_store();

        attach_repository_tag(&store, &repository.meta.id, "go").unwrap();
        attach_resource_tag(&store, &resource.meta.id, "rust").unwrap();
        detach_resource_tag(&store, &resource.meta.id, "rust").unwrap();

        assert_eq!(reclaim_unused_tags(&store).unwrap(), 1);
        assert!(store.get_tag_by_name("rust").unwrap().is_none());
        assert!(store.get_tag_by_name("go").unwrap().is_some());
        assert_eq!(reclaim_unused_tags(&store).unwrap(), 0);
    }
}
