use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use super::schema::SCHEMA;
use super::{Change, Entity, EntityKind, Store, TagTarget, UnitOfWork};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn map_constraint(err: rusqlite::Error, message: String) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(message)
        }
        e => Error::from(e),
    }
}

fn insert_entity(tx: &Transaction<'_>, entity: &Entity) -> Result<()> {
    let result = match entity {
        Entity::User(user) => tx.execute(
            "INSERT INTO users (id, username, email, password_hash, bio, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.meta.id,
                user.username,
                user.email,
                user.password_hash,
                user.bio,
                format_datetime(&user.meta.created_at),
                format_datetime(&user.meta.updated_at),
            ],
        ),
        Entity::Repository(repository) => tx.execute(
            "INSERT INTO repositories (id, owner_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                repository.meta.id,
                repository.owner_id,
                repository.name,
                repository.description,
                format_datetime(&repository.meta.created_at),
                format_datetime(&repository.meta.updated_at),
            ],
        ),
        Entity::Resource(resource) => tx.execute(
            "INSERT INTO resources (id, repository_id, title, url, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                resource.meta.id,
                resource.repository_id,
                resource.title,
                resource.url,
                resource.description,
                format_datetime(&resource.meta.created_at),
                format_datetime(&resource.meta.updated_at),
            ],
        ),
        Entity::Tag(tag) => tx.execute(
            "INSERT INTO tags (id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                tag.meta.id,
                tag.name,
                format_datetime(&tag.meta.created_at),
                format_datetime(&tag.meta.updated_at),
            ],
        ),
    };

    result
        .map(|_| ())
        .map_err(|e| map_constraint(e, format!("{} already exists", entity.kind())))
}

fn update_entity(tx: &Transaction<'_>, entity: &Entity) -> Result<()> {
    // Owner and repository columns are immutable, so they never appear in a
    // SET clause.
    let result = match entity {
        Entity::User(user) => tx.execute(
            "UPDATE users SET username = ?2, email = ?3, password_hash = ?4, bio = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                user.meta.id,
                user.username,
                user.email,
                user.password_hash,
                user.bio,
                format_datetime(&user.meta.updated_at),
            ],
        ),
        Entity::Repository(repository) => tx.execute(
            "UPDATE repositories SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                repository.meta.id,
                repository.name,
                repository.description,
                format_datetime(&repository.meta.updated_at),
            ],
        ),
        Entity::Resource(resource) => tx.execute(
            "UPDATE resources SET title = ?2, url = ?3, description = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                resource.meta.id,
                resource.title,
                resource.url,
                resource.description,
                format_datetime(&resource.meta.updated_at),
            ],
        ),
        Entity::Tag(tag) => tx.execute(
            "UPDATE tags SET name = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                tag.meta.id,
                tag.name,
                format_datetime(&tag.meta.updated_at),
            ],
        ),
    };

    let rows =
        result.map_err(|e| map_constraint(e, format!("{} already exists", entity.kind())))?;
    if rows == 0 {
        return Err(Error::not_found(entity.kind().as_str()));
    }
    Ok(())
}

fn delete_entity(tx: &Transaction<'_>, kind: EntityKind, id: &str) -> Result<()> {
    let sql = match kind {
        EntityKind::User => "DELETE FROM users WHERE id = ?1",
        EntityKind::Repository => "DELETE FROM repositories WHERE id = ?1",
        EntityKind::Resource => "DELETE FROM resources WHERE id = ?1",
        EntityKind::Tag => "DELETE FROM tags WHERE id = ?1",
    };
    // Deleting an already-absent row is a no-op, not a failure.
    tx.execute(sql, params![id])?;
    Ok(())
}

fn apply_change(tx: &Transaction<'_>, change: Change) -> Result<()> {
    match change {
        Change::Create(entity) => insert_entity(tx, &entity),
        Change::Update(entity) => update_entity(tx, &entity),
        Change::Delete(kind, id) => delete_entity(tx, kind, &id),
        Change::AttachTag { target, tag_id } => {
            let (sql, target_id) = match &target {
                TagTarget::Repository(id) => (
                    "INSERT INTO repository_tags (repository_id, tag_id) VALUES (?1, ?2)",
                    id,
                ),
                TagTarget::Resource(id) => (
                    "INSERT INTO resource_tags (resource_id, tag_id) VALUES (?1, ?2)",
                    id,
                ),
            };
            tx.execute(sql, params![target_id, tag_id])
                .map(|_| ())
                .map_err(|e| map_constraint(e, "tag already attached".to_string()))
        }
        Change::DetachTag { target, tag_id } => {
            let (sql, target_id) = match &target {
                TagTarget::Repository(id) => (
                    "DELETE FROM repository_tags WHERE repository_id = ?1 AND tag_id = ?2",
                    id,
                ),
                TagTarget::Resource(id) => (
                    "DELETE FROM resource_tags WHERE resource_id = ?1 AND tag_id = ?2",
                    id,
                ),
            };
            tx.execute(sql, params![target_id, tag_id])?;
            Ok(())
        }
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn commit(&self, work: UnitOfWork) -> Result<()> {
        if work.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for change in work.into_changes() {
            // The transaction rolls back on drop, so the first failure
            // discards every staged change.
            apply_change(&tx, change)?;
        }
        tx.commit()?;
        Ok(())
    }

    // User operations

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, password_hash, bio, created_at, updated_at
             FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    bio: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, password_hash, bio, created_at, updated_at
             FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(User {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    bio: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, password_hash, bio, created_at, updated_at
             FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(User {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    bio: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, email, password_hash, bio, created_at, updated_at
             FROM users ORDER BY username",
        )?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    username: row.get(1)?,
                    email: row.get(2)?,
                    password_hash: row.get(3)?,
                    bio: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // Repository operations

    fn get_repository(&self, id: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, owner_id, name, description, created_at, updated_at
             FROM repositories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Repository {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(4)?),
                        updated_at: parse_datetime(&row.get::<_, String>(5)?),
                    },
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_repository_by_name(&self, owner_id: &str, name: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, owner_id, name, description, created_at, updated_at
             FROM repositories WHERE owner_id = ?1 AND name = ?2",
            params![owner_id, name],
            |row| {
                Ok(Repository {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(4)?),
                        updated_at: parse_datetime(&row.get::<_, String>(5)?),
                    },
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_repositories(&self) -> Result<Vec<Repository>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, description, created_at, updated_at
             FROM repositories ORDER BY created_at",
        )?;
        let repositories = stmt
            .query_map([], |row| {
                Ok(Repository {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(4)?),
                        updated_at: parse_datetime(&row.get::<_, String>(5)?),
                    },
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(repositories)
    }

    fn list_owner_repositories(&self, owner_id: &str) -> Result<Vec<Repository>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, description, created_at, updated_at
             FROM repositories WHERE owner_id = ?1 ORDER BY name",
        )?;
        let repositories = stmt
            .query_map(params![owner_id], |row| {
                Ok(Repository {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(4)?),
                        updated_at: parse_datetime(&row.get::<_, String>(5)?),
                    },
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(repositories)
    }

    // Resource operations

    fn get_resource(&self, repository_id: &str, id: &str) -> Result<Option<Resource>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, repository_id, title, url, description, created_at, updated_at
             FROM resources WHERE repository_id = ?1 AND id = ?2",
            params![repository_id, id],
            |row| {
                Ok(Resource {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    repository_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    description: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_resource(&self, id: &str) -> Result<Option<Resource>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, repository_id, title, url, description, created_at, updated_at
             FROM resources WHERE id = ?1",
            params![id],
            |row| {
                Ok(Resource {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    repository_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    description: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_resource_by_url(&self, repository_id: &str, url: &str) -> Result<Option<Resource>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, repository_id, title, url, description, created_at, updated_at
             FROM resources WHERE repository_id = ?1 AND url = ?2",
            params![repository_id, url],
            |row| {
                Ok(Resource {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    repository_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    description: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_resources(&self) -> Result<Vec<Resource>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, repository_id, title, url, description, created_at, updated_at
             FROM resources ORDER BY created_at",
        )?;
        let resources = stmt
            .query_map([], |row| {
                Ok(Resource {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    repository_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    description: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    fn list_repository_resources(&self, repository_id: &str) -> Result<Vec<Resource>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, repository_id, title, url, description, created_at, updated_at
             FROM resources WHERE repository_id = ?1 ORDER BY created_at",
        )?;
        let resources = stmt
            .query_map(params![repository_id], |row| {
                Ok(Resource {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                        updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    },
                    repository_id: row.get(1)?,
                    title: row.get(2)?,
                    url: row.get(3)?,
                    description: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(resources)
    }

    // Tag operations

    fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM tags WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tag {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    },
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at, updated_at FROM tags WHERE name = ?1",
            params![name],
            |row| {
                Ok(Tag {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    },
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM tags ORDER BY name")?;
        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    },
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn list_repository_tags(&self, repository_id: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.created_at, t.updated_at
             FROM tags t
             JOIN repository_tags rt ON rt.tag_id = t.id
             WHERE rt.repository_id = ?1
             ORDER BY t.name",
        )?;
        let tags = stmt
            .query_map(params![repository_id], |row| {
                Ok(Tag {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    },
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn list_resource_tags(&self, resource_id: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.name, t.created_at, t.updated_at
             FROM tags t
             JOIN resource_tags rt ON rt.tag_id = t.id
             WHERE rt.resource_id = ?1
             ORDER BY t.name",
        )?;
        let tags = stmt
            .query_map(params![resource_id], |row| {
                Ok(Tag {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    },
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn repository_has_tag(&self, repository_id: &str, tag_id: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM repository_tags WHERE repository_id = ?1 AND tag_id = ?2",
            params![repository_id, tag_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn resource_has_tag(&self, resource_id: &str, tag_id: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM resource_tags WHERE resource_id = ?1 AND tag_id = ?2",
            params![resource_id, tag_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_unused_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, updated_at FROM tags
             WHERE id NOT IN (SELECT tag_id FROM repository_tags)
               AND id NOT IN (SELECT tag_id FROM resource_tags)
             ORDER BY name",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    meta: EntityMeta {
                        id: row.get(0)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    },
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn delete_unused_tags(&self) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM tags
             WHERE id NOT IN (SELECT tag_id FROM repository_tags)
               AND id NOT IN (SELECT tag_id FROM resource_tags)",
            [],
        )?;
        Ok(rows)
    }

    fn count(&self, kind: EntityKind) -> Result<i64> {
        let sql = match kind {
            EntityKind::User => "SELECT COUNT(*) FROM users",
            EntityKind::Repository => "SELECT COUNT(*) FROM repositories",
            EntityKind::Resource => "SELECT COUNT(*) FROM resources",
            EntityKind::Tag => "SELECT COUNT(*) FROM tags",
        };
        self.conn()
            .query_row(sql, [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
