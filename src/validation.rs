//! Field format rules and store-backed availability checks.
//!
//! Format predicates are pure; availability checks always query the store
//! fresh and answer false when the parent entity is missing rather than
//! erroring.

use crate::error::Result;
use crate::store::Store;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_email_atom_char(c: char) -> bool {
    is_word_char(c) || c == '.' || c == '-'
}

/// Usernames: one or more lowercase letters, digits, or underscores.
pub fn is_username_valid(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Repository names: one or more lowercase letters, digits, or hyphens.
/// Lowercase-only by rule, so name comparisons are always byte-wise.
pub fn is_repo_name_valid(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Tag names: one or more lowercase letters or digits. Canonical lowercase
/// keeps the global unique index and the attached-check on the same
/// byte-wise comparison.
pub fn is_tag_name_valid(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Emails: local part, `@`, domain with a dot-separated TLD. Word
/// characters, dots, and hyphens only.
pub fn is_email_valid(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || !local.chars().all(is_email_atom_char) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && host.chars().all(is_email_atom_char)
        && !tld.is_empty()
        && tld.chars().all(is_word_char)
}

/// URLs: http, https, or ftp scheme, then a host that does not start with
/// `/`, `$`, `.`, `?`, or `#`, is at least two characters, and contains no
/// whitespace.
pub fn is_url_valid(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .or_else(|| url.strip_prefix("ftp://"));
    let Some(rest) = rest else {
        return false;
    };
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first.is_whitespace() || matches!(first, '/' | '$' | '.' | '?' | '#') {
        return false;
    }
    if chars.next().is_none() {
        return false;
    }
    !rest.chars().any(char::is_whitespace)
}

pub fn is_username_available(store: &dyn Store, username: &str) -> Result<bool> {
    Ok(store.get_user_by_username(username)?.is_none())
}

pub fn is_email_available(store: &dyn Store, email: &str) -> Result<bool> {
    Ok(store.get_user_by_email(email)?.is_none())
}

/// False when the owner does not exist or already has a repository with
/// this name.
pub fn is_repo_available(store: &dyn Store, username: &str, name: &str) -> Result<bool> {
    let Some(owner) = store.get_user_by_username(username)? else {
        return Ok(false);
    };
    Ok(store
        .get_repository_by_name(&owner.meta.id, name)?
        .is_none())
}

/// False when the repository does not exist or already holds this URL.
pub fn is_resource_available(store: &dyn Store, repository_id: &str, url: &str) -> Result<bool> {
    if store.get_repository(repository_id)?.is_none() {
        return Ok(false);
    }
    Ok(store.get_resource_by_url(repository_id, url)?.is_none())
}

/// False when the repository does not exist or already carries the tag.
pub fn is_repo_tag_available(store: &dyn Store, repository_id: &str, name: &str) -> Result<bool> {
    if store.get_repository(repository_id)?.is_none() {
        return Ok(false);
    }
    Ok(store
        .list_repository_tags(repository_id)?
        .iter()
        .all(|tag| tag.name != name))
}

/// False when the resource does not exist or already carries the tag.
pub fn is_resource_tag_available(store: &dyn Store, resource_id: &str, name: &str) -> Result<bool> {
    if store.find_resource(resource_id)?.is_none() {
        return Ok(false);
    }
    Ok(store
        .list_resource_tags(resource_id)?
        .iter()
        .all(|tag| tag.name != name))
}
