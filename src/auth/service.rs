use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::token::TokenSigner;
use crate::error::Result;
use crate::store::Store;
use crate::types::User;

/// The live user a verified token's subject resolved to.
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn is(&self, user_id: &str) -> bool {
        self.user.meta.id == user_id
    }
}

pub struct AuthService {
    signer: TokenSigner,
    admins: HashSet<String>,
}

impl AuthService {
    pub fn new(signer: TokenSigner, admins: HashSet<String>) -> Self {
        Self { signer, admins }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Checks a username/password pair against the store. Returns None both
    /// for an unknown username and for a wrong password, so callers cannot
    /// tell the two apart.
    pub fn verify_credentials(
        &self,
        store: &dyn Store,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let Some(user) = store.get_user_by_username(username)? else {
            return Ok(None);
        };
        if user.verify_password(password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.admins.contains(&identity.user.username)
    }

    /// The single mutation predicate: the caller owns the record or is an
    /// admin. An anonymous caller is never authorized.
    pub fn is_authorized(&self, identity: Option<&Identity>, owner_id: &str) -> bool {
        match identity {
            Some(identity) => identity.is(owner_id) || self.is_admin(identity),
            None => false,
        }
    }
}

/// Splits a Basic authorization header into username and password.
pub fn parse_basic_credentials(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
