use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::user::{User, UserId};

/// Looks a user up by id. Registered once with the session manager so it can
/// restore the current user from a session token on every request.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, id: &UserId) -> Option<Arc<User>>;
}

/// In-process mapping of user id to the logged-in user record.
///
/// Entries live from login to logout. There is no expiry, size bound or
/// persistence. The same `Arc` handed to [`IdentityStore::add`] is returned by
/// [`IdentityStore::lookup`].
#[derive(Debug, Default)]
pub struct IdentityStore {
    users: RwLock<HashMap<UserId, Arc<User>>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keyed by `user.id`. An existing entry is overwritten and returned.
    pub fn add(&self, user: Arc<User>) -> Option<Arc<User>> {
        let id = user.id.clone();
        let prev = self.users.write().insert(id.clone(), user);
        debug!(user_id = %id, replaced = prev.is_some(), "identity.add");
        prev
    }

    /// Remove the entry for `id`. A missing id is not an error.
    pub fn remove(&self, id: &UserId) -> Option<Arc<User>> {
        let removed = self.users.write().remove(id);
        if removed.is_none() {
            debug!(user_id = %id, "identity.remove: no entry");
        }
        removed
    }

    pub fn lookup(&self, id: &UserId) -> Option<Arc<User>> {
        self.users.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

impl IdentityResolver for IdentityStore {
    fn resolve(&self, id: &UserId) -> Option<Arc<User>> {
        self.lookup(id)
    }
}
