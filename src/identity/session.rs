use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;
use tracing::debug;

use super::store::IdentityResolver;
use super::user::{CurrentUser, User, UserId};
use crate::error::{AppError, AppResult};

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    /// Set when the user ticked "remember me"; the cookie outlives the browser session.
    pub remember: bool,
    pub expires_at: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub ttl: Duration,
    pub remember_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(24 * 60 * 60), remember_ttl: Duration::from_secs(365 * 24 * 60 * 60) }
    }
}

/// Random 256-bit token, base64url without padding. Also used for CSRF tokens.
pub(crate) fn gen_token() -> AppResult<String> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AppError::internal("rng_unavailable".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Binds session tokens to user ids and restores the current user through the
/// registered [`IdentityResolver`].
pub struct SessionManager {
    policy: SessionPolicy,
    resolver: Arc<dyn IdentityResolver>,
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl SessionManager {
    pub fn new(resolver: Arc<dyn IdentityResolver>, policy: SessionPolicy) -> Self {
        Self { policy, resolver, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Start a session for `user` and return it; the caller hands the token to the client.
    pub fn bind(&self, user: &User, remember: bool) -> AppResult<Session> {
        let now = Instant::now();
        let ttl = if remember { self.policy.remember_ttl } else { self.policy.ttl };
        let sess = Session {
            token: gen_token()?,
            user_id: user.id.clone(),
            remember,
            expires_at: now + ttl,
        };
        self.sessions.write().insert(sess.token.clone(), sess.clone());
        debug!(user_id = %user.id, remember, ttl_secs = ttl.as_secs(), "session.bind");
        Ok(sess)
    }

    /// Resolve the live session for `token`. Expired entries read as absent and
    /// stay in the map until [`SessionManager::sweep_expired`] collects them.
    pub fn session(&self, token: &str) -> Option<Session> {
        let now = Instant::now();
        self.sessions.read().get(token).filter(|s| s.is_live(now)).cloned()
    }

    /// The user bound to `token`, or anonymous when the token is unknown,
    /// expired, or its user is no longer resolvable.
    pub fn current_user(&self, token: Option<&str>) -> CurrentUser {
        let Some(sess) = token.and_then(|t| self.session(t)) else { return CurrentUser::Anonymous };
        match self.resolver.resolve(&sess.user_id) {
            Some(user) => CurrentUser::User(user),
            None => {
                debug!(user_id = %sess.user_id, "session.current_user: identity gone");
                CurrentUser::Anonymous
            }
        }
    }

    pub fn is_authenticated(&self, token: Option<&str>) -> bool {
        self.current_user(token).is_authenticated()
    }

    /// End the session for `token`. Unknown tokens are ignored.
    pub fn clear(&self, token: &str) -> Option<UserId> {
        let removed = self.sessions.write().remove(token).map(|s| s.user_id);
        debug!(found = removed.is_some(), "session.clear");
        removed
    }

    /// Drop every expired session. Returns the user ids that no longer have
    /// any live session, so the caller can release their identity entries.
    pub fn sweep_expired(&self) -> Vec<UserId> {
        let now = Instant::now();
        let mut map = self.sessions.write();
        let mut expired = Vec::new();
        map.retain(|_, s| {
            let live = s.is_live(now);
            if !live {
                expired.push(s.user_id.clone());
            }
            live
        });
        expired.sort();
        expired.dedup();
        expired.retain(|id| !map.values().any(|s| &s.user_id == id));
        debug!(released = expired.len(), active = map.len(), "session.sweep");
        expired
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityStore;

    fn manager(policy: SessionPolicy) -> (Arc<IdentityStore>, SessionManager) {
        let store = Arc::new(IdentityStore::new());
        let sm = SessionManager::new(store.clone(), policy);
        (store, sm)
    }

    #[test]
    fn bind_then_restore_current_user() {
        let (store, sm) = manager(SessionPolicy::default());
        let user = Arc::new(User::authenticated("alice"));
        store.add(user.clone());
        let sess = sm.bind(&user, false).unwrap();
        assert!(!sess.token.is_empty());
        assert!(!sess.remember);

        let cu = sm.current_user(Some(&sess.token));
        assert!(cu.is_authenticated());
        assert!(Arc::ptr_eq(cu.user().unwrap(), &user));
        assert!(sm.is_authenticated(Some(&sess.token)));
    }

    #[test]
    fn tokens_are_unique() {
        let (_store, sm) = manager(SessionPolicy::default());
        let user = User::authenticated("u");
        let a = sm.bind(&user, false).unwrap();
        let b = sm.bind(&user, false).unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(sm.active_sessions(), 2);
    }

    #[test]
    fn unknown_or_missing_token_is_anonymous() {
        let (_store, sm) = manager(SessionPolicy::default());
        assert!(sm.current_user(None).is_anonymous());
        assert!(sm.current_user(Some("bogus")).is_anonymous());
    }

    #[test]
    fn clear_is_idempotent() {
        let (store, sm) = manager(SessionPolicy::default());
        let user = Arc::new(User::authenticated("bob"));
        store.add(user.clone());
        let sess = sm.bind(&user, true).unwrap();
        assert_eq!(sm.clear(&sess.token), Some(user.id.clone()));
        assert_eq!(sm.clear(&sess.token), None);
        assert!(sm.current_user(Some(&sess.token)).is_anonymous());
    }

    #[test]
    fn removed_identity_reads_as_anonymous() {
        let (store, sm) = manager(SessionPolicy::default());
        let user = Arc::new(User::authenticated("gone"));
        store.add(user.clone());
        let sess = sm.bind(&user, false).unwrap();
        store.remove(&user.id);
        assert!(sm.current_user(Some(&sess.token)).is_anonymous());
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let policy = SessionPolicy { ttl: Duration::ZERO, remember_ttl: Duration::from_secs(60) };
        let (store, sm) = manager(policy);
        let user = Arc::new(User::authenticated("t"));
        store.add(user.clone());
        let short = sm.bind(&user, false).unwrap();
        let long = sm.bind(&user, true).unwrap();
        assert!(sm.current_user(Some(&short.token)).is_anonymous());
        assert!(sm.current_user(Some(&long.token)).is_authenticated());
        // Reading an expired token leaves it for the sweeper.
        assert_eq!(sm.active_sessions(), 2);

        // The user still holds a live remembered session, so nothing is released.
        assert!(sm.sweep_expired().is_empty());
        assert_eq!(sm.active_sessions(), 1);
    }

    #[test]
    fn sweep_reports_users_left_without_sessions() {
        let policy = SessionPolicy { ttl: Duration::ZERO, remember_ttl: Duration::from_secs(60) };
        let (store, sm) = manager(policy);
        let gone = Arc::new(User::authenticated("gone"));
        let kept = Arc::new(User::authenticated("kept"));
        store.add(gone.clone());
        store.add(kept.clone());
        sm.bind(&gone, false).unwrap();
        sm.bind(&gone, false).unwrap();
        sm.bind(&kept, true).unwrap();

        assert_eq!(sm.sweep_expired(), vec![gone.id.clone()]);
        assert_eq!(sm.active_sessions(), 1);
        assert!(sm.sweep_expired().is_empty());
    }
}
