//! Client session namespace (spec §4.2, component C7).
//!
//! Tracks the set of IPC sessions the core has seen, memoising each
//! session's resolved app name on first access so later pushes under
//! `/app/<name>` don't pay another identity-service round trip.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

use crate::identity::{IdentityRejected, IdentityService};
use crate::lifecycle::KillReason;

/// Opaque IPC session identifier. The core treats this as a plain key;
/// assigning and transporting it is the owning IPC layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the registry knows about one session.
#[derive(Debug, Clone)]
struct SessionState {
    app_name: Option<String>,
    kill_reason: Option<KillReason>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            app_name: None,
            kill_reason: None,
        }
    }

    fn alive(&self) -> bool {
        self.kill_reason.is_none()
    }
}

/// Tracks every session the core has seen and each one's memoised app
/// name (spec §4.2: "On first access by a session, resolve the session's
/// app name ... memoise that entry on the session").
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `session`'s app name, consulting `identity` only on first
    /// access. Returns the rejection if the identity service refuses a
    /// session it has never seen before; a session already known keeps
    /// returning its memoised name regardless of what `identity` would
    /// say now.
    pub fn resolve_app_name(
        &self,
        session: &SessionId,
        identity: &dyn IdentityService,
    ) -> Result<String, IdentityRejected> {
        if let Some(state) = self.sessions.read().get(session) {
            if let Some(name) = &state.app_name {
                return Ok(name.clone());
            }
        }

        let name = identity.resolve_app_name(session)?;

        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(session.clone())
            .or_insert_with(SessionState::new);
        state.app_name = Some(name.clone());
        Ok(name)
    }

    /// Record that `session` has been terminated for `reason` (spec §7).
    /// A session already dead keeps its original reason.
    pub fn kill(&self, session: &SessionId, reason: KillReason) {
        let mut sessions = self.sessions.write();
        let state = sessions
            .entry(session.clone())
            .or_insert_with(SessionState::new);
        if state.kill_reason.is_none() {
            state.kill_reason = Some(reason);
        }
    }

    /// `true` unless the session has been killed or was never seen.
    pub fn is_alive(&self, session: &SessionId) -> bool {
        self.sessions
            .read()
            .get(session)
            .map(SessionState::alive)
            .unwrap_or(false)
    }

    /// The reason `session` was terminated, if any.
    pub fn kill_reason(&self, session: &SessionId) -> Option<KillReason> {
        self.sessions
            .read()
            .get(session)
            .and_then(|s| s.kill_reason.clone())
    }

    /// Register a session as present (alive, app name unresolved) without
    /// consulting the identity service. Used by callers that learn of a
    /// new IPC connection before the session pushes or reads anything.
    pub fn observe(&self, session: &SessionId) {
        self.sessions
            .write()
            .entry(session.clone())
            .or_insert_with(SessionState::new);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;

    #[test]
    fn resolves_and_memoises_app_name() {
        let id = SessionId::new("s1");
        let identity = StaticIdentity::new().with(id.clone(), "sensor-gw");
        let registry = SessionRegistry::new();

        assert_eq!(registry.resolve_app_name(&id, &identity).unwrap(), "sensor-gw");
        // Second call must not need the identity service at all: swap in
        // an identity that would reject everything and confirm the cached
        // name still comes back.
        let empty = StaticIdentity::new();
        assert_eq!(registry.resolve_app_name(&id, &empty).unwrap(), "sensor-gw");
    }

    #[test]
    fn rejection_is_not_memoised() {
        let id = SessionId::new("ghost");
        let identity = StaticIdentity::new();
        let registry = SessionRegistry::new();

        assert!(registry.resolve_app_name(&id, &identity).is_err());
    }

    #[test]
    fn kill_marks_session_dead_with_reason() {
        let id = SessionId::new("s1");
        let registry = SessionRegistry::new();
        registry.observe(&id);
        assert!(registry.is_alive(&id));

        registry.kill(
            &id,
            KillReason::HandlerOnNonexistentResource {
                path: "/missing".into(),
            },
        );
        assert!(!registry.is_alive(&id));
        assert!(matches!(
            registry.kill_reason(&id),
            Some(KillReason::HandlerOnNonexistentResource { .. })
        ));
    }

    #[test]
    fn unknown_session_is_not_alive() {
        let registry = SessionRegistry::new();
        assert!(!registry.is_alive(&SessionId::new("nobody")));
    }

    #[test]
    fn first_kill_reason_sticks() {
        let id = SessionId::new("s1");
        let registry = SessionRegistry::new();
        registry.kill(
            &id,
            KillReason::NegativeBufferStart {
                path: "/a".into(),
                start_after: -1.0,
            },
        );
        registry.kill(
            &id,
            KillReason::HandlerOnNonexistentResource { path: "/b".into() },
        );
        assert!(matches!(
            registry.kill_reason(&id),
            Some(KillReason::NegativeBufferStart { .. })
        ));
    }
}
