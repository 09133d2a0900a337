//! App-name resolution for newly seen sessions (spec §4.2, §6: "app-name/
//! process-ID lookup service" — an external collaborator named but not
//! specified by the core). This crate only defines the boundary trait; a
//! real deployment backs it with IPC credentials or a PID lookup.

use std::collections::HashMap;

use crate::SessionId;

/// Raised when the identity service rejects a session outright (spec §4.2
/// "Failure: if the identity service rejects the session, the session is
/// terminated").
#[derive(Debug, Clone, thiserror::Error)]
#[error("identity service rejected session {0:?}")]
pub struct IdentityRejected(pub SessionId);

/// Resolves an IPC session to the app name that owns its `/app/<name>`
/// subtree (spec §4.2).
pub trait IdentityService: Send + Sync {
    fn resolve_app_name(&self, session: &SessionId) -> Result<String, IdentityRejected>;
}

/// A fixed session-id → app-name table, for tests and embedders that
/// already know every client up front.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    map: HashMap<SessionId, String>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, session: SessionId, app_name: impl Into<String>) -> Self {
        self.map.insert(session, app_name.into());
        self
    }
}

impl IdentityService for StaticIdentity {
    fn resolve_app_name(&self, session: &SessionId) -> Result<String, IdentityRejected> {
        self.map
            .get(session)
            .cloned()
            .ok_or_else(|| IdentityRejected(session.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_session() {
        let id = SessionId::new("s1");
        let identity = StaticIdentity::new().with(id.clone(), "sensor-gw");
        assert_eq!(identity.resolve_app_name(&id).unwrap(), "sensor-gw");
    }

    #[test]
    fn rejects_unknown_session() {
        let identity = StaticIdentity::new();
        assert!(identity.resolve_app_name(&SessionId::new("ghost")).is_err());
    }
}
