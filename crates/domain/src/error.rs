//! Band-3 errors (spec §7): implementation-invariant violations.
//!
//! Everything else — caller-reported codes (band 1) and session
//! termination (band 2) — is handled without panicking; see
//! `datahub_wire::WireError` and `datahub_sessions::KillReason`
//! respectively. A `HubFault` means the tree itself is no longer
//! trustworthy (an entry claims a kind the `match` didn't expect, a
//! parent link points at a freed node) and the process should abort
//! under supervision rather than keep serving requests against
//! corrupted state.
#[derive(thiserror::Error, Debug)]
pub enum HubFault {
    #[error("unreachable entry kind encountered during dispatch: {0}")]
    UnexpectedKind(String),

    #[error("parent link for entry {0:?} does not resolve")]
    DanglingParent(String),

    #[error("resource tree invariant violated: {0}")]
    InvariantViolated(String),
}
