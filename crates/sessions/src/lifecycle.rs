//! Session termination (spec §7, band 2: contract violations by the
//! client). Unlike the wire-level codes in `datahub_wire`, a `KillReason`
//! is never returned from a call — the session is torn down and the
//! reason is recorded for whatever owns the IPC connection to observe and
//! close the socket (spec §6.2: "'Kill the client' is not a returned code
//! — it is an IPC session-termination side effect").

use datahub_domain::value::DataType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KillReason {
    #[error("identity service rejected this session")]
    IdentityRejected,

    #[error("push to nonexistent resource {path}")]
    PushToNonexistentResource { path: String },

    #[error("push to {path}: declared type {declared} is not {resource} and not coercible")]
    PushTypeMismatch {
        path: String,
        declared: DataType,
        resource: DataType,
    },

    #[error("set_default on {path}: value type {declared} does not match resource type {resource}")]
    DefaultTypeMismatch {
        path: String,
        declared: DataType,
        resource: DataType,
    },

    #[error("push handler registered on nonexistent resource {path}")]
    HandlerOnNonexistentResource { path: String },

    #[error("read_buffer_json on {path}: negative start_after ({start_after})")]
    NegativeBufferStart { path: String, start_after: f64 },
}
