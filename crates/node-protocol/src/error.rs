//! The wire-level error taxonomy (spec §6.2, band 1 of §7): codes an IPC
//! framing layer would marshal back to the caller. Killing the client is
//! deliberately *not* a variant here — it is a session-termination side
//! effect (see `datahub_sessions::KillReason`), never a returned code.

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("duplicate")]
    Duplicate,
    #[error("no-memory")]
    NoMemory,
    #[error("not-found")]
    NotFound,
    #[error("unavailable")]
    Unavailable,
    #[error("unsupported")]
    Unsupported,
    #[error("format-error")]
    FormatError,
    #[error("overflow")]
    Overflow,
}

pub type WireResult<T> = Result<T, WireError>;
