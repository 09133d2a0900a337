//! Wire-level vocabulary shared between the resource tree and whatever IPC
//! framing layer sits in front of it (spec §1: that framing layer, and the
//! identity/config/telemetry services around it, are external collaborators
//! this crate only defines interfaces for — it carries none of their
//! transport logic).

pub mod error;
pub mod handler;
pub mod json;
pub mod ref_id;

pub use error::{WireError, WireResult};
pub use handler::{CompletionResult, DumpCompletion, PushHandler};
pub use ref_id::HandlerRef;
