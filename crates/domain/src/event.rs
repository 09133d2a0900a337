//! Structured events emitted at every state transition (spec §10.2).
//!
//! Mirrors the teacher's `TraceEvent`: a single `#[serde(tag = "event")]`
//! enum, logged as one structured `tracing` line per occurrence, so a
//! downstream collector gets a flat, greppable audit trail without the hub
//! depending on that collector's wire format.

use serde::Serialize;

use crate::value::DataType;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum HubEvent {
    EntryCreated {
        path: String,
        kind: &'static str,
    },
    EntryUpgraded {
        path: String,
        from: &'static str,
        to: &'static str,
    },
    EntryDeleted {
        path: String,
    },
    EntryDegradedToPlaceholder {
        path: String,
    },
    Pushed {
        path: String,
        data_type: DataType,
        timestamp: f64,
        /// Routing metadata only — not part of the `Sample` value itself
        /// (spec §11 "push source attribution").
        source_session: Option<String>,
    },
    HandlerRegistered {
        path: String,
        data_type: DataType,
    },
    HandlerRemoved {
        path: String,
    },
    SessionTerminated {
        session: String,
        reason: String,
    },
    BufferDumpStarted {
        path: String,
        samples: usize,
    },
    BufferDumpFailed {
        path: String,
        reason: String,
    },
}

impl HubEvent {
    /// Emit this event as one structured `tracing` line.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            HubEvent::SessionTerminated { .. } | HubEvent::BufferDumpFailed { .. } => {
                tracing::warn!(hub_event = %json, "datahub_event")
            }
            _ => tracing::info!(hub_event = %json, "datahub_event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = HubEvent::EntryCreated {
            path: "/app/a/x".into(),
            kind: "input",
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "EntryCreated");
        assert_eq!(json["path"], "/app/a/x");
    }
}
