//! The handler registry (spec §4.5, component C5): per-resource,
//! generation-indexed slot table of client callbacks.
//!
//! A resource's handler list is stored directly on its `ResourceState`
//! (`tree::HandlerSlot`); this module is the free-function API that
//! operates on that table, shared by resource creation (placeholders
//! carry handlers across an upgrade) and session teardown (removing
//! every handler a dying session owns).

use datahub_domain::value::DataType;
use datahub_wire::{HandlerRef, PushHandler};

use crate::tree::{handler_ref, with_resource_mut, EntryRef, HandlerRecord, HandlerSlot};

/// Register `callback` on `entry` (spec §4.5). Reuses the first freed
/// slot so the table doesn't grow unboundedly under churn; a freed
/// slot's generation is bumped on every reuse so a stale `HandlerRef`
/// from before the reuse can never alias the new registration.
pub fn add_handler(
    entry: &EntryRef,
    session: String,
    data_type: DataType,
    callback: Box<dyn PushHandler>,
) -> HandlerRef {
    with_resource_mut(entry, |state| {
        let record = HandlerRecord {
            session,
            data_type,
            callback,
        };
        if let Some((slot, existing)) = state
            .handlers
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.record.is_none())
        {
            existing.record = Some(record);
            handler_ref(slot, existing.generation)
        } else {
            let slot = state.handlers.len();
            state.handlers.push(HandlerSlot {
                generation: 0,
                record: Some(record),
            });
            handler_ref(slot, 0)
        }
    })
    .expect("add_handler called on a namespace entry")
}

/// Remove a handler by opaque reference (spec §4.5 "double-remove is a
/// silent no-op"). Returns `true` if a live handler was actually
/// removed.
pub fn remove_handler(entry: &EntryRef, handler: HandlerRef) -> bool {
    with_resource_mut(entry, |state| {
        let Some(slot) = state.handlers.get_mut(handler.slot() as usize) else {
            return false;
        };
        if slot.generation != handler.generation() || slot.record.is_none() {
            return false;
        }
        slot.record = None;
        slot.generation = slot.generation.wrapping_add(1);
        true
    })
    .unwrap_or(false)
}

/// Remove every handler owned by `session` across `entry`'s table
/// (spec §4.5 "When a client session ends, all of its handlers are
/// removed"). Returns the count removed.
pub fn remove_session_handlers(entry: &EntryRef, session: &str) -> usize {
    with_resource_mut(entry, |state| {
        let mut removed = 0;
        for slot in &mut state.handlers {
            if let Some(record) = &slot.record {
                if record.session == session {
                    slot.record = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    removed += 1;
                }
            }
        }
        removed
    })
    .unwrap_or(0)
}

pub fn handler_count(entry: &EntryRef) -> usize {
    with_resource_mut(entry, |state| {
        state.handlers.iter().filter(|s| s.record.is_some()).count()
    })
    .unwrap_or(0)
}
