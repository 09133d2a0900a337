//! The push engine (spec §4.4, component C4): type-check, coerce, fan
//! out a sample to handlers and downstream observations.

use std::collections::VecDeque;

use datahub_domain::value::{DataType, Sample, SampleValue};

use crate::tree::{with_resource, with_resource_mut, EntryRef, ResourceKind};

/// A push deferred because it re-entered a resource already mid-fan-out
/// (spec §5 "Suspension points": handlers must not recurse synchronously
/// into push for the same resource; implementations defer to the next
/// turn instead).
pub struct DeferredPush {
    pub entry: EntryRef,
    pub declared_type: DataType,
    pub value: SampleValue,
    pub raw_timestamp: f64,
    pub source_session: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    pub declared: DataType,
    pub resource: DataType,
}

/// The coercion table (spec §4.4 step 2): any type coerces into a `json`
/// resource by encoding; everything else requires an exact match.
pub fn coerce(declared: DataType, resource: DataType, value: &SampleValue) -> Option<SampleValue> {
    if declared == resource {
        return Some(value.clone());
    }
    if resource == DataType::Json {
        return Some(value.coerce_to_json());
    }
    None
}

/// Push `value` (declared as `declared_type`) into `entry`, fan out to
/// its handlers, and recurse into any downstream observations
/// (spec §4.4 steps 1–6). `now` is the wall-clock time to substitute for
/// a zero timestamp (spec §4.4 step 3); the caller resolves it once per
/// top-level API call so a push and its downstream recursion share one
/// instant.
///
/// Returns `Err` only for the session-terminating type mismatch of step
/// 1; everything else (re-entrant deferral, downstream fan-out) is
/// handled internally and always succeeds from the caller's point of
/// view.
pub fn push_into(
    entry: &EntryRef,
    declared_type: DataType,
    value: SampleValue,
    raw_timestamp: f64,
    now: f64,
    source_session: Option<&str>,
    deferred: &mut VecDeque<DeferredPush>,
) -> Result<(), TypeMismatch> {
    let (kind, existing_type, already_pushing) = with_resource(entry, |r| (r.kind, r.data_type, r.pushing))
        .expect("push_into called on a namespace entry");

    if already_pushing {
        deferred.push_back(DeferredPush {
            entry: entry.clone(),
            declared_type,
            value,
            raw_timestamp,
            source_session: source_session.map(str::to_string),
        });
        return Ok(());
    }

    let resource_type = existing_type.unwrap_or(declared_type);
    let coerced = if declared_type == resource_type {
        value
    } else if matches!(kind, ResourceKind::Input | ResourceKind::Output) {
        coerce(declared_type, resource_type, &value).ok_or(TypeMismatch {
            declared: declared_type,
            resource: resource_type,
        })?
    } else {
        // Placeholders and observations have no fixed type yet; they
        // simply track whatever was last pushed (spec §3).
        value
    };

    let timestamp = if raw_timestamp == 0.0 { now } else { raw_timestamp };
    let sample = Sample::new(timestamp, coerced.clone());
    let delivered_type = coerced.data_type();

    with_resource_mut(entry, |r| {
        r.pushing = true;
        r.current_value = Some(sample.clone());
        if matches!(kind, ResourceKind::Placeholder | ResourceKind::Observation) {
            r.data_type = Some(delivered_type);
        }
    });

    // Take the handler table out of the `RefCell` before invoking any
    // callback: a handler is free to call back into the hub (for a
    // *different* resource) without tripping a borrow panic here, and
    // the `pushing` flag set above is what actually catches same-resource
    // re-entry instead.
    let mut handlers = with_resource_mut(entry, |r| std::mem::take(&mut r.handlers)).unwrap();
    for slot in handlers.iter_mut() {
        if let Some(record) = &mut slot.record {
            if record.data_type == delivered_type || record.data_type == DataType::Trigger {
                record.callback.on_push(timestamp, &coerced);
            }
        }
    }
    with_resource_mut(entry, |r| r.handlers = handlers);

    let downstream = with_resource(entry, |r| r.downstream.clone()).unwrap_or_default();
    for obs in &downstream {
        let _ = push_into(obs, delivered_type, coerced.clone(), timestamp, now, source_session, deferred);
        with_resource_mut(obs, |r| {
            if let Some(buf) = &mut r.buffer {
                buf.append(sample.clone());
            }
        });
    }

    with_resource_mut(entry, |r| r.pushing = false);

    Ok(())
}

/// Drain the deferred-push queue one entry at a time, re-running
/// `push_into` for each. New deferrals discovered while draining are
/// appended to the same queue and processed in turn, so a chain of
/// re-entrant pushes resolves breadth-first across turns rather than
/// recursing.
pub fn drain_deferred(deferred: &mut VecDeque<DeferredPush>, now: f64) {
    while let Some(next) = deferred.pop_front() {
        let _ = push_into(
            &next.entry,
            next.declared_type,
            next.value,
            next.raw_timestamp,
            now,
            next.source_session.as_deref(),
            deferred,
        );
    }
}
