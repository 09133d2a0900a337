//! The Data Hub facade (spec §6.1): the single entry point an IPC framing
//! layer calls into for every I/O and query operation. It ties the
//! resource tree (`tree`), resource lifecycle (`resource`), push engine
//! (`push`), handler registry (`handlers`), and observation buffers
//! (`observation`) together with the client session namespace
//! (`datahub_sessions`, component C7).
//!
//! Every method here runs to completion on the single cooperative
//! executor described in spec §5 — there is no internal locking because
//! there is nothing to lock against.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use datahub_domain::value::{DataType, Sample, SampleValue};
use datahub_domain::{HubConfig, HubEvent};
use datahub_sessions::{IdentityService, KillReason, SessionId, SessionRegistry};
use datahub_wire::{CompletionResult, DumpCompletion, HandlerRef, PushHandler, WireError, WireResult};

use crate::handlers;
use crate::observation::AggregateKind;
use crate::push::{self, DeferredPush};
use crate::resource::{self, CreateOutcome, SetDefaultOutcome};
use crate::tree::{walk_all, EntryRef, ResourceKind, ResourceTree};

fn wall_clock_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub struct DataHub {
    tree: ResourceTree,
    sessions: SessionRegistry,
    identity: Box<dyn IdentityService>,
    config: HubConfig,
    deferred: RefCell<VecDeque<DeferredPush>>,
    push_depth: Cell<u32>,
    clock: Box<dyn Fn() -> f64>,
}

impl DataHub {
    pub fn new(identity: Box<dyn IdentityService>, config: HubConfig) -> Self {
        Self {
            tree: ResourceTree::new(),
            sessions: SessionRegistry::new(),
            identity,
            config,
            deferred: RefCell::new(VecDeque::new()),
            push_depth: Cell::new(0),
            clock: Box::new(wall_clock_now),
        }
    }

    /// Build a hub with an injected clock, for tests that need a fixed or
    /// scripted "now" instead of the wall clock.
    pub fn with_clock(
        identity: Box<dyn IdentityService>,
        config: HubConfig,
        clock: impl Fn() -> f64 + 'static,
    ) -> Self {
        Self {
            clock: Box::new(clock),
            ..Self::new(identity, config)
        }
    }

    fn now(&self) -> f64 {
        (self.clock)()
    }

    /// Non-destructively read back a session's termination reason, if the
    /// IPC layer is polling to decide whether to close the socket (spec
    /// §6.2: "kill" is a side effect, not a returned code).
    pub fn take_kill_reason(&self, session: &SessionId) -> Option<KillReason> {
        self.sessions.kill_reason(session)
    }

    pub fn is_session_alive(&self, session: &SessionId) -> bool {
        self.sessions.is_alive(session)
    }

    // ── Client session namespace (C7, spec §4.2) ───────────────────────

    /// Resolve `session`'s `/app/<name>` namespace entry, consulting the
    /// identity service on first access. Kills the session and returns
    /// `Err` if identity rejects it.
    fn app_namespace(&self, session: &SessionId) -> Result<EntryRef, ()> {
        match self.sessions.resolve_app_name(session, self.identity.as_ref()) {
            Ok(app_name) => {
                let root = self.tree.root();
                let app_root = crate::tree::get_or_create_namespace(&root, "app");
                Ok(crate::tree::get_or_create_namespace(&app_root, &app_name))
            }
            Err(_) => {
                self.sessions.kill(session, KillReason::IdentityRejected);
                Err(())
            }
        }
    }

    fn resolve_query_entry(&self, session: &SessionId, path: &str) -> WireResult<EntryRef> {
        if let Some(segments) = datahub_domain::path::split_absolute(path) {
            return resource::resolve_existing(&self.tree.root(), &segments);
        }
        let segments = datahub_domain::path::split_relative(path).ok_or(WireError::Unsupported)?;
        let app_ns = self.app_namespace(session).map_err(|_| WireError::Unavailable)?;
        resource::resolve_existing(&app_ns, &segments)
    }

    fn check_capacity(&self, creating_new: bool) -> WireResult<()> {
        if !creating_new {
            return Ok(());
        }
        if let Some(max) = self.config.limits.max_entries {
            if self.tree.entry_count() >= max {
                return Err(WireError::NoMemory);
            }
        }
        Ok(())
    }

    // ── I/O service: resource lifecycle (spec §4.3) ────────────────────

    fn create_resource(
        &self,
        session: &SessionId,
        path: &str,
        direction: ResourceKind,
        data_type: DataType,
        units: &str,
    ) -> WireResult<()> {
        let app_ns = self.app_namespace(session).map_err(|_| WireError::Unavailable)?;
        let segments = datahub_domain::path::split_relative(path).ok_or(WireError::Unsupported)?;
        let already_exists = crate::tree::find(&app_ns, &segments).is_some();
        self.check_capacity(!already_exists)?;

        let (entry, outcome) =
            resource::create_io(&app_ns, &segments, direction, data_type, units, session.as_str())?;

        if outcome == CreateOutcome::Created {
            HubEvent::EntryCreated {
                path: crate::tree::Entry::path(&entry),
                kind: direction.as_str(),
            }
            .emit();
        }
        Ok(())
    }

    pub fn create_input(
        &self,
        session: &SessionId,
        path: &str,
        data_type: DataType,
        units: &str,
    ) -> WireResult<()> {
        self.create_resource(session, path, ResourceKind::Input, data_type, units)
    }

    pub fn create_output(
        &self,
        session: &SessionId,
        path: &str,
        data_type: DataType,
        units: &str,
    ) -> WireResult<()> {
        self.create_resource(session, path, ResourceKind::Output, data_type, units)
    }

    pub fn delete_resource(&self, session: &SessionId, path: &str) -> WireResult<()> {
        let app_ns = self.app_namespace(session).map_err(|_| WireError::Unavailable)?;
        let segments = datahub_domain::path::split_relative(path).ok_or(WireError::Unsupported)?;
        if let Some(entry) = crate::tree::find(&app_ns, &segments) {
            let logged_path = crate::tree::Entry::path(&entry);
            resource::delete_io(&entry);
            HubEvent::EntryDeleted { path: logged_path }.emit();
        }
        Ok(())
    }

    pub fn mark_optional(&self, session: &SessionId, path: &str) -> WireResult<()> {
        let app_ns = self.app_namespace(session).map_err(|_| WireError::Unavailable)?;
        let segments = datahub_domain::path::split_relative(path).ok_or(WireError::Unsupported)?;
        let entry = resource::resolve_existing(&app_ns, &segments)?;
        resource::mark_optional(&entry)
    }

    fn set_default_typed(
        &self,
        session: &SessionId,
        path: &str,
        declared_type: DataType,
        value: SampleValue,
    ) -> WireResult<()> {
        let app_ns = self.app_namespace(session).map_err(|_| WireError::Unavailable)?;
        let segments = datahub_domain::path::split_relative(path).ok_or(WireError::Unsupported)?;
        let entry = resource::resolve_existing(&app_ns, &segments)?;
        let resource_type = crate::tree::with_resource(&entry, |r| r.data_type).flatten();

        match resource::set_default(&entry, declared_type, Sample::new(0.0, value)) {
            SetDefaultOutcome::Set | SetDefaultOutcome::IgnoredAlreadySet => Ok(()),
            SetDefaultOutcome::TypeMismatch => {
                self.sessions.kill(
                    session,
                    KillReason::DefaultTypeMismatch {
                        path: path.to_string(),
                        declared: declared_type,
                        resource: resource_type.unwrap_or(declared_type),
                    },
                );
                Ok(())
            }
        }
    }

    pub fn set_bool_default(&self, session: &SessionId, path: &str, value: bool) -> WireResult<()> {
        self.set_default_typed(session, path, DataType::Bool, SampleValue::Bool(value))
    }

    pub fn set_numeric_default(&self, session: &SessionId, path: &str, value: f64) -> WireResult<()> {
        self.set_default_typed(session, path, DataType::Numeric, SampleValue::Numeric(value))
    }

    pub fn set_string_default(&self, session: &SessionId, path: &str, value: String) -> WireResult<()> {
        self.set_default_typed(session, path, DataType::String, SampleValue::String(value))
    }

    pub fn set_json_default(&self, session: &SessionId, path: &str, value: String) -> WireResult<()> {
        self.set_default_typed(session, path, DataType::Json, SampleValue::Json(value))
    }

    // ── I/O service: push engine (spec §4.4) ───────────────────────────

    /// Run one push through the engine, tracking re-entrancy across the
    /// whole hub rather than just one call to `push::push_into` (spec §5
    /// "Suspension points"). A handler invoked mid-fan-out is free to call
    /// back into `DataHub::push*` for a different resource, or even defer
    /// into the same one, without this ever taking two overlapping
    /// mutable borrows of `self.deferred`.
    fn run_push(
        &self,
        entry: &EntryRef,
        path: &str,
        declared_type: DataType,
        value: SampleValue,
        raw_timestamp: f64,
        session: &SessionId,
    ) {
        self.push_depth.set(self.push_depth.get() + 1);
        let now = self.now();

        let mut local = std::mem::take(&mut *self.deferred.borrow_mut());
        let result = push::push_into(entry, declared_type, value, raw_timestamp, now, Some(session.as_str()), &mut local);
        self.deferred.borrow_mut().extend(local);

        if let Err(mismatch) = result {
            self.sessions.kill(
                session,
                KillReason::PushTypeMismatch {
                    path: path.to_string(),
                    declared: mismatch.declared,
                    resource: mismatch.resource,
                },
            );
        } else if self.config.observability.log_pushes {
            HubEvent::Pushed {
                path: path.to_string(),
                data_type: declared_type,
                timestamp: if raw_timestamp == 0.0 { now } else { raw_timestamp },
                source_session: Some(session.as_str().to_string()),
            }
            .emit();
        }

        let depth = self.push_depth.get() - 1;
        self.push_depth.set(depth);
        if depth == 0 {
            self.drain_deferred();
        }
    }

    /// Drain deferred re-entrant pushes breadth-first, accumulating any
    /// further deferrals the same way `run_push` does, until the queue is
    /// empty (spec §5: resolves across turns rather than recursing).
    fn drain_deferred(&self) {
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some(next) = next else { break };
            let now = self.now();
            let mut local = std::mem::take(&mut *self.deferred.borrow_mut());
            let _ = push::push_into(
                &next.entry,
                next.declared_type,
                next.value,
                next.raw_timestamp,
                now,
                next.source_session.as_deref(),
                &mut local,
            );
            self.deferred.borrow_mut().extend(local);
        }
    }

    fn push_typed(
        &self,
        session: &SessionId,
        path: &str,
        declared_type: DataType,
        value: SampleValue,
        timestamp: f64,
    ) {
        let Ok(app_ns) = self.app_namespace(session) else {
            return;
        };
        let Some(segments) = datahub_domain::path::split_relative(path) else {
            return;
        };
        let Some(entry) = crate::tree::find(&app_ns, &segments) else {
            self.sessions.kill(
                session,
                KillReason::PushToNonexistentResource { path: path.to_string() },
            );
            return;
        };
        self.run_push(&entry, path, declared_type, value, timestamp, session);
    }

    pub fn push_trigger(&self, session: &SessionId, path: &str, timestamp: f64) {
        self.push_typed(session, path, DataType::Trigger, SampleValue::Trigger, timestamp);
    }

    pub fn push_bool(&self, session: &SessionId, path: &str, value: bool, timestamp: f64) {
        self.push_typed(session, path, DataType::Bool, SampleValue::Bool(value), timestamp);
    }

    pub fn push_numeric(&self, session: &SessionId, path: &str, value: f64, timestamp: f64) {
        self.push_typed(session, path, DataType::Numeric, SampleValue::Numeric(value), timestamp);
    }

    pub fn push_string(&self, session: &SessionId, path: &str, value: String, timestamp: f64) {
        self.push_typed(session, path, DataType::String, SampleValue::String(value), timestamp);
    }

    pub fn push_json(&self, session: &SessionId, path: &str, value: String, timestamp: f64) {
        self.push_typed(session, path, DataType::Json, SampleValue::Json(value), timestamp);
    }

    // ── Handler registry (spec §4.5) ───────────────────────────────────

    /// Register a push handler on `path` (absolute or app-relative).
    /// Walks the path, creating namespaces as needed, exactly like a
    /// producer creating a resource would — a consumer is allowed to
    /// arrive before the producer (spec §4.5 "permitted on a
    /// namespace/placeholder"). Kills the session only when the path
    /// itself can't be walked (an intermediate segment is already a
    /// leaf resource).
    pub fn add_push_handler(
        &self,
        session: &SessionId,
        path: &str,
        data_type: DataType,
        callback: Box<dyn PushHandler>,
    ) -> Option<HandlerRef> {
        let segments = if let Some(abs) = datahub_domain::path::split_absolute(path) {
            (self.tree.root(), abs)
        } else {
            let app_ns = self.app_namespace(session).ok()?;
            (app_ns, datahub_domain::path::split_relative(path)?)
        };

        match crate::tree::walk_or_create(&segments.0, &segments.1) {
            Ok(entry) => {
                crate::tree::ensure_placeholder(&entry);
                if let Some(max) = self.config.limits.max_handlers_per_resource {
                    if handlers::handler_count(&entry) >= max {
                        return None;
                    }
                }
                let handler_ref = handlers::add_handler(&entry, session.as_str().to_string(), data_type, callback);
                HubEvent::HandlerRegistered {
                    path: crate::tree::Entry::path(&entry),
                    data_type,
                }
                .emit();
                Some(handler_ref)
            }
            Err(_) => {
                self.sessions.kill(
                    session,
                    KillReason::HandlerOnNonexistentResource { path: path.to_string() },
                );
                None
            }
        }
    }

    pub fn remove_push_handler(&self, session: &SessionId, path: &str, handler: HandlerRef) -> bool {
        let Ok(entry) = self.resolve_query_entry(session, path) else {
            return false;
        };
        let removed = handlers::remove_handler(&entry, handler);
        if removed {
            HubEvent::HandlerRemoved {
                path: crate::tree::Entry::path(&entry),
            }
            .emit();
        }
        removed
    }

    /// Poll handlers are part of the declared wire surface but never fire
    /// in this implementation (spec §11 supplement: poll-driven delivery
    /// is superseded by the push model everywhere in this core). Kept so
    /// a client using the full API doesn't see an unknown call; logged and
    /// reported as success without registering anything, per spec.md §6.1.
    pub fn add_poll_handler(&self, _session: &SessionId, path: &str, interval_secs: f64) -> Option<HandlerRef> {
        tracing::debug!(path, interval_secs, "add_poll_handler: no-op, poll delivery is unimplemented");
        None
    }

    pub fn remove_poll_handler(&self, _session: &SessionId, path: &str, _handler: HandlerRef) -> bool {
        tracing::debug!(path, "remove_poll_handler: no-op, poll delivery is unimplemented");
        true
    }

    // ── Query service (spec §6.1): typed reads ─────────────────────────

    fn get_typed(&self, session: &SessionId, path: &str, expected: DataType) -> WireResult<Sample> {
        let entry = self.resolve_query_entry(session, path)?;
        resource::get_typed(&entry, expected)
    }

    pub fn get_bool(&self, session: &SessionId, path: &str) -> WireResult<(f64, bool)> {
        let sample = self.get_typed(session, path, DataType::Bool)?;
        match sample.value() {
            SampleValue::Bool(b) => Ok((sample.timestamp(), *b)),
            _ => Err(WireError::FormatError),
        }
    }

    pub fn get_numeric(&self, session: &SessionId, path: &str) -> WireResult<(f64, f64)> {
        let sample = self.get_typed(session, path, DataType::Numeric)?;
        match sample.value() {
            SampleValue::Numeric(n) => Ok((sample.timestamp(), *n)),
            _ => Err(WireError::FormatError),
        }
    }

    pub fn get_string(&self, session: &SessionId, path: &str) -> WireResult<(f64, String)> {
        let sample = self.get_typed(session, path, DataType::String)?;
        match sample.value() {
            SampleValue::String(s) => Ok((sample.timestamp(), s.clone())),
            _ => Err(WireError::FormatError),
        }
    }

    pub fn get_json(&self, session: &SessionId, path: &str) -> WireResult<(f64, String)> {
        let sample = self.get_typed(session, path, DataType::Json)?;
        match sample.value() {
            SampleValue::Json(raw) => Ok((sample.timestamp(), raw.clone())),
            _ => Err(WireError::FormatError),
        }
    }

    pub fn get_timestamp(&self, session: &SessionId, path: &str) -> WireResult<f64> {
        let entry = self.resolve_query_entry(session, path)?;
        resource::get_timestamp(&entry)
    }

    pub fn get_data_type(&self, session: &SessionId, path: &str) -> WireResult<DataType> {
        let entry = self.resolve_query_entry(session, path)?;
        resource::get_data_type(&entry)
    }

    pub fn get_units(&self, session: &SessionId, path: &str, max_len: Option<usize>) -> WireResult<String> {
        let entry = self.resolve_query_entry(session, path)?;
        resource::get_units(&entry, max_len)
    }

    // ── Query service: observation buffers (spec §4.6) ─────────────────

    fn observation_entry(&self, session: &SessionId, path: &str) -> WireResult<EntryRef> {
        let entry = self.resolve_query_entry(session, path)?;
        let is_observation =
            crate::tree::with_resource(&entry, |r| r.kind == ResourceKind::Observation).unwrap_or(false);
        if is_observation {
            Ok(entry)
        } else {
            Err(WireError::Unsupported)
        }
    }

    /// `read_buffer_json` (spec §4.6, §6.3). Negative `start_after` is a
    /// session-termination trigger, not a wire error (spec §8 boundary
    /// scenario); `completion` is invoked once, synchronously, since this
    /// core computes the dump in place rather than streaming it — the
    /// asynchrony spec §5 describes belongs to whatever IPC layer writes
    /// the bytes out over the wire.
    pub fn read_buffer_json(
        &self,
        session: &SessionId,
        path: &str,
        start_after: f64,
        mut completion: Option<Box<dyn DumpCompletion>>,
    ) -> WireResult<serde_json::Value> {
        let entry = self.observation_entry(session, path)?;
        let now = self.now();

        let Some(effective_start) = crate::observation::ObservationBuffer::resolve_start(start_after, now) else {
            self.sessions.kill(
                session,
                KillReason::NegativeBufferStart {
                    path: path.to_string(),
                    start_after,
                },
            );
            if let Some(cb) = completion.as_mut() {
                cb.on_complete(CompletionResult::Failed);
            }
            return Err(WireError::Unavailable);
        };

        let (dump, sample_count) = crate::tree::with_resource(&entry, |r| {
            r.buffer.as_ref().map(|b| (b.to_json(effective_start), b.len()))
        })
        .flatten()
        .ok_or(WireError::Unsupported)?;

        HubEvent::BufferDumpStarted {
            path: crate::tree::Entry::path(&entry),
            samples: sample_count,
        }
        .emit();

        if let Some(cb) = completion.as_mut() {
            cb.on_complete(CompletionResult::Ok);
        }
        Ok(dump)
    }

    fn get_aggregate(&self, session: &SessionId, path: &str, start_after: f64, kind: AggregateKind) -> WireResult<f64> {
        let entry = self.observation_entry(session, path)?;
        let now = self.now();
        let effective_start =
            crate::observation::ObservationBuffer::resolve_start(start_after, now).unwrap_or(f64::NEG_INFINITY);

        crate::tree::with_resource(&entry, |r| {
            r.buffer
                .as_ref()
                .map(|b| compute_aggregate(b, kind, effective_start, self.config.buffer.aggregates_enabled))
        })
        .flatten()
        .ok_or(WireError::Unsupported)
    }

    pub fn get_min(&self, session: &SessionId, path: &str, start_after: f64) -> WireResult<f64> {
        self.get_aggregate(session, path, start_after, AggregateKind::Min)
    }

    pub fn get_max(&self, session: &SessionId, path: &str, start_after: f64) -> WireResult<f64> {
        self.get_aggregate(session, path, start_after, AggregateKind::Max)
    }

    pub fn get_mean(&self, session: &SessionId, path: &str, start_after: f64) -> WireResult<f64> {
        self.get_aggregate(session, path, start_after, AggregateKind::Mean)
    }

    pub fn get_stddev(&self, session: &SessionId, path: &str, start_after: f64) -> WireResult<f64> {
        self.get_aggregate(session, path, start_after, AggregateKind::Stddev)
    }

    // ── Configuration boundary: observation wiring (spec §1, §4.6) ─────

    /// Bind an observation at `observation_path` (absolute) to
    /// `upstream_path` (absolute), creating both as needed. This is the
    /// boundary the persisted-config loader (an external collaborator,
    /// spec §1) calls at startup or on a config reload — it is not part
    /// of the client-facing wire surface.
    pub fn configure_observation(
        &self,
        observation_path: &str,
        upstream_path: &str,
        capacity: usize,
    ) -> WireResult<()> {
        let root = self.tree.root();
        let obs_segments = datahub_domain::path::split_absolute(observation_path).ok_or(WireError::Unsupported)?;
        let upstream_segments = datahub_domain::path::split_absolute(upstream_path).ok_or(WireError::Unsupported)?;

        let obs_entry = crate::tree::walk_or_create(&root, &obs_segments).map_err(|_| WireError::Unsupported)?;
        let upstream_entry =
            crate::tree::walk_or_create(&root, &upstream_segments).map_err(|_| WireError::Unsupported)?;

        // `upgrade_to_resource` only accepts a `Namespace` or `Placeholder`
        // entry; anything else is a normal wire-level outcome here, not an
        // invariant violation, since this call runs again on every config
        // reload (spec §1). A prior `Observation` at this path is an
        // idempotent reconfigure; an existing Input/Output is a genuine
        // name collision.
        let existing_kind = crate::tree::with_resource(&obs_entry, |r| r.kind);
        match existing_kind {
            None | Some(ResourceKind::Placeholder) => {
                let upstream_type = crate::tree::with_resource(&upstream_entry, |r| r.data_type).flatten();
                // `upgrade_to_resource` can only fail when called on a
                // non-`Placeholder` resource, which this arm already rules
                // out; a failure here means the tree is corrupted (band 3,
                // spec §7), not an ordinary wire outcome.
                crate::tree::upgrade_to_resource(
                    &obs_entry,
                    ResourceKind::Observation,
                    upstream_type.unwrap_or(DataType::Json),
                    String::new(),
                )
                .unwrap_or_else(|fault| panic!("{fault}"));
            }
            Some(ResourceKind::Observation) => {
                // Already configured; a reload may rebind its upstream and
                // capacity below without touching the tree shape again.
            }
            Some(ResourceKind::Input | ResourceKind::Output) => return Err(WireError::Duplicate),
        }
        crate::tree::with_resource_mut(&obs_entry, |r| {
            r.buffer = Some(crate::observation::ObservationBuffer::new(capacity));
        });
        crate::tree::ensure_placeholder(&upstream_entry);
        crate::tree::with_resource_mut(&upstream_entry, |r| r.downstream.push(obs_entry.clone()));

        HubEvent::EntryCreated {
            path: crate::tree::Entry::path(&obs_entry),
            kind: "observation",
        }
        .emit();
        Ok(())
    }

    // ── Client session namespace: teardown (spec §4.2, §4.5) ───────────

    /// Tear a session down: remove every handler it owns anywhere in the
    /// tree, destroy every producer-owned resource it created, and prune
    /// the namespaces that go empty as a result (spec §3 "destroyed ...
    /// when their owning client session ends (producer-owned resources
    /// only)").
    pub fn end_session(&self, session: &SessionId, reason: KillReason) {
        self.sessions.kill(session, reason.clone());
        let root = self.tree.root();

        let mut owned = Vec::new();
        walk_all(&root, &mut |entry| {
            if crate::tree::with_resource(entry, |r| r.owner_session.as_deref() == Some(session.as_str()))
                .unwrap_or(false)
            {
                owned.push(entry.clone());
            }
            handlers::remove_session_handlers(entry, session.as_str());
        });

        for entry in owned {
            let parent = entry.borrow().parent();
            resource::delete_io(&entry);
            if let Some(parent) = parent {
                crate::tree::prune_empty_namespaces(&parent);
            }
        }

        HubEvent::SessionTerminated {
            session: session.as_str().to_string(),
            reason: reason.to_string(),
        }
        .emit();
    }

    pub fn observe_session(&self, session: &SessionId) {
        self.sessions.observe(session);
    }
}

#[cfg(feature = "aggregates")]
fn compute_aggregate(
    buf: &crate::observation::ObservationBuffer,
    kind: AggregateKind,
    effective_start: f64,
    enabled: bool,
) -> f64 {
    if enabled {
        buf.aggregate(kind, effective_start)
    } else {
        f64::NAN
    }
}

#[cfg(not(feature = "aggregates"))]
fn compute_aggregate(
    _buf: &crate::observation::ObservationBuffer,
    _kind: AggregateKind,
    _effective_start: f64,
    _enabled: bool,
) -> f64 {
    f64::NAN
}

#[cfg(test)]
mod tests {
    use super::*;
    use datahub_sessions::StaticIdentity;

    fn hub_for(session: &SessionId) -> DataHub {
        let identity = StaticIdentity::new().with(session.clone(), "A".to_string());
        DataHub::with_clock(Box::new(identity), HubConfig::default(), || 1_000.0)
    }

    #[test]
    fn create_input_then_push_then_get_round_trips() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "temp", DataType::Numeric, "C").unwrap();
        hub.push_numeric(&session, "temp", 21.5, 0.0);
        assert!(hub.is_session_alive(&session));
        let (ts, v) = hub.get_numeric(&session, "/app/A/temp").unwrap();
        assert_eq!(ts, 1_000.0);
        assert_eq!(v, 21.5);
    }

    #[test]
    fn push_to_missing_resource_kills_session() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.push_bool(&session, "ghost", true, 0.0);
        assert!(!hub.is_session_alive(&session));
        assert!(matches!(
            hub.take_kill_reason(&session),
            Some(KillReason::PushToNonexistentResource { .. })
        ));
    }

    #[test]
    fn duplicate_create_with_same_shape_is_idempotent() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "temp", DataType::Numeric, "C").unwrap();
        hub.create_input(&session, "temp", DataType::Numeric, "C").unwrap();
    }

    #[test]
    fn duplicate_create_with_different_type_is_wire_error() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "temp", DataType::Numeric, "C").unwrap();
        let err = hub.create_input(&session, "temp", DataType::Bool, "C").unwrap_err();
        assert_eq!(err, WireError::Duplicate);
    }

    #[test]
    fn type_mismatch_push_kills_session() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "flag", DataType::Bool, "").unwrap();
        hub.push_string(&session, "flag", "x".to_string(), 0.0);
        assert!(matches!(
            hub.take_kill_reason(&session),
            Some(KillReason::PushTypeMismatch { .. })
        ));
    }

    #[test]
    fn observation_dump_reflects_configured_capacity() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "in", DataType::Numeric, "").unwrap();
        hub.configure_observation("/obs/o", "/app/A/in", 3).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0] {
            hub.push_numeric(&session, "in", v, v);
        }
        let dump = hub.read_buffer_json(&session, "/obs/o", f64::NAN, None).unwrap();
        assert_eq!(
            dump,
            serde_json::json!([
                {"t": 2.0, "v": 2.0},
                {"t": 3.0, "v": 3.0},
                {"t": 4.0, "v": 4.0},
            ])
        );
    }

    #[test]
    fn reconfiguring_the_same_observation_path_is_idempotent() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "in", DataType::Numeric, "").unwrap();
        hub.configure_observation("/obs/o", "/app/A/in", 3).unwrap();
        // A config reload re-running the same binding must not panic or
        // be treated as tree corruption.
        hub.configure_observation("/obs/o", "/app/A/in", 5).unwrap();
        hub.push_numeric(&session, "in", 1.0, 1.0);
        let dump = hub.read_buffer_json(&session, "/obs/o", f64::NAN, None).unwrap();
        assert_eq!(dump, serde_json::json!([{"t": 1.0, "v": 1.0}]));
    }

    #[test]
    fn configuring_observation_over_existing_input_is_wire_error() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "collide", DataType::Numeric, "").unwrap();
        let err = hub
            .configure_observation("/app/A/collide", "/app/A/collide", 3)
            .unwrap_err();
        assert_eq!(err, WireError::Duplicate);
    }

    #[test]
    fn negative_start_after_kills_session() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "in", DataType::Numeric, "").unwrap();
        hub.configure_observation("/obs/o", "/app/A/in", 4).unwrap();
        let err = hub.read_buffer_json(&session, "/obs/o", -1.0, None).unwrap_err();
        assert_eq!(err, WireError::Unavailable);
        assert!(matches!(
            hub.take_kill_reason(&session),
            Some(KillReason::NegativeBufferStart { .. })
        ));
    }

    #[test]
    fn set_default_ignored_once_already_set() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_output(&session, "setpoint", DataType::Numeric, "").unwrap();
        hub.set_numeric_default(&session, "setpoint", 10.0).unwrap();
        hub.set_numeric_default(&session, "setpoint", 20.0).unwrap();
        assert!(hub.is_session_alive(&session));
        let default = crate::tree::find(&hub.app_namespace(&session).unwrap(), &["setpoint"])
            .and_then(|e| crate::tree::with_resource(&e, |r| r.default_value.clone()))
            .flatten()
            .unwrap();
        assert_eq!(default.value(), &SampleValue::Numeric(10.0));
    }

    #[test]
    fn handler_fires_and_can_be_removed() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "btn", DataType::Trigger, "").unwrap();
        let fired = std::rc::Rc::new(std::cell::RefCell::new(0u32));
        let fired_cb = fired.clone();
        let handler = hub
            .add_push_handler(
                &session,
                "/app/A/btn",
                DataType::Trigger,
                Box::new(move |_t: f64, _v: &SampleValue| {
                    *fired_cb.borrow_mut() += 1;
                }),
            )
            .unwrap();
        hub.push_trigger(&session, "btn", 0.0);
        assert_eq!(*fired.borrow(), 1);
        assert!(hub.remove_push_handler(&session, "/app/A/btn", handler));
        hub.push_trigger(&session, "btn", 0.0);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn session_end_removes_owned_resources_and_handlers() {
        let session = SessionId::new("s1");
        let hub = hub_for(&session);
        hub.create_input(&session, "temp", DataType::Numeric, "").unwrap();
        hub.end_session(
            &session,
            KillReason::PushToNonexistentResource { path: "/x".into() },
        );
        assert!(!hub.is_session_alive(&session));
        assert!(crate::tree::find(&hub.tree.root(), &["app", "A", "temp"]).is_none());
    }

    #[test]
    fn identity_rejection_kills_session_without_panicking() {
        let session = SessionId::new("ghost");
        let identity = StaticIdentity::new();
        let hub = DataHub::with_clock(Box::new(identity), HubConfig::default(), || 1.0);
        hub.push_bool(&session, "x", true, 0.0);
        assert!(matches!(
            hub.take_kill_reason(&session),
            Some(KillReason::IdentityRejected)
        ));
    }
}
