//! The resource tree (spec §4.1, component C2): a hierarchical,
//! single-owner namespace of entries. The tree is touched only by the
//! single cooperative executor described in spec §5, so nodes are plain
//! `Rc<RefCell<Entry>>` rather than `Arc<Mutex<_>>` — there is no
//! thread-safety to buy here, and reaching for it would misrepresent the
//! concurrency model this core actually has.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use datahub_domain::value::{DataType, Sample};
use datahub_domain::HubFault;
use datahub_wire::HandlerRef;

use crate::observation::ObservationBuffer;

/// Shared handle to one tree node. Cloning bumps the `Rc` refcount; the
/// tree itself, plus any session that memoised a subtree root, are the
/// only long-lived holders.
pub type EntryRef = Rc<RefCell<Entry>>;

/// The resource role a non-namespace entry plays (spec §3 "kind").
/// `Input`/`Output`/`Observation` never change kind once reached;
/// `Placeholder` is the only kind that upgrades away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Placeholder,
    Input,
    Output,
    Observation,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Placeholder => "placeholder",
            ResourceKind::Input => "input",
            ResourceKind::Output => "output",
            ResourceKind::Observation => "observation",
        }
    }
}

/// One registered callback (spec §4.5). Stored in a generation-indexed
/// slot so `HandlerRef` removal is a safe no-op on a freed or foreign
/// reference (spec §9 "Opaque handler references").
pub struct HandlerRecord {
    pub session: String,
    pub data_type: DataType,
    pub callback: Box<dyn datahub_wire::PushHandler>,
}

pub(crate) struct HandlerSlot {
    pub(crate) generation: u32,
    pub(crate) record: Option<HandlerRecord>,
}

/// The resource payload carried by a non-namespace entry (spec §9
/// "Placeholder/namespace upgrade in place": the kind is a sum type with
/// an optional resource payload so upgrading mutates in place instead of
/// replacing the node).
pub struct ResourceState {
    pub(crate) kind: ResourceKind,
    /// Fixed once `kind` is `Input`/`Output`; tracks the most recent
    /// pushed sample's type for `Placeholder`/`Observation` (spec §3).
    pub(crate) data_type: Option<DataType>,
    pub(crate) units: String,
    pub(crate) current_value: Option<Sample>,
    pub(crate) default_value: Option<Sample>,
    /// Outputs only (spec §4.3 `mark_optional`).
    pub(crate) is_optional: bool,
    pub(crate) handlers: Vec<HandlerSlot>,
    /// Observation entries fed from this one (spec §4.4 step 6
    /// "Downstream"). Populated when an observation is configured with
    /// this entry as its upstream.
    pub(crate) downstream: Vec<EntryRef>,
    /// Present only when `kind == Observation` (spec §4.6).
    pub(crate) buffer: Option<ObservationBuffer>,
    /// Re-entrancy guard for the push engine (spec §5 "Suspension
    /// points": handlers must not recurse synchronously into push for
    /// the same resource).
    pub(crate) pushing: bool,
    /// Session that owns this resource, for session-scoped teardown
    /// (spec §3 "destroyed ... when their owning client session ends
    /// (producer-owned resources only)").
    pub(crate) owner_session: Option<String>,
}

impl ResourceState {
    fn placeholder() -> Self {
        Self {
            kind: ResourceKind::Placeholder,
            data_type: None,
            units: String::new(),
            current_value: None,
            default_value: None,
            is_optional: false,
            handlers: Vec::new(),
            downstream: Vec::new(),
            buffer: None,
            pushing: false,
            owner_session: None,
        }
    }
}

pub enum Role {
    Namespace,
    Resource(ResourceState),
}

pub struct Entry {
    pub(crate) name: String,
    pub(crate) parent: Option<Weak<RefCell<Entry>>>,
    pub(crate) children: HashMap<String, EntryRef>,
    pub(crate) role: Role,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry").field("name", &self.name).finish()
    }
}

impl Entry {
    fn new_root() -> EntryRef {
        Rc::new(RefCell::new(Entry {
            name: String::new(),
            parent: None,
            children: HashMap::new(),
            role: Role::Namespace,
        }))
    }

    fn new_namespace(name: String, parent: &EntryRef) -> EntryRef {
        Rc::new(RefCell::new(Entry {
            name,
            parent: Some(Rc::downgrade(parent)),
            children: HashMap::new(),
            role: Role::Namespace,
        }))
    }

    /// `"namespace"`, `"placeholder"`, `"input"`, `"output"`, or
    /// `"observation"` (spec §11 diagnostics supplement).
    pub fn kind(&self) -> &'static str {
        match &self.role {
            Role::Namespace => "namespace",
            Role::Resource(r) => r.kind.as_str(),
        }
    }

    /// `true` if this entry is a resource with a current value set
    /// (spec §11 diagnostics supplement).
    pub fn has_value(&self) -> bool {
        match &self.role {
            Role::Namespace => false,
            Role::Resource(r) => r.current_value.is_some(),
        }
    }

    pub fn is_resource(&self) -> bool {
        matches!(self.role, Role::Resource(_))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntryRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Absolute path from the tree root, rebuilt on demand for logging
    /// and error messages (not cached — the tree is shallow and this is
    /// never on a hot loop).
    pub fn path(entry: &EntryRef) -> String {
        let mut segments = Vec::new();
        let mut cur = entry.clone();
        loop {
            let name = cur.borrow().name.clone();
            let parent = cur.borrow().parent();
            match parent {
                Some(p) => {
                    segments.push(name);
                    cur = p;
                }
                None => break,
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }
}

/// The resource tree itself: just a root namespace entry. All real
/// behaviour lives in the free functions below so `resource.rs`,
/// `push.rs`, and `handlers.rs` can share them without a god object.
pub struct ResourceTree {
    root: EntryRef,
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTree {
    pub fn new() -> Self {
        Self {
            root: Entry::new_root(),
        }
    }

    pub fn root(&self) -> EntryRef {
        self.root.clone()
    }

    /// Count every entry reachable from the root, for `no-memory`
    /// accounting against `HubConfig::limits::max_entries`.
    pub fn entry_count(&self) -> usize {
        fn count(entry: &EntryRef) -> usize {
            1 + entry
                .borrow()
                .children
                .values()
                .map(count)
                .sum::<usize>()
        }
        count(&self.root) - 1 // exclude the synthetic root itself
    }
}

/// Errors from walking or mutating the tree shape itself, distinct from
/// the wire-level codes a resource operation returns (spec §4.1 "Tie-breaks").
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A path walk hit a resource (leaf) as an intermediate segment.
    #[error("path segment is a leaf resource, not a namespace")]
    ResourceIsLeaf,
}

/// `get_or_create(parent, name)` (spec §4.1): create a namespace child if
/// absent, otherwise return whatever is already there regardless of kind.
pub fn get_or_create_namespace(parent: &EntryRef, name: &str) -> EntryRef {
    if let Some(existing) = parent.borrow().children.get(name) {
        return existing.clone();
    }
    let child = Entry::new_namespace(name.to_string(), parent);
    parent
        .borrow_mut()
        .children
        .insert(name.to_string(), child.clone());
    child
}

/// Walk `segments` from `start`, creating plain namespaces for every
/// segment that doesn't exist yet. Fails if an intermediate segment is
/// already a resource (spec §4.1: "resources are leaves").
pub fn walk_or_create(start: &EntryRef, segments: &[&str]) -> Result<EntryRef, TreeError> {
    let mut cur = start.clone();
    for (i, seg) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();
        let next = get_or_create_namespace(&cur, seg);
        if !is_last && next.borrow().is_resource() {
            return Err(TreeError::ResourceIsLeaf);
        }
        cur = next;
    }
    Ok(cur)
}

/// `find(parent, relative_path)` (spec §4.1): segment-by-segment lookup,
/// no creation.
pub fn find(parent: &EntryRef, segments: &[&str]) -> Option<EntryRef> {
    let mut cur = parent.clone();
    for seg in segments {
        let next = cur.borrow().children.get(*seg).cloned()?;
        cur = next;
    }
    Some(cur)
}

/// `delete(entry)` (spec §4.1): recursively destroys a subtree. Returns
/// `false` without effect if `entry` is the root.
pub fn delete(entry: &EntryRef) -> bool {
    let Some(parent) = entry.borrow().parent() else {
        return false;
    };
    let name = entry.borrow().name.clone();
    parent.borrow_mut().children.remove(&name);
    true
}

/// Reclaim `entry` and every now-childless, resource-less ancestor up to
/// (not including) the root (spec §3 "Namespaces ... are reclaimed when
/// they become childless AND carry no resource role").
pub fn prune_empty_namespaces(entry: &EntryRef) {
    let mut cur = entry.clone();
    loop {
        let should_prune = {
            let e = cur.borrow();
            matches!(e.role, Role::Namespace) && e.children.is_empty()
        };
        let parent = cur.borrow().parent();
        if should_prune {
            delete(&cur);
        } else {
            break;
        }
        match parent {
            Some(p) if p.borrow().parent().is_some() => cur = p,
            _ => break,
        }
    }
}

/// Upgrade a `Namespace` or `Placeholder` entry to a concrete resource
/// kind in place, preserving children, handlers, and default (spec §4.1
/// "upgraded in place"; §9 "upgrading mutates the variant without moving
/// the entry").
pub fn upgrade_to_resource(
    entry: &EntryRef,
    kind: ResourceKind,
    data_type: DataType,
    units: String,
) -> Result<(), HubFault> {
    let mut e = entry.borrow_mut();
    match &mut e.role {
        Role::Namespace => {
            e.role = Role::Resource(ResourceState {
                data_type: Some(data_type),
                units,
                kind,
                ..ResourceState::placeholder()
            });
            Ok(())
        }
        Role::Resource(state) if state.kind == ResourceKind::Placeholder => {
            state.kind = kind;
            state.data_type = Some(data_type);
            state.units = units;
            Ok(())
        }
        Role::Resource(state) => Err(HubFault::InvariantViolated(format!(
            "upgrade_to_resource called on non-placeholder kind {:?}",
            state.kind.as_str()
        ))),
    }
}

/// Ensure `entry` has a placeholder resource payload, for consumer-side
/// activity that precedes a producer (handler registration, observation
/// routing) (spec §3 "Placeholder").
pub fn ensure_placeholder(entry: &EntryRef) {
    let mut e = entry.borrow_mut();
    if matches!(e.role, Role::Namespace) {
        e.role = Role::Resource(ResourceState::placeholder());
    }
}

/// Degrade an input/output with observation children to a placeholder,
/// preserving its handler list (spec §4.3 `delete_io`: "If the entry has
/// observation children it degrades to a placeholder ... rather than
/// disappearing").
pub fn degrade_to_placeholder(entry: &EntryRef) {
    let mut e = entry.borrow_mut();
    if let Role::Resource(state) = &mut e.role {
        state.kind = ResourceKind::Placeholder;
        state.current_value = None;
        state.default_value = None;
        state.is_optional = false;
        state.owner_session = None;
    }
}

/// Borrow a resource's handler slot table mutably, for `handlers.rs`.
pub fn with_resource_mut<T>(
    entry: &EntryRef,
    f: impl FnOnce(&mut ResourceState) -> T,
) -> Option<T> {
    match &mut entry.borrow_mut().role {
        Role::Resource(state) => Some(f(state)),
        Role::Namespace => None,
    }
}

pub fn with_resource<T>(entry: &EntryRef, f: impl FnOnce(&ResourceState) -> T) -> Option<T> {
    match &entry.borrow().role {
        Role::Resource(state) => Some(f(state)),
        Role::Namespace => None,
    }
}

/// Dummy re-export so `HandlerRef` construction stays in `handlers.rs`
/// without this module needing to know slot indices are `u32`.
pub(crate) fn handler_ref(slot: usize, generation: u32) -> HandlerRef {
    HandlerRef::new(slot as u32, generation)
}

/// Visit every entry reachable from `start`, `start` included. Used by
/// session teardown (spec §4.2/§4.5: producer-owned resources and
/// handlers are torn down tree-wide, not just under the dying session's
/// own namespace) and by diagnostics dumps.
pub fn walk_all(start: &EntryRef, visit: &mut impl FnMut(&EntryRef)) {
    visit(start);
    let children: Vec<EntryRef> = start.borrow().children.values().cloned().collect();
    for child in &children {
        walk_all(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let root = Entry::new_root();
        let a1 = get_or_create_namespace(&root, "a");
        let a2 = get_or_create_namespace(&root, "a");
        assert!(Rc::ptr_eq(&a1, &a2));
    }

    #[test]
    fn walk_or_create_builds_path() {
        let root = Entry::new_root();
        let leaf = walk_or_create(&root, &["app", "sensor", "temp"]).unwrap();
        assert_eq!(Entry::path(&leaf), "/app/sensor/temp");
    }

    #[test]
    fn walk_or_create_rejects_resource_as_intermediate() {
        let root = Entry::new_root();
        let x = walk_or_create(&root, &["x"]).unwrap();
        upgrade_to_resource(&x, ResourceKind::Input, DataType::Numeric, String::new()).unwrap();
        let err = walk_or_create(&root, &["x", "y"]).unwrap_err();
        assert_eq!(err, TreeError::ResourceIsLeaf);
    }

    #[test]
    fn find_does_not_create() {
        let root = Entry::new_root();
        assert!(find(&root, &["missing"]).is_none());
        walk_or_create(&root, &["present"]).unwrap();
        assert!(find(&root, &["present"]).is_some());
    }

    #[test]
    fn delete_removes_from_parent() {
        let root = Entry::new_root();
        let child = walk_or_create(&root, &["a"]).unwrap();
        assert!(delete(&child));
        assert!(find(&root, &["a"]).is_none());
    }

    #[test]
    fn prune_removes_empty_ancestor_chain() {
        let root = Entry::new_root();
        let leaf = walk_or_create(&root, &["a", "b", "c"]).unwrap();
        delete(&leaf);
        prune_empty_namespaces(&find(&root, &["a", "b"]).unwrap());
        assert!(find(&root, &["a"]).is_none());
    }

    #[test]
    fn prune_stops_at_resource_ancestor() {
        let root = Entry::new_root();
        let mid = walk_or_create(&root, &["a"]).unwrap();
        upgrade_to_resource(&mid, ResourceKind::Observation, DataType::Numeric, String::new())
            .unwrap();
        let leaf = walk_or_create(&root, &["a", "b"]).unwrap();
        delete(&leaf);
        prune_empty_namespaces(&mid);
        assert!(find(&root, &["a"]).is_some());
    }

    #[test]
    fn upgrade_preserves_handlers_slot_table() {
        let root = Entry::new_root();
        let ph = walk_or_create(&root, &["x"]).unwrap();
        ensure_placeholder(&ph);
        with_resource_mut(&ph, |r| {
            r.handlers.push(HandlerSlot {
                generation: 0,
                record: None,
            })
        });
        upgrade_to_resource(&ph, ResourceKind::Input, DataType::Bool, String::new()).unwrap();
        assert_eq!(with_resource(&ph, |r| r.handlers.len()).unwrap(), 1);
    }
}
