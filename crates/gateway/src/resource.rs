//! Resource operations (spec §4.3, component C3): the typed-endpoint
//! lifecycle layered on top of the raw tree shape in `tree.rs`.

use datahub_domain::value::{DataType, Sample};
use datahub_wire::{WireError, WireResult};

use crate::tree::{
    degrade_to_placeholder, delete, find, prune_empty_namespaces, upgrade_to_resource, with_resource,
    with_resource_mut, EntryRef, ResourceKind,
};

/// Outcome of `create_input`/`create_output` (spec §4.3): distinguishes
/// a genuinely new resource from the idempotent no-op case so callers
/// that log creation events don't log a duplicate no-op as a creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// `create_input`/`create_output` (spec §4.3), parameterised by
/// direction so the two wire calls share one implementation.
pub fn create_io(
    parent_namespace: &EntryRef,
    segments: &[&str],
    direction: ResourceKind,
    data_type: DataType,
    units: &str,
    owner_session: &str,
) -> WireResult<(EntryRef, CreateOutcome)> {
    debug_assert!(matches!(direction, ResourceKind::Input | ResourceKind::Output));

    let entry = crate::tree::walk_or_create(parent_namespace, segments)
        .map_err(|_| WireError::Unsupported)?;

    let existing_kind = entry.borrow().is_resource().then(|| {
        with_resource(&entry, |r| (r.kind, r.data_type, r.units.clone())).unwrap()
    });

    // `upgrade_to_resource` can only fail when called on a non-`Placeholder`
    // resource, which both arms below already rule out; a failure here
    // means the tree is corrupted (band 3, spec §7), not an ordinary wire
    // outcome, so it is not converted into a `WireError`.
    match existing_kind {
        None => {
            upgrade_to_resource(&entry, direction, data_type, units.to_string())
                .unwrap_or_else(|fault| panic!("{fault}"));
            with_resource_mut(&entry, |r| r.owner_session = Some(owner_session.to_string()));
            Ok((entry, CreateOutcome::Created))
        }
        Some((ResourceKind::Placeholder, _, _)) => {
            upgrade_to_resource(&entry, direction, data_type, units.to_string())
                .unwrap_or_else(|fault| panic!("{fault}"));
            with_resource_mut(&entry, |r| r.owner_session = Some(owner_session.to_string()));
            Ok((entry, CreateOutcome::Created))
        }
        Some((kind, existing_type, existing_units)) if kind == direction => {
            if existing_type == Some(data_type) && existing_units == units {
                Ok((entry, CreateOutcome::AlreadyExists))
            } else {
                Err(WireError::Duplicate)
            }
        }
        Some(_) => Err(WireError::Duplicate),
    }
}

/// `mark_optional` (spec §4.3): valid only on outputs, idempotent.
pub fn mark_optional(entry: &EntryRef) -> WireResult<()> {
    with_resource_mut(entry, |r| {
        if r.kind != ResourceKind::Output {
            return Err(WireError::Unsupported);
        }
        r.is_optional = true;
        Ok(())
    })
    .unwrap_or(Err(WireError::Unsupported))
}

/// Result of `set_default` (spec §4.3): first call wins, later calls
/// are ignored, a type mismatch is a session-termination trigger rather
/// than a wire error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetDefaultOutcome {
    Set,
    IgnoredAlreadySet,
    TypeMismatch,
}

pub fn set_default(entry: &EntryRef, declared_type: DataType, sample: Sample) -> SetDefaultOutcome {
    with_resource_mut(entry, |r| {
        if r.default_value.is_some() {
            return SetDefaultOutcome::IgnoredAlreadySet;
        }
        let resource_type = r.data_type.unwrap_or(declared_type);
        if declared_type != resource_type {
            return SetDefaultOutcome::TypeMismatch;
        }
        r.default_value = Some(sample);
        if r.data_type.is_none() {
            r.data_type = Some(declared_type);
        }
        SetDefaultOutcome::Set
    })
    .unwrap_or(SetDefaultOutcome::TypeMismatch)
}

pub fn get_current_value(entry: &EntryRef) -> Option<Sample> {
    with_resource(entry, |r| r.current_value.clone()).flatten()
}

pub fn get_timestamp(entry: &EntryRef) -> WireResult<f64> {
    get_current_value(entry)
        .map(|s| s.timestamp())
        .ok_or(WireError::Unavailable)
}

/// `get_typed` (spec §4.3): the sample if its type matches exactly,
/// `format-error` otherwise. No coercion is applied on read — the
/// coercion table (spec §4.4) only governs what a *push* may write into
/// a resource of another declared type.
pub fn get_typed(entry: &EntryRef, expected: DataType) -> WireResult<Sample> {
    let sample = get_current_value(entry).ok_or(WireError::Unavailable)?;
    if sample.data_type() == expected {
        Ok(sample)
    } else {
        Err(WireError::FormatError)
    }
}

/// `get_units(path, buffer)` (spec §11 supplement: buffer-style accessor
/// with the same overflow semantics as `get_typed`). `max_len` is the
/// caller's destination buffer size; `None` means an unbounded `String`
/// destination (the common in-process case).
pub fn get_units(entry: &EntryRef, max_len: Option<usize>) -> WireResult<String> {
    let units = with_resource(entry, |r| r.units.clone()).ok_or(WireError::Unsupported)?;
    match max_len {
        Some(limit) if units.len() > limit => Err(WireError::Overflow),
        _ => Ok(units),
    }
}

pub fn get_data_type(entry: &EntryRef) -> WireResult<DataType> {
    with_resource(entry, |r| r.data_type).flatten().ok_or(WireError::Unsupported)
}

/// `delete_io` (spec §4.3): removes an input/output outright, unless it
/// has observation children, in which case it degrades to a placeholder
/// instead of disappearing.
pub fn delete_io(entry: &EntryRef) {
    let has_observation_children = with_resource(entry, |r| !r.downstream.is_empty()).unwrap_or(false);
    if has_observation_children {
        degrade_to_placeholder(entry);
    } else {
        let parent = entry.borrow().parent();
        delete(entry);
        if let Some(parent) = parent {
            prune_empty_namespaces(&parent);
        }
    }
}

/// Resolve a relative path under `namespace`, returning `not-found` if
/// any segment is missing (used by every accessor that must not create).
pub fn resolve_existing(namespace: &EntryRef, segments: &[&str]) -> WireResult<EntryRef> {
    find(namespace, segments).ok_or(WireError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datahub_domain::value::SampleValue;

    fn root() -> EntryRef {
        crate::tree::ResourceTree::new().root()
    }

    #[test]
    fn create_input_twice_is_idempotent() {
        let r = root();
        let (e1, outcome1) = create_io(&r, &["p"], ResourceKind::Input, DataType::Bool, "", "s1").unwrap();
        let (e2, outcome2) = create_io(&r, &["p"], ResourceKind::Input, DataType::Bool, "", "s1").unwrap();
        assert!(std::rc::Rc::ptr_eq(&e1, &e2));
        assert_eq!(outcome1, CreateOutcome::Created);
        assert_eq!(outcome2, CreateOutcome::AlreadyExists);
    }

    #[test]
    fn create_input_type_change_is_duplicate() {
        let r = root();
        create_io(&r, &["p"], ResourceKind::Input, DataType::Bool, "", "s1").unwrap();
        let err = create_io(&r, &["p"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap_err();
        assert_eq!(err, WireError::Duplicate);
    }

    #[test]
    fn create_output_on_existing_input_is_duplicate() {
        let r = root();
        create_io(&r, &["p"], ResourceKind::Input, DataType::Bool, "", "s1").unwrap();
        let err = create_io(&r, &["p"], ResourceKind::Output, DataType::Bool, "", "s1").unwrap_err();
        assert_eq!(err, WireError::Duplicate);
    }

    #[test]
    fn create_input_upgrades_placeholder() {
        let r = root();
        let ph = crate::tree::walk_or_create(&r, &["x"]).unwrap();
        crate::tree::ensure_placeholder(&ph);
        let (entry, outcome) =
            create_io(&r, &["x"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap();
        assert_eq!(outcome, CreateOutcome::Created);
        assert_eq!(get_data_type(&entry).unwrap(), DataType::Numeric);
    }

    #[test]
    fn set_default_first_call_wins() {
        let r = root();
        let (entry, _) = create_io(&r, &["n"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap();
        assert_eq!(
            set_default(&entry, DataType::Numeric, Sample::new(0.0, SampleValue::Numeric(10.0))),
            SetDefaultOutcome::Set
        );
        assert_eq!(
            set_default(&entry, DataType::Numeric, Sample::new(0.0, SampleValue::Numeric(20.0))),
            SetDefaultOutcome::IgnoredAlreadySet
        );
        let default = with_resource(&entry, |r| r.default_value.clone()).flatten().unwrap();
        assert_eq!(default.value(), &SampleValue::Numeric(10.0));
    }

    #[test]
    fn set_default_type_mismatch() {
        let r = root();
        let (entry, _) = create_io(&r, &["n"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap();
        assert_eq!(
            set_default(&entry, DataType::Bool, Sample::new(0.0, SampleValue::Bool(true))),
            SetDefaultOutcome::TypeMismatch
        );
    }

    #[test]
    fn get_typed_mismatch_is_format_error() {
        let r = root();
        let (entry, _) = create_io(&r, &["n"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap();
        with_resource_mut(&entry, |res| {
            res.current_value = Some(Sample::new(1.0, SampleValue::Numeric(5.0)))
        });
        assert_eq!(get_typed(&entry, DataType::Bool).unwrap_err(), WireError::FormatError);
        assert!(get_typed(&entry, DataType::Numeric).is_ok());
    }

    #[test]
    fn delete_io_without_observations_removes_entry() {
        let r = root();
        let (entry, _) = create_io(&r, &["n"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap();
        delete_io(&entry);
        assert!(find(&r, &["n"]).is_none());
    }

    #[test]
    fn delete_io_with_observation_children_degrades() {
        let r = root();
        let (entry, _) = create_io(&r, &["n"], ResourceKind::Input, DataType::Numeric, "", "s1").unwrap();
        let obs = crate::tree::walk_or_create(&r, &["obs", "o"]).unwrap();
        with_resource_mut(&entry, |res| res.downstream.push(obs));
        delete_io(&entry);
        let still_there = find(&r, &["n"]).unwrap();
        assert_eq!(still_there.borrow().kind(), "placeholder");
    }
}
