use crate::classify::is_immutable_value;
use crate::value::Value;
use std::collections::BTreeMap;

/// A projection of store state for one component.
pub type MappedState = BTreeMap<String, Value>;

/// The keys of a [`MappedState`] that must be written to render data.
pub type ChangePatch = BTreeMap<String, Value>;

/// Computes what changed between two projections.
///
/// Immutable values are kept out of the patch when they are the same reference as
/// before. Plain values are always included. Keys only present in `previous` are
/// never reported; a patch merges, it does not replace. Immutable values enter the
/// patch converted to plain data.
pub fn compare(previous: &MappedState, next: &MappedState) -> ChangePatch {
    next.iter()
        .filter_map(|(key, value)| {
            if !is_immutable_value(value) {
                return Some((key.clone(), value.clone()));
            }
            match previous.get(key) {
                Some(before) if before.same(value) => None,
                _ => Some((key.clone(), value.to_plain())),
            }
        })
        .collect()
}
