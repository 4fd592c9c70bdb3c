//! Runtime shape tests over values, payloads and actions.
//!
//! None of these fail; anything that does not have the tested shape is `false`.

use crate::action::{Action, Dispatchable, Payload, Phase};
use crate::component::Scope;
use crate::value::{Value, SENTINEL_ITERABLE, SENTINEL_RECORD};

/// Immutable collections, plus plain maps tagged with an immutable sentinel property.
pub fn is_immutable_value(value: &Value) -> bool {
    match value {
        Value::Immutable(_) => true,
        Value::Map(map) => [SENTINEL_ITERABLE, SENTINEL_RECORD]
            .iter()
            .any(|sentinel| map.get(*sentinel).is_some_and(Value::is_truthy)),
        _ => false,
    }
}

pub fn is_promise_like(payload: &Payload) -> bool {
    matches!(payload, Payload::Deferred(_))
}

pub fn is_dispatchable_function(payload: &Payload) -> bool {
    matches!(payload, Payload::Thunk(_))
}

pub fn is_thunk(action: &Dispatchable) -> bool {
    matches!(action, Dispatchable::Thunk(_))
}

/// True when the scope itself (not an ancestor) provides a store.
pub fn is_store_like(scope: &Scope) -> bool {
    scope.store().is_some()
}

pub fn is_pending_action(action: &Action) -> bool {
    action.phase() == Some(Phase::Pending)
}

pub fn is_fulfilled_action(action: &Action) -> bool {
    action.phase() == Some(Phase::Fulfilled)
}

pub fn is_rejected_action(action: &Action) -> bool {
    action.phase() == Some(Phase::Rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::{Deferred, Thunk};
    use crate::value::Immutable;

    #[test]
    fn test_immutable_detection() {
        assert!(is_immutable_value(&Immutable::map([("a", 1)]).into()));
        assert!(is_immutable_value(&Immutable::list([1, 2]).into()));
        assert!(!is_immutable_value(&Value::map([("a", 1)])));
        assert!(!is_immutable_value(&Value::from("text")));
        assert!(!is_immutable_value(&Value::Null));
    }

    #[test]
    fn test_immutable_sentinel_fallback() {
        let tagged = Value::map([(SENTINEL_RECORD, Value::Bool(true)), ("a", Value::from(1))]);
        assert!(is_immutable_value(&tagged));

        let iterable = Value::map([(SENTINEL_ITERABLE, 1)]);
        assert!(is_immutable_value(&iterable));

        let falsy = Value::map([(SENTINEL_ITERABLE, false)]);
        assert!(!is_immutable_value(&falsy));
    }

    #[tokio::test]
    async fn test_payload_shapes() {
        let promise = Payload::Deferred(Deferred::resolved(1));
        let thunk = Payload::Thunk(Thunk::new(|_, _| Payload::Empty));

        assert!(is_promise_like(&promise));
        assert!(!is_promise_like(&thunk));
        assert!(is_dispatchable_function(&thunk));
        assert!(!is_dispatchable_function(&promise));
        assert!(!is_promise_like(&Payload::from(1)));
        assert!(!is_dispatchable_function(&Payload::Empty));
    }

    #[test]
    fn test_action_phase_predicates() {
        assert!(is_pending_action(&Action::new("FETCH_PENDING")));
        assert!(is_fulfilled_action(&Action::new("FETCH_FULFILLED")));
        assert!(is_rejected_action(&Action::new("FETCH_REJECTED")));
        assert!(!is_pending_action(&Action::new("FETCH")));
        assert!(!is_rejected_action(&Action::new("FETCH_PENDING")));
    }

    #[test]
    fn test_store_like_scope() {
        assert!(!is_store_like(&Scope::root()));
    }
}
