use super::{async_store, count_of, counter_reducer, counter_state, counter_store};
use crate::mock::assert::assert_dispatched;
use crate::mock::MockStore;
use crate::{
    Action, ActionError, Deferred, Dispatchable, Dispatched, Extra, Middleware, Payload,
    PromiseMiddleware, Rejection, Settle, Store, Thunk, ThunkMiddleware, Value,
};
use std::sync::Arc;

fn pending_payload(store: &MockStore) -> Option<Value> {
    store
        .dispatched()
        .into_iter()
        .find(|action| action.kind.ends_with("_PENDING"))
        .and_then(|action| action.value().cloned())
}

#[tokio::test]
async fn test_plain_action_passes_through() {
    let plain = counter_store();
    let chained = async_store();

    let direct = plain.dispatch(Action::new("SET_NAME").with_payload("ada").into());
    let through = chained.dispatch(Action::new("SET_NAME").with_payload("ada").into());

    let (Dispatched::Action(direct), Dispatched::Action(through)) = (direct, through) else {
        panic!("expected both dispatches to reach the reducer");
    };
    assert_eq!(direct.kind, through.kind);
    assert!(!through.expanded);
    assert_eq!(plain.get_state(), chained.get_state());
    assert_dispatched(&chained, &["SET_NAME"]);
}

#[tokio::test]
async fn test_deferred_payload_fulfills() {
    let store = async_store();

    let dispatched = store.dispatch(
        Action::new("FETCH")
            .with_payload(Deferred::new(async { 42 }))
            .into(),
    );
    let settlement = dispatched.into_settlement().expect("expected a settlement");
    assert!(settlement.origin().expanded);
    assert_eq!(settlement.origin().kind, "FETCH");

    // Pending is dispatched before the dispatch call returns.
    assert_dispatched(&store, &["FETCH_PENDING"]);
    assert_eq!(pending_payload(&store), Some(Value::Bool(true)));

    let value = settlement.await.expect("fulfilled");
    assert_eq!(value, Value::Int(42));

    assert_dispatched(&store, &["FETCH_PENDING", "FETCH_FULFILLED"]);
    let fulfilled = &store.dispatched()[1];
    assert_eq!(fulfilled.value(), Some(&Value::Int(42)));
    assert!(!fulfilled.error);
}

#[tokio::test]
async fn test_unit_result_fulfills_with_null() {
    let store = async_store();

    let settlement = store
        .dispatch(Action::new("SAVE").with_payload(Deferred::new(async {})).into())
        .into_settlement()
        .expect("expected a settlement");

    assert_eq!(settlement.await.expect("fulfilled"), Value::Null);
    let fulfilled = &store.dispatched()[1];
    assert_eq!(fulfilled.kind, "SAVE_FULFILLED");
    assert_eq!(fulfilled.value(), Some(&Value::Null));
}

#[tokio::test]
async fn test_error_rejection_is_reraised() {
    let store = async_store();

    let settlement = store
        .dispatch(
            Action::new("FETCH")
                .with_payload(Deferred::rejected(ActionError::msg("boom")))
                .into(),
        )
        .into_settlement()
        .expect("expected a settlement");

    let error = settlement.await.expect_err("rejected with an error");
    assert_eq!(error.to_string(), "boom");

    assert_dispatched(&store, &["FETCH_PENDING", "FETCH_REJECTED"]);
    let rejected = &store.dispatched()[1];
    assert!(rejected.error);
    let payload_error = rejected.payload.as_error().expect("error payload");
    assert!(payload_error.ptr_eq(&error));
}

#[tokio::test]
async fn test_reason_rejection_resolves_with_reason() {
    let store = async_store();

    let fetch = Thunk::deferred(|_, _| async { Err::<Value, _>("oops") });
    let settlement = store
        .dispatch(Action::new("FETCH").with_payload(fetch).into())
        .into_settlement()
        .expect("expected a settlement");

    let value = settlement.await.expect("reason rejections resolve");
    assert_eq!(value, Value::from("oops"));

    let dispatched = store.dispatched();
    assert_dispatched(&store, &["FETCH_PENDING", "FETCH_REJECTED"]);
    assert_eq!(dispatched[0].value(), Some(&Value::Bool(true)));
    assert_eq!(dispatched[1].value(), Some(&Value::from("oops")));
    assert!(dispatched[1].error);
}

#[tokio::test]
async fn test_optimistic_data_on_pending() {
    let store = async_store();

    let payload = Payload::promised(Deferred::resolved("saved"), Some(Value::from("draft")));
    let settlement = store
        .dispatch(Action::new("SAVE").with_payload(payload).into())
        .into_settlement()
        .expect("expected a settlement");

    assert_eq!(pending_payload(&store), Some(Value::from("draft")));
    assert_eq!(settlement.await.expect("fulfilled"), Value::from("saved"));
}

#[tokio::test]
async fn test_null_optimistic_data_falls_back_to_true() {
    let store = async_store();

    let payload = Payload::promised(Deferred::resolved(1), Some(Value::Null));
    let settlement = store
        .dispatch(Action::new("SAVE").with_payload(payload).into())
        .into_settlement()
        .expect("expected a settlement");

    assert_eq!(pending_payload(&store), Some(Value::Bool(true)));
    settlement.await.expect("fulfilled");
}

#[tokio::test]
async fn test_promised_without_deferred_passes_through() {
    let store = async_store();

    let payload = Payload::promised(Value::from(1), None);
    let dispatched = store.dispatch(Action::new("SAVE").with_payload(payload).into());

    assert!(matches!(dispatched, Dispatched::Action(_)));
    assert_dispatched(&store, &["SAVE"]);
}

#[tokio::test]
async fn test_thunk_without_promise_dispatches_nothing() {
    let store = async_store();

    let payload = Thunk::new(|_, _| Payload::Value(Value::from(5)));
    let dispatched = store.dispatch(Action::new("COMPUTE").with_payload(payload).into());

    assert!(dispatched.is_dropped());
    assert!(store.dispatched().is_empty());
}

#[tokio::test]
async fn test_thunk_payload_receives_api_and_extra() {
    let middlewares: Vec<Arc<dyn Middleware>> =
        vec![Arc::new(PromiseMiddleware::with_extra(Extra::new(100i64)))];
    let store = MockStore::with_middleware(counter_state(2), counter_reducer, middlewares);

    let payload = Thunk::deferred(|api, extra| {
        let base = extra.get::<i64>().copied().unwrap_or(0);
        let count = count_of(&api.get_state());
        async move { base + count }
    });
    let settlement = store
        .dispatch(Action::new("SUM").with_payload(payload).into())
        .into_settlement()
        .expect("expected a settlement");

    assert_eq!(settlement.await.expect("fulfilled"), Value::Int(102));
}

#[tokio::test]
async fn test_lifecycle_actions_reenter_the_chain() {
    let store = async_store();

    // Lifecycle actions go back through the whole chain and reach the reducer unexpanded.
    let settlement = store
        .dispatch(
            Action::new("INCREMENT_LATER")
                .with_payload(Deferred::new(async { Ok::<_, Rejection>(Value::from(1)) }))
                .into(),
        )
        .into_settlement()
        .expect("expected a settlement");
    settlement.await.expect("fulfilled");

    assert_dispatched(&store, &["INCREMENT_LATER_PENDING", "INCREMENT_LATER_FULFILLED"]);
    assert!(store.dispatched().iter().all(|action| !action.expanded));
}

#[tokio::test]
async fn test_thunk_middleware_runs_thunks() {
    let store = async_store();

    let thunk = Thunk::new(|api, _| {
        api.dispatch(Action::new("INCREMENT"));
        api.dispatch(Action::new("INCREMENT"));
        Payload::Value(Value::from(count_of(&api.get_state())))
    });
    let dispatched = store.dispatch(thunk.into());

    let Dispatched::Returned(returned) = dispatched else {
        panic!("expected the thunk's return value");
    };
    assert_eq!(returned.as_value(), Some(&Value::Int(2)));
    assert_dispatched(&store, &["INCREMENT", "INCREMENT"]);
}

#[tokio::test]
async fn test_thunk_dispatching_deferred_work() {
    let store = async_store();

    let thunk = Thunk::new(|api, _| {
        let dispatched = api.dispatch(
            Action::new("LOAD").with_payload(Deferred::resolved(Value::from("done"))),
        );
        match dispatched {
            Dispatched::Settling(_) => Payload::Value(Value::from(true)),
            _ => Payload::Empty,
        }
    });

    let Dispatched::Returned(returned) = store.dispatch(Dispatchable::Thunk(thunk)) else {
        panic!("expected the thunk's return value");
    };
    assert_eq!(returned.as_value(), Some(&Value::Bool(true)));
    assert_eq!(store.dispatched_kinds()[0], "LOAD_PENDING");
}

#[tokio::test]
async fn test_thunk_without_middleware_is_dropped() {
    let store = counter_store();

    let dispatched = store.dispatch(Thunk::new(|_, _| Payload::Empty).into());

    assert!(dispatched.is_dropped());
    assert!(store.dispatched().is_empty());
}

#[tokio::test]
async fn test_thunk_middleware_alone_passes_actions() {
    let middlewares: Vec<Arc<dyn Middleware>> = vec![Arc::new(ThunkMiddleware::new())];
    let store = MockStore::with_middleware(counter_state(0), counter_reducer, middlewares);

    store.dispatch(Action::new("INCREMENT").into());

    assert_eq!(count_of(&store.get_state()), 1);
}

#[test]
fn test_deferred_action_outside_runtime_is_dropped() {
    let store = async_store();

    let dispatched = store.dispatch(
        Action::new("FETCH")
            .with_payload(Deferred::new(async { 1 }))
            .into(),
    );

    assert!(dispatched.is_dropped());
    assert!(store.dispatched().is_empty());
    assert_eq!(count_of(&store.get_state()), 0);
}

fn deferred_of<R: Settle + Send + 'static>(output: R) -> Deferred {
    Deferred::new(async move { output })
}

#[tokio::test]
async fn test_deferred_from_generic_output() {
    let name = deferred_of(String::from("ada")).settle().await;
    assert_eq!(name.expect("fulfilled"), Value::from("ada"));

    let missing = deferred_of(None::<i64>).settle().await;
    assert_eq!(missing.expect("fulfilled"), Value::Null);
}
