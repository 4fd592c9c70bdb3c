use crate::mock::MockStore;
use crate::{Action, Immutable, Middleware, PromiseMiddleware, ThunkMiddleware, Value};
use std::sync::Arc;

mod middleware_test;
mod registry_test;
mod value_test;

pub fn counter_state(count: i64) -> Value {
    Immutable::map([("count", Value::from(count)), ("name", Value::from("anon"))]).into()
}

pub fn counter_reducer(state: &Value, action: &Action) -> Value {
    let Some(current) = state.as_immutable() else {
        return state.clone();
    };
    match action.kind.as_str() {
        "INCREMENT" => current
            .update("count", |count| Value::from(count.as_i64().unwrap_or(0) + 1))
            .into(),
        "SET_NAME" => current
            .set("name", action.value().cloned().unwrap_or_default())
            .into(),
        _ => state.clone(),
    }
}

pub fn counter_store() -> MockStore {
    MockStore::new(counter_state(0), counter_reducer)
}

pub fn async_store() -> MockStore {
    let middlewares: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(PromiseMiddleware::new()),
        Arc::new(ThunkMiddleware::new()),
    ];
    MockStore::with_middleware(counter_state(0), counter_reducer, middlewares)
}

pub fn count_of(state: &Value) -> i64 {
    state.get("count").and_then(Value::as_i64).unwrap_or(-1)
}
