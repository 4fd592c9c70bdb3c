#![allow(dead_code)]

use regux::mock::MockStore;
use regux::{
    Action, ActionCreator, Deferred, Immutable, Middleware, Payload, Phase, PromiseMiddleware,
    ReducerMap, Rejection, ThunkMiddleware, Value,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

pub const FETCH_USER: &str = "FETCH_USER";

pub fn initial_state() -> Value {
    Immutable::map([
        ("loading", Value::from(false)),
        ("user", Value::Null),
        ("error", Value::Null),
        ("visits", Value::from(0)),
    ])
    .into()
}

fn set(state: &Value, key: &str, value: impl Into<Value>) -> Value {
    match state.as_immutable() {
        Some(im) => im.set(key, value).into(),
        None => state.clone(),
    }
}

pub fn reducer() -> ReducerMap {
    ReducerMap::new()
        .on("VISIT", |state, _| {
            let visits = state.get("visits").and_then(Value::as_i64).unwrap_or(0);
            set(state, "visits", visits + 1)
        })
        .on_phase(FETCH_USER, Phase::Pending, |state, _| set(state, "loading", true))
        .on_phase(FETCH_USER, Phase::Fulfilled, |state, action| {
            let user = action.value().cloned().unwrap_or_default().into_immutable();
            let state = set(state, "loading", false);
            set(&set(&state, "error", Value::Null), "user", user)
        })
        .on_phase(FETCH_USER, Phase::Rejected, |state, action| {
            let reason = match (&action.payload, action.value()) {
                (Payload::Error(error), _) => Value::from(error.to_string()),
                (_, Some(reason)) => reason.clone(),
                _ => Value::Null,
            };
            set(&set(state, "loading", false), "error", reason)
        })
}

pub fn store() -> MockStore {
    let middlewares: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(PromiseMiddleware::new()),
        Arc::new(ThunkMiddleware::new()),
    ];
    let reducer = reducer();
    MockStore::with_middleware(
        initial_state(),
        move |state, action| reducer.reduce(state, action),
        middlewares,
    )
}

/// Loads a user after a short delay. Ids below zero are rejected with a reason.
pub async fn load_user(id: i64) -> Result<Value, Rejection> {
    sleep(Duration::from_millis(5)).await;
    if id < 0 {
        return Err(Rejection::reason("not found"));
    }
    Ok(Value::map([
        ("id", Value::from(id)),
        ("name", Value::from(format!("user-{id}"))),
    ]))
}

pub fn fetch_user() -> ActionCreator {
    ActionCreator::new(FETCH_USER, |args| {
        let id = args.first().and_then(Value::as_i64)?;
        Some(Deferred::new(load_user(id)).into())
    })
}

pub fn fetch_user_action(id: i64) -> Action {
    Action::new(FETCH_USER).with_payload(Deferred::new(load_user(id)))
}
