use crate::tracing_setup::tracing_init;
use futures_signals::signal::SignalExt;
use regux::mock::MockStore;
use regux::{
    connect, mapped_state, Action, ActionCreator, Binding, ChangePatch, Component,
    ConnectOptions, Deferred, Dispatched, Immutable, Middleware, Phase, PromiseMiddleware,
    ReducerMap, Rejection, RenderData, Store, StoreProvider, Thunk, ThunkMiddleware, Value,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

mod tracing_setup;

const FETCH_USER: &str = "FETCH_USER";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A view that logs what the connector does to it.
struct ConsoleView {
    name: &'static str,
    data: Mutex<RenderData>,
    bindings: Mutex<HashMap<String, Binding>>,
}

impl ConsoleView {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(ConsoleView {
            name,
            data: Mutex::new(RenderData::new()),
            bindings: Mutex::new(HashMap::new()),
        })
    }

    fn call(&self, binding: &str, args: &[Value]) -> Option<Dispatched> {
        let bound = lock(&self.bindings).get(binding)?.as_action()?.clone();
        Some(bound(args))
    }

    fn get(&self, key: &str) -> Value {
        lock(&self.data).get(key).cloned().unwrap_or_default()
    }
}

impl Component for ConsoleView {
    fn apply_patch(&self, patch: ChangePatch) {
        info!(view = self.name, ?patch, "patch");
        lock(&self.data).merge(patch);
    }

    fn emit(&self, event: &str) {
        info!(view = self.name, event, "event");
    }

    fn has_refs(&self) -> bool {
        true
    }

    fn bind(&self, name: &str, binding: Binding) {
        lock(&self.bindings).insert(name.to_string(), binding);
    }

    fn refresh(&self) {
        info!(view = self.name, "refresh");
    }
}

fn set(state: &Value, key: &str, value: impl Into<Value>) -> Value {
    match state.as_immutable() {
        Some(im) => im.set(key, value).into(),
        None => state.clone(),
    }
}

fn reducer() -> ReducerMap {
    ReducerMap::new()
        .on("VISIT", |state, _| {
            let visits = state.get("visits").and_then(Value::as_i64).unwrap_or(0);
            set(state, "visits", visits + 1)
        })
        .on_phase(FETCH_USER, Phase::Pending, |state, _| set(state, "loading", true))
        .on_phase(FETCH_USER, Phase::Fulfilled, |state, action| {
            let user = action.value().cloned().unwrap_or_default().into_immutable();
            set(&set(state, "loading", false), "user", user)
        })
        .on_phase(FETCH_USER, Phase::Rejected, |state, action| {
            let reason = action.value().cloned().unwrap_or_default();
            set(&set(state, "loading", false), "error", reason)
        })
}

async fn load_user(id: i64) -> Result<Value, Rejection> {
    sleep(Duration::from_millis(50)).await;
    if id <= 0 {
        return Err(Rejection::reason(format!("no user {id}")));
    }
    Ok(Value::map([
        ("id", Value::from(id)),
        ("name", Value::from(format!("user-{id}"))),
    ]))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init();

    let initial: Value = Immutable::map([
        ("loading", Value::from(false)),
        ("user", Value::Null),
        ("error", Value::Null),
        ("visits", Value::from(0)),
    ])
    .into();
    let middlewares: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(PromiseMiddleware::new()),
        Arc::new(ThunkMiddleware::new()),
    ];
    let reducer = reducer();
    let store = MockStore::with_middleware(
        initial,
        move |state, action| reducer.reduce(state, action),
        middlewares,
    );

    let watcher = tokio::spawn(
        store
            .to_signal()
            .stop_if(|state| state.get("error").is_some_and(|error| !error.is_null()))
            .for_each(|state| {
                debug!(state = ?state.to_plain(), "state changed");
                async {}
            }),
    );

    let app = ConsoleView::new("app");
    let provider = StoreProvider::mount(store.store_ref(), app.clone());

    let fetch_user = ActionCreator::new(FETCH_USER, |args| {
        let id = args.first().and_then(Value::as_i64)?;
        Some(Deferred::new(load_user(id)).into())
    });
    let options = ConnectOptions::new()
        .map_state(|state, _| {
            mapped_state! {
                "loading" => state.get("loading").cloned(),
                "user" => state.get("user").cloned(),
                "error" => state.get("error").cloned(),
            }
        })
        .watch(["loading", "user", "error"])
        .map_dispatch(vec![fetch_user])
        .emit_events(true);
    let profile = ConsoleView::new("profile");
    let subscription = connect(options).mount(&provider.scope().child(), profile.clone())?;

    info!("==========================================");
    if let Some(Dispatched::Settling(settlement)) = profile.call(FETCH_USER, &[Value::from(1)]) {
        info!(loading = ?profile.get("loading"), "fetch started");
        let user = settlement.await?;
        info!(?user, "fetch fulfilled");
    }

    info!("==========================================");
    let visit_and_fetch = Thunk::new(|api, _| {
        api.dispatch(Action::new("VISIT"));
        api.dispatch(Action::new("VISIT"));
        match api.dispatch(Action::new(FETCH_USER).with_payload(Deferred::new(load_user(0)))) {
            Dispatched::Settling(settlement) => Value::from(settlement.origin().expanded).into(),
            _ => Value::Null.into(),
        }
    });
    let returned = store.dispatch(visit_and_fetch.into());
    info!(?returned, "thunk returned");

    sleep(Duration::from_millis(100)).await;
    info!(
        error = ?profile.get("error"),
        visits = ?store.get_state().get("visits"),
        "after rejection"
    );

    watcher.await?;

    subscription.destroy();
    provider.destroy();
    info!("Finish");
    Ok(())
}
