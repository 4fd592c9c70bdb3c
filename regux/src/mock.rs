//! Test doubles for the store, the host component and the tick primitive.

use crate::action::{Action, Dispatchable, Dispatched};
use crate::compare::ChangePatch;
use crate::component::{Binding, Component, RenderData};
use crate::lock;
use crate::middleware::{apply_middleware, Middleware};
use crate::provider::Tick;
use crate::reducer::ReduceFn;
use crate::store::{DispatchFn, Listener, MiddlewareApi, Store, StoreRef, Unsubscribe};
use crate::value::Value;
use futures_core::Stream;
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tracing::warn;

/// Something that happened to a [`MockStore`].
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// An action reached the reducer.
    Dispatch {
        action: Action,
        old_state: Value,
        new_state: Value,
    },
    /// Listeners were notified without a dispatch.
    Notify,
}

struct StoreInner {
    state: Mutable<Value>,
    reducer: ReduceFn,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    operations: Mutex<Vec<StoreOperation>>,
    chain: OnceLock<DispatchFn>,
}

impl StoreInner {
    fn dispatch(&self, action: Dispatchable) -> Dispatched {
        match self.chain.get() {
            Some(chain) => chain(action),
            None => self.reduce(action),
        }
    }

    fn reduce(&self, action: Dispatchable) -> Dispatched {
        let action = match action {
            Dispatchable::Action(action) => action,
            Dispatchable::Thunk(_) => {
                warn!("thunk dispatched to a store without a thunk middleware, dropping");
                return Dispatched::Dropped;
            }
        };

        let (old_state, new_state) = {
            let mut state = self.state.lock_mut();
            let old_state = (*state).clone();
            let new_state = (self.reducer)(&old_state, &action);
            *state = new_state.clone();
            (old_state, new_state)
        };
        lock(&self.operations).push(StoreOperation::Dispatch {
            action: action.clone(),
            old_state,
            new_state,
        });

        self.notify_listeners();
        Dispatched::Action(action)
    }

    fn notify_listeners(&self) {
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

/// An in-memory reducer store with a middleware chain and a recorded history.
#[derive(Clone)]
pub struct MockStore {
    inner: Arc<StoreInner>,
}

impl MockStore {
    pub fn new<R>(initial_state: Value, reducer: R) -> Self
    where
        R: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        MockStore::with_middleware(initial_state, reducer, Vec::new())
    }

    /// Middlewares run in order, first one outermost.
    pub fn with_middleware<R>(
        initial_state: Value,
        reducer: R,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> Self
    where
        R: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        let inner = Arc::new(StoreInner {
            state: Mutable::new(initial_state),
            reducer: Arc::new(reducer),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            operations: Mutex::new(Vec::new()),
            chain: OnceLock::new(),
        });

        if !middlewares.is_empty() {
            let weak = Arc::downgrade(&inner);
            let base: DispatchFn = {
                let weak = weak.clone();
                Arc::new(move |action| match weak.upgrade() {
                    Some(inner) => inner.reduce(action),
                    None => Dispatched::Dropped,
                })
            };
            let api = MiddlewareApi::new(
                {
                    let weak = weak.clone();
                    Arc::new(move |action| match weak.upgrade() {
                        Some(inner) => inner.dispatch(action),
                        None => Dispatched::Dropped,
                    })
                },
                Arc::new(move || {
                    weak.upgrade()
                        .map(|inner| inner.state.get_cloned())
                        .unwrap_or_default()
                }),
            );
            let _ = inner.chain.set(apply_middleware(&middlewares, base, &api));
        }

        MockStore { inner }
    }

    pub fn store_ref(&self) -> StoreRef {
        Arc::new(self.clone())
    }

    /// Notifies every listener without changing state.
    pub fn notify(&self) {
        lock(&self.inner.operations).push(StoreOperation::Notify);
        self.inner.notify_listeners();
    }

    /// Swaps the state without a dispatch, then notifies.
    pub fn replace_state(&self, state: Value) {
        self.inner.state.set(state);
        self.notify();
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    pub fn operations(&self) -> Vec<StoreOperation> {
        lock(&self.inner.operations).clone()
    }

    pub fn clear_operations(&self) {
        lock(&self.inner.operations).clear();
    }

    /// Actions that reached the reducer, in order.
    pub fn dispatched(&self) -> Vec<Action> {
        lock(&self.inner.operations)
            .iter()
            .filter_map(|operation| match operation {
                StoreOperation::Dispatch { action, .. } => Some(action.clone()),
                StoreOperation::Notify => None,
            })
            .collect()
    }

    pub fn dispatched_kinds(&self) -> Vec<String> {
        self.dispatched()
            .into_iter()
            .map(|action| action.kind)
            .collect()
    }

    pub fn to_signal(&self) -> MutableSignalCloned<Value> {
        self.inner.state.signal_cloned()
    }

    /// Yields the current state, then each state it changes to. Intermediate states may be skipped.
    pub fn to_stream(&self) -> impl Stream<Item = Value> {
        self.inner.state.signal_cloned().to_stream()
    }
}

impl Store for MockStore {
    fn get_state(&self) -> Value {
        self.inner.state.get_cloned()
    }

    fn dispatch(&self, action: Dispatchable) -> Dispatched {
        self.inner.dispatch(action)
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, listener));
        let inner: Weak<StoreInner> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner.listeners).retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }
}

/// A host component that records everything done to it.
#[derive(Default)]
pub struct MockComponent {
    data: Mutex<RenderData>,
    patches: Mutex<Vec<ChangePatch>>,
    events: Mutex<Vec<String>>,
    bindings: Mutex<HashMap<String, Binding>>,
    has_refs: AtomicBool,
    refreshes: AtomicUsize,
}

impl MockComponent {
    pub fn new() -> Arc<Self> {
        Arc::new(MockComponent::default())
    }

    /// A component whose child elements are available.
    pub fn with_refs() -> Arc<Self> {
        let component = MockComponent::default();
        component.has_refs.store(true, Ordering::SeqCst);
        Arc::new(component)
    }

    pub fn data(&self) -> RenderData {
        lock(&self.data).clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.data).get(key).cloned()
    }

    pub fn patches(&self) -> Vec<ChangePatch> {
        lock(&self.patches).clone()
    }

    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }

    pub fn event_count(&self, event: &str) -> usize {
        lock(&self.events).iter().filter(|e| *e == event).count()
    }

    pub fn binding(&self, name: &str) -> Option<Binding> {
        lock(&self.bindings).get(name).cloned()
    }

    pub fn binding_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.bindings).keys().cloned().collect();
        names.sort();
        names
    }

    /// Calls the action binding `name` with `args`.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Dispatched> {
        let bound = self.binding(name)?.as_action()?.clone();
        Some(bound(args))
    }

    /// Dispatches through the dispatch binding `name`.
    pub fn dispatch_via(&self, name: &str, action: impl Into<Dispatchable>) -> Option<Dispatched> {
        let dispatch = self.binding(name)?.as_dispatch()?.clone();
        Some(dispatch(action.into()))
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl Component for MockComponent {
    fn apply_patch(&self, patch: ChangePatch) {
        lock(&self.patches).push(patch.clone());
        lock(&self.data).merge(patch);
    }

    fn emit(&self, event: &str) {
        lock(&self.events).push(event.to_string());
    }

    fn has_refs(&self) -> bool {
        self.has_refs.load(Ordering::SeqCst)
    }

    fn bind(&self, name: &str, binding: Binding) {
        lock(&self.bindings).insert(name.to_string(), binding);
    }

    fn refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// A tick primitive driven by hand.
#[derive(Default)]
pub struct ManualTick {
    tasks: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl ManualTick {
    pub fn new() -> Arc<Self> {
        Arc::new(ManualTick::default())
    }

    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Runs every task queued so far and returns how many ran.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<_> = lock(&self.tasks).drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Tick for ManualTick {
    fn next_tick(&self, task: Box<dyn FnOnce() + Send>) {
        lock(&self.tasks).push_back(task);
    }
}

/// Assertion helpers for tests.
pub mod assert {
    use super::*;

    /// Asserts the reducer saw exactly these action types, in order.
    pub fn assert_dispatched(store: &MockStore, expected: &[&str]) {
        let kinds = store.dispatched_kinds();
        assert_eq!(kinds, expected, "dispatched actions differ");
    }

    pub fn assert_state(store: &MockStore, expected: &Value) {
        let state = store.get_state();
        assert_eq!(&state, expected, "store state differs");
    }

    pub fn assert_data(component: &MockComponent, key: &str, expected: impl Into<Value>) {
        let expected = expected.into();
        assert_eq!(
            component.get(key).as_ref(),
            Some(&expected),
            "render data at {key:?} differs"
        );
    }

    pub fn assert_emitted(component: &MockComponent, event: &str, times: usize) {
        assert_eq!(
            component.event_count(event),
            times,
            "{event} emitted {} times, expected {times}",
            component.event_count(event)
        );
    }
}
