use crate::action::{Dispatchable, Dispatched};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

pub type DispatchFn = Arc<dyn Fn(Dispatchable) -> Dispatched + Send + Sync>;
pub type GetStateFn = Arc<dyn Fn() -> Value + Send + Sync>;
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// The capabilities this crate needs from a store.
///
/// The store itself lives elsewhere; connected components only read it, subscribe to it
/// and dispatch into it.
pub trait Store: Send + Sync + 'static {
    fn get_state(&self) -> Value;

    fn dispatch(&self, action: Dispatchable) -> Dispatched;

    fn subscribe(&self, listener: Listener) -> Unsubscribe;
}

pub type StoreRef = Arc<dyn Store>;

/// Handle that removes a listener. Consumed on use, so it runs at most once.
pub struct Unsubscribe(Box<dyn FnOnce() + Send>);

impl Unsubscribe {
    pub fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Unsubscribe(Box::new(f))
    }

    pub fn noop() -> Self {
        Unsubscribe::new(|| {})
    }

    pub fn unsubscribe(self) {
        (self.0)()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe(..)")
    }
}

/// The slice of a store a middleware or thunk may use.
#[derive(Clone)]
pub struct MiddlewareApi {
    pub dispatch: DispatchFn,
    pub get_state: GetStateFn,
}

impl MiddlewareApi {
    pub fn new(dispatch: DispatchFn, get_state: GetStateFn) -> Self {
        MiddlewareApi {
            dispatch,
            get_state,
        }
    }

    /// Builds an api that reads from and dispatches into `store`.
    pub fn for_store(store: StoreRef) -> Self {
        let reader = store.clone();
        MiddlewareApi {
            dispatch: dispatch_fn(store),
            get_state: Arc::new(move || reader.get_state()),
        }
    }

    pub fn dispatch(&self, action: impl Into<Dispatchable>) -> Dispatched {
        (self.dispatch)(action.into())
    }

    pub fn get_state(&self) -> Value {
        (self.get_state)()
    }
}

impl fmt::Debug for MiddlewareApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MiddlewareApi(..)")
    }
}

/// A shareable function that dispatches into `store`.
pub fn dispatch_fn(store: StoreRef) -> DispatchFn {
    Arc::new(move |action| store.dispatch(action))
}
