use crate::action::{Action, Phase};
use crate::error::RegistryError;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub type ReduceFn = Arc<dyn Fn(&Value, &Action) -> Value + Send + Sync>;

type HandlerFn = dyn Fn(&ReducerMap, &Value, &Action) -> Value + Send + Sync;

/// Reducer keyed by action type.
///
/// Unknown types return the incoming state as-is, so an immutable state keeps its identity.
#[derive(Clone, Default)]
pub struct ReducerMap {
    handlers: HashMap<String, Arc<HandlerFn>>,
}

impl ReducerMap {
    pub fn new() -> Self {
        ReducerMap::default()
    }

    pub fn on<F>(self, kind: impl ToString, reduce: F) -> Self
    where
        F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        self.on_with(kind, move |_, state, action| reduce(state, action))
    }

    /// Registers a handler that is handed the table, so it can [`exec`](ReducerMap::exec)
    /// other handlers.
    pub fn on_with<F>(mut self, kind: impl ToString, reduce: F) -> Self
    where
        F: Fn(&ReducerMap, &Value, &Action) -> Value + Send + Sync + 'static,
    {
        self.handlers.insert(kind.to_string(), Arc::new(reduce));
        self
    }

    /// Registers the same handler for several types.
    pub fn on_each<F>(mut self, kinds: &[&str], reduce: F) -> Self
    where
        F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        let reduce: Arc<HandlerFn> = Arc::new(move |_, state, action| reduce(state, action));
        for kind in kinds {
            self.handlers.insert(kind.to_string(), reduce.clone());
        }
        self
    }

    /// Registers a handler for one lifecycle phase of a deferred action type.
    pub fn on_phase<F>(self, kind: impl ToString, phase: Phase, reduce: F) -> Self
    where
        F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
    {
        let kind = phase.kind_of(&kind.to_string());
        self.on(kind, reduce)
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn reduce(&self, state: &Value, action: &Action) -> Value {
        match self.handlers.get(&action.kind) {
            Some(reduce) => reduce(self, state, action),
            None => state.clone(),
        }
    }

    /// Runs the handler registered for `kind` with `action`, whatever the action's own type.
    pub fn exec(
        &self,
        kind: &str,
        state: &Value,
        action: &Action,
    ) -> Result<Value, RegistryError> {
        if state.is_null() {
            return Err(RegistryError::NullState);
        }
        let reduce = self
            .handlers
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownType(kind.to_string()))?;
        Ok(reduce(self, state, action))
    }

    pub fn into_reducer(self) -> ReduceFn {
        Arc::new(move |state, action| self.reduce(state, action))
    }
}
