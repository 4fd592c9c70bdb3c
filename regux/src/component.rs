use crate::action::Dispatched;
use crate::compare::ChangePatch;
use crate::error::ConnectError;
use crate::store::{DispatchFn, StoreRef};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type BoundAction = Arc<dyn Fn(&[Value]) -> Dispatched + Send + Sync>;

/// A function installed on a component by the connector.
#[derive(Clone)]
pub enum Binding {
    /// Forwards to the store's dispatch.
    Dispatch(DispatchFn),
    /// Builds an action from the call arguments and dispatches it.
    Action(BoundAction),
}

impl Binding {
    pub fn as_dispatch(&self) -> Option<&DispatchFn> {
        match self {
            Binding::Dispatch(dispatch) => Some(dispatch),
            Binding::Action(_) => None,
        }
    }

    pub fn as_action(&self) -> Option<&BoundAction> {
        match self {
            Binding::Action(action) => Some(action),
            Binding::Dispatch(_) => None,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Dispatch(_) => f.write_str("Binding::Dispatch(..)"),
            Binding::Action(_) => f.write_str("Binding::Action(..)"),
        }
    }
}

/// The host component as seen by the connector and the store provider.
///
/// Only `apply_patch` is required; the rest default to no-ops for components that
/// do not take part in events, bindings or refreshes.
pub trait Component: Send + Sync + 'static {
    /// Shallow-merges `patch` into the component's render data.
    fn apply_patch(&self, patch: ChangePatch);

    fn emit(&self, _event: &str) {}

    /// Whether child elements are available.
    fn has_refs(&self) -> bool {
        false
    }

    fn bind(&self, _name: &str, _binding: Binding) {}

    /// Re-renders the component.
    fn refresh(&self) {}
}

/// Key/value data a component renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderData(BTreeMap<String, Value>);

impl RenderData {
    pub fn new() -> Self {
        RenderData::default()
    }

    pub fn merge(&mut self, patch: ChangePatch) {
        self.0.extend(patch);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

/// Construction-time context a component is mounted in.
///
/// A scope may provide a store itself or inherit one from its ancestors.
#[derive(Clone, Default)]
pub struct Scope {
    store: Option<StoreRef>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// A scope with no store anywhere in its ancestry.
    pub fn root() -> Self {
        Scope::default()
    }

    pub fn with_store(store: StoreRef) -> Self {
        Scope {
            store: Some(store),
            parent: None,
        }
    }

    /// A nested scope that inherits from this one.
    pub fn child(&self) -> Scope {
        Scope {
            store: None,
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// A nested scope that provides its own store.
    pub fn child_with_store(&self, store: StoreRef) -> Scope {
        Scope {
            store: Some(store),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn store(&self) -> Option<&StoreRef> {
        self.store.as_ref()
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.parent.as_deref()
    }

    /// The nearest store in this scope or its ancestors.
    pub fn resolve_store(&self) -> Result<StoreRef, ConnectError> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(store) = current.store() {
                return Ok(store.clone());
            }
            scope = current.parent();
        }
        Err(ConnectError::NoProvider)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("provides_store", &self.store.is_some())
            .field("parent", &self.parent)
            .finish()
    }
}
