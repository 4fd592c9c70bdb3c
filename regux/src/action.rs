use crate::deferred::{Deferred, Settlement, Thunk};
use crate::error::{ActionError, RegistryError};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const PENDING_SUFFIX: &str = "_PENDING";
pub const FULFILLED_SUFFIX: &str = "_FULFILLED";
pub const REJECTED_SUFFIX: &str = "_REJECTED";

/// The three phases a deferred action expands into.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Phase {
    Pending,
    Fulfilled,
    Rejected,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Pending, Phase::Fulfilled, Phase::Rejected];

    pub const fn suffix(self) -> &'static str {
        match self {
            Phase::Pending => PENDING_SUFFIX,
            Phase::Fulfilled => FULFILLED_SUFFIX,
            Phase::Rejected => REJECTED_SUFFIX,
        }
    }

    /// The action type for this phase of `base`.
    pub fn kind_of(self, base: &str) -> String {
        format!("{base}{}", self.suffix())
    }

    /// The phase encoded in an action type's suffix, if any.
    pub fn of(kind: &str) -> Option<Phase> {
        Phase::ALL
            .into_iter()
            .find(|phase| kind.ends_with(phase.suffix()))
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Phase::Fulfilled | Phase::Rejected)
    }
}

/// What an action carries.
///
/// `Deferred`, `Thunk` and a `Promised` whose `promise` is one of those are the
/// shapes the promise middleware expands; everything else passes through.
#[derive(Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    Value(Value),
    Error(ActionError),
    Deferred(Deferred),
    Thunk(Thunk),
    /// A deferred computation plus optional optimistic data for the pending phase.
    Promised {
        promise: Box<Payload>,
        data: Option<Value>,
    },
}

impl Payload {
    pub fn promised(promise: impl Into<Payload>, data: Option<Value>) -> Self {
        Payload::Promised {
            promise: Box::new(promise.into()),
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// True for a promise or a callable.
    pub fn is_deferred_shaped(&self) -> bool {
        matches!(self, Payload::Deferred(_) | Payload::Thunk(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ActionError> {
        match self {
            Payload::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Payload::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Payload::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Payload::Deferred(_) => f.write_str("Deferred(..)"),
            Payload::Thunk(_) => f.write_str("Thunk(..)"),
            Payload::Promised { promise, data } => f
                .debug_struct("Promised")
                .field("promise", promise)
                .field("data", data)
                .finish(),
        }
    }
}

macro_rules! payload_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Payload::Value(value.into())
                }
            }
        )+
    };
}

payload_from_value!(
    Value,
    bool,
    i32,
    i64,
    u32,
    f64,
    &str,
    String,
    Vec<Value>,
    std::collections::BTreeMap<String, Value>,
    crate::value::Immutable,
);

impl From<Deferred> for Payload {
    fn from(deferred: Deferred) -> Self {
        Payload::Deferred(deferred)
    }
}

impl From<Thunk> for Payload {
    fn from(thunk: Thunk) -> Self {
        Payload::Thunk(thunk)
    }
}

impl From<ActionError> for Payload {
    fn from(error: ActionError) -> Self {
        Payload::Error(error)
    }
}

/// A dispatched action: a `type` string plus payload.
#[derive(Debug, Clone, Default)]
pub struct Action {
    pub kind: String,
    pub payload: Payload,
    pub error: bool,
    /// Set once the promise middleware has expanded this action into a lifecycle.
    pub expanded: bool,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Action {
            kind: kind.into(),
            ..Action::default()
        }
    }

    pub fn with_payload(self, payload: impl Into<Payload>) -> Self {
        Action {
            payload: payload.into(),
            ..self
        }
    }

    pub fn with_error(self, error: bool) -> Self {
        Action { error, ..self }
    }

    /// The lifecycle action of `base` for `phase`.
    pub fn phase_of(base: &str, phase: Phase, payload: impl Into<Payload>) -> Self {
        Action::new(phase.kind_of(base))
            .with_payload(payload)
            .with_error(phase == Phase::Rejected)
    }

    pub fn phase(&self) -> Option<Phase> {
        Phase::of(&self.kind)
    }

    /// The type without its lifecycle suffix.
    pub fn base_kind(&self) -> &str {
        match self.phase() {
            Some(phase) => &self.kind[..self.kind.len() - phase.suffix().len()],
            None => &self.kind,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        self.payload.as_value()
    }
}

/// What can be handed to `dispatch`.
#[derive(Debug, Clone)]
pub enum Dispatchable {
    Action(Action),
    Thunk(Thunk),
}

impl Dispatchable {
    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Dispatchable::Action(action) => Some(action),
            Dispatchable::Thunk(_) => None,
        }
    }
}

impl From<Action> for Dispatchable {
    fn from(action: Action) -> Self {
        Dispatchable::Action(action)
    }
}

impl From<Thunk> for Dispatchable {
    fn from(thunk: Thunk) -> Self {
        Dispatchable::Thunk(thunk)
    }
}

/// The result of a dispatch.
#[derive(Debug)]
pub enum Dispatched {
    /// The action reached the reducer (or was forwarded unchanged).
    Action(Action),
    /// A deferred action is settling; await for its result.
    Settling(Settlement),
    /// A thunk ran and returned this.
    Returned(Payload),
    /// Nothing was dispatched.
    Dropped,
}

impl Dispatched {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Dispatched::Dropped)
    }

    pub fn action(&self) -> Option<&Action> {
        match self {
            Dispatched::Action(action) => Some(action),
            Dispatched::Settling(settlement) => Some(settlement.origin()),
            _ => None,
        }
    }

    pub fn into_settlement(self) -> Option<Settlement> {
        match self {
            Dispatched::Settling(settlement) => Some(settlement),
            _ => None,
        }
    }
}

type BuildFn = dyn Fn(&[Value]) -> Option<Payload> + Send + Sync;

/// A named action factory.
///
/// Its string form is the action type, so bound wrappers and reducers can key on it,
/// and it exposes the three lifecycle types of that action.
#[derive(Clone)]
pub struct ActionCreator {
    kind: String,
    build: Arc<BuildFn>,
}

impl ActionCreator {
    /// `build` turns call arguments into a payload; `None` dispatches nothing.
    pub fn new<F>(kind: impl Into<String>, build: F) -> Self
    where
        F: Fn(&[Value]) -> Option<Payload> + Send + Sync + 'static,
    {
        ActionCreator {
            kind: kind.into(),
            build: Arc::new(build),
        }
    }

    /// A creator that always produces the same payload.
    pub fn constant(kind: impl Into<String>, payload: impl Into<Payload>) -> Self {
        let payload = payload.into();
        ActionCreator::new(kind, move |_| Some(payload.clone()))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn pending(&self) -> String {
        Phase::Pending.kind_of(&self.kind)
    }

    pub fn fulfilled(&self) -> String {
        Phase::Fulfilled.kind_of(&self.kind)
    }

    pub fn rejected(&self) -> String {
        Phase::Rejected.kind_of(&self.kind)
    }

    pub fn create(&self, args: &[Value]) -> Option<Action> {
        (self.build)(args).map(|payload| Action::new(self.kind.clone()).with_payload(payload))
    }
}

impl fmt::Display for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Registry operation name that cannot double as an action type.
pub const RESERVED_ACTION_TYPE: &str = "add";

/// A set of action creators keyed by their type.
#[derive(Debug, Clone, Default)]
pub struct ActionCreators {
    creators: BTreeMap<String, ActionCreator>,
}

impl ActionCreators {
    pub fn new() -> Self {
        ActionCreators::default()
    }

    pub fn from_creators<I>(creators: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ActionCreator>,
    {
        let mut registry = ActionCreators::new();
        for creator in creators {
            registry.add(creator)?;
        }
        Ok(registry)
    }

    /// Registers `creator`, replacing any creator of the same type.
    pub fn add(&mut self, creator: ActionCreator) -> Result<(), RegistryError> {
        if creator.kind == RESERVED_ACTION_TYPE {
            return Err(RegistryError::ReservedType(creator.kind));
        }
        self.creators.insert(creator.kind.clone(), creator);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&ActionCreator> {
        self.creators.get(kind)
    }

    pub fn create(&self, kind: &str, args: &[Value]) -> Option<Action> {
        self.get(kind)?.create(args)
    }

    /// All creators, ordered by type, ready for `ConnectOptions::map_dispatch`.
    pub fn creators(&self) -> Vec<ActionCreator> {
        self.creators.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}
