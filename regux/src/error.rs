use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Configuration errors raised while mounting a connected component.
///
/// These are programming mistakes, so they surface synchronously from
/// [`Connector::mount`](crate::Connector::mount) instead of being defaulted.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ConnectError {
    /// No scope in the component's ancestry provides a store.
    #[error("no StoreProvider ancestor: the component must be mounted under a scope that provides a store")]
    NoProvider,

    /// A watched path was neither a string nor an array of strings.
    #[error("expected watched path to be a string or an array of strings, got {0}")]
    InvalidWatchPath(String),
}

impl ConnectError {
    /// Returns true if no store could be resolved.
    pub fn is_no_provider(&self) -> bool {
        matches!(self, ConnectError::NoProvider)
    }

    /// Returns true if a watched path entry was malformed.
    pub fn is_invalid_watch_path(&self) -> bool {
        matches!(self, ConnectError::InvalidWatchPath(_))
    }
}

/// Misuse of an action registry or a reducer table.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum RegistryError {
    /// `add` names the registry operation and cannot be an action type.
    #[error("\"{0}\" is not allowed as an action type")]
    ReservedType(String),

    /// No reducer handler is registered for the type.
    #[error("no reducer handler registered for {0}")]
    UnknownType(String),

    #[error("expected state to be non-null")]
    NullState,
}

impl RegistryError {
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, RegistryError::UnknownType(_))
    }
}

/// An error-typed failure carried by a rejected action.
///
/// Cheap to clone so the same failure can be both dispatched in a `_REJECTED`
/// action and re-raised to whoever awaits the dispatch.
#[derive(Clone)]
pub struct ActionError(Arc<dyn StdError + Send + Sync + 'static>);

impl ActionError {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ActionError(Arc::new(error))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        ActionError::new(Message(message.into()))
    }

    /// Attempts to view the underlying error as `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn ptr_eq(&self, other: &ActionError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionError").field(&self.0).finish()
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

#[derive(Error, Debug)]
#[error("{0}")]
struct Message(String);
