use crate::action::{Action, Payload};
use crate::error::ActionError;
use crate::store::MiddlewareApi;
use crate::value::Value;
use futures::future::{BoxFuture, FutureExt, Shared};
use pin_project::pin_project;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Why a deferred computation failed.
///
/// `Error` is an unexpected failure and is re-raised to the dispatcher; `Reason` is
/// expected domain data (a plain rejection value) and is handed back as a value.
#[derive(Debug, Clone)]
pub enum Rejection {
    Error(ActionError),
    Reason(Value),
}

impl Rejection {
    pub fn error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Rejection::Error(ActionError::new(error))
    }

    pub fn reason(reason: impl Into<Value>) -> Self {
        Rejection::Reason(reason.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Rejection::Error(_))
    }

    /// The payload of the `_REJECTED` action.
    pub fn to_payload(&self) -> Payload {
        match self {
            Rejection::Error(error) => Payload::Error(error.clone()),
            Rejection::Reason(reason) => Payload::Value(reason.clone()),
        }
    }
}

impl From<ActionError> for Rejection {
    fn from(error: ActionError) -> Self {
        Rejection::Error(error)
    }
}

impl From<Value> for Rejection {
    fn from(reason: Value) -> Self {
        Rejection::Reason(reason)
    }
}

impl From<&str> for Rejection {
    fn from(reason: &str) -> Self {
        Rejection::Reason(reason.into())
    }
}

impl From<String> for Rejection {
    fn from(reason: String) -> Self {
        Rejection::Reason(reason.into())
    }
}

/// Conversion of a computation's output into a settlement.
pub trait Settle {
    fn settle(self) -> Result<Value, Rejection>;
}

impl Settle for Value {
    fn settle(self) -> Result<Value, Rejection> {
        Ok(self)
    }
}

impl Settle for () {
    fn settle(self) -> Result<Value, Rejection> {
        Ok(Value::Null)
    }
}

macro_rules! settle_as_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Settle for $ty {
                fn settle(self) -> Result<Value, Rejection> {
                    Ok(self.into())
                }
            }
        )+
    };
}

settle_as_value!(bool, i32, i64, u32, f64, &'static str, String, Vec<Value>, crate::value::Immutable);

impl<V: Into<Value>> Settle for Option<V> {
    fn settle(self) -> Result<Value, Rejection> {
        Ok(self.map(Into::into).unwrap_or(Value::Null))
    }
}

impl<V, E> Settle for Result<V, E>
where
    V: Into<Value>,
    E: Into<Rejection>,
{
    fn settle(self) -> Result<Value, Rejection> {
        self.map(Into::into).map_err(Into::into)
    }
}

type SettleFuture = Shared<BoxFuture<'static, Result<Value, Rejection>>>;

/// A promise-like value: a computation that settles once and can be awaited by many.
#[derive(Clone)]
pub struct Deferred(SettleFuture);

impl Deferred {
    pub fn new<F, R>(computation: F) -> Self
    where
        F: Future<Output = R> + Send + 'static,
        R: Settle + 'static,
    {
        Deferred(computation.map(Settle::settle).boxed().shared())
    }

    pub fn resolved(value: impl Into<Value>) -> Self {
        let value = value.into();
        Deferred::new(async move { value })
    }

    pub fn rejected(rejection: impl Into<Rejection>) -> Self {
        let rejection = rejection.into();
        Deferred::new(async move { Err::<Value, Rejection>(rejection) })
    }

    /// Waits for the computation to settle.
    pub async fn settle(self) -> Result<Value, Rejection> {
        self.0.await
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// Opaque extra argument handed to thunks.
#[derive(Clone, Default)]
pub struct Extra(Option<Arc<dyn Any + Send + Sync>>);

impl Extra {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Extra(Some(Arc::new(value)))
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.downcast_ref::<T>())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Extra(..)"),
            None => f.write_str("Extra(None)"),
        }
    }
}

type ThunkFn = dyn Fn(&MiddlewareApi, &Extra) -> Payload + Send + Sync;

/// A callable payload or action, invoked with `dispatch`, `get_state` and the extra argument.
#[derive(Clone)]
pub struct Thunk(Arc<ThunkFn>);

impl Thunk {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MiddlewareApi, &Extra) -> Payload + Send + Sync + 'static,
    {
        Thunk(Arc::new(f))
    }

    /// A thunk that starts `computation` each time it is called.
    pub fn deferred<F, Fut, R>(computation: F) -> Self
    where
        F: Fn(&MiddlewareApi, &Extra) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Settle + 'static,
    {
        Thunk::new(move |api, extra| Payload::Deferred(Deferred::new(computation(api, extra))))
    }

    pub fn call(&self, api: &MiddlewareApi, extra: &Extra) -> Payload {
        (self.0)(api, extra)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

/// The outcome of an expanded deferred action, resolving once the lifecycle is complete.
///
/// Resolves with the fulfilled value, or with the rejection reason when it was not an
/// error. Error-typed rejections come back as `Err`.
#[pin_project]
pub struct Settlement {
    origin: Action,
    #[pin]
    task: JoinHandle<Result<Value, ActionError>>,
}

impl Settlement {
    pub(crate) fn new(origin: Action, task: JoinHandle<Result<Value, ActionError>>) -> Self {
        Settlement { origin, task }
    }

    /// The dispatched action, marked as expanded.
    pub fn origin(&self) -> &Action {
        &self.origin
    }
}

impl Future for Settlement {
    type Output = Result<Value, ActionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.task.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) => Poll::Ready(Err(ActionError::new(join_error))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settlement")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
