use crate::action::{Action, Dispatchable, Dispatched, Payload, Phase};
use crate::deferred::{Deferred, Extra, Rejection, Settlement};
use crate::store::{DispatchFn, MiddlewareApi};
use crate::value::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A dispatch interceptor.
///
/// `next` continues down the chain; `api.dispatch` re-enters the chain from the top.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, action: Dispatchable, next: &DispatchFn, api: &MiddlewareApi) -> Dispatched;
}

/// Composes `middlewares` around `base`, first middleware outermost.
pub fn apply_middleware(
    middlewares: &[Arc<dyn Middleware>],
    base: DispatchFn,
    api: &MiddlewareApi,
) -> DispatchFn {
    middlewares.iter().rev().fold(base, |next, middleware| {
        let middleware = middleware.clone();
        let api = api.clone();
        let wrapped: DispatchFn = Arc::new(move |action| middleware.handle(action, &next, &api));
        wrapped
    })
}

/// Expands actions carrying deferred work into `_PENDING`, `_FULFILLED` and `_REJECTED` actions.
///
/// The pending action is dispatched synchronously. Settlement runs on a spawned tokio
/// task, so dispatching a deferred action requires a runtime; without one the action is
/// dropped with a warning and nothing is dispatched.
#[derive(Debug, Clone, Default)]
pub struct PromiseMiddleware {
    extra: Extra,
}

impl PromiseMiddleware {
    pub fn new() -> Self {
        PromiseMiddleware::default()
    }

    pub fn with_extra(extra: Extra) -> Self {
        PromiseMiddleware { extra }
    }

    fn start(&self, work: Payload, api: &MiddlewareApi) -> Option<Deferred> {
        match work {
            Payload::Deferred(deferred) => Some(deferred),
            Payload::Thunk(thunk) => match thunk.call(api, &self.extra) {
                Payload::Deferred(deferred) => Some(deferred),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Middleware for PromiseMiddleware {
    fn handle(&self, action: Dispatchable, next: &DispatchFn, api: &MiddlewareApi) -> Dispatched {
        let Dispatchable::Action(mut action) = action else {
            return next(action);
        };

        let (work, optimistic) = match &action.payload {
            payload if payload.is_deferred_shaped() => (payload.clone(), None),
            Payload::Promised { promise, data } if promise.is_deferred_shaped() => {
                ((**promise).clone(), data.clone())
            }
            _ => return next(Dispatchable::Action(action)),
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(kind = %action.kind, "no tokio runtime to settle a deferred action, dropping");
            return Dispatched::Dropped;
        };
        let Some(deferred) = self.start(work, api) else {
            debug!(kind = %action.kind, "deferred payload did not produce a promise, dropping");
            return Dispatched::Dropped;
        };

        action.expanded = true;
        let base = action.kind.clone();

        let pending = optimistic
            .filter(|data| !data.is_null())
            .unwrap_or(Value::Bool(true));
        debug!(kind = %base, "dispatching pending phase");
        api.dispatch(Action::phase_of(&base, Phase::Pending, pending));

        let dispatch = api.dispatch.clone();
        let task = runtime.spawn(async move {
            match deferred.settle().await {
                Ok(value) => {
                    debug!(kind = %base, "deferred action fulfilled");
                    dispatch(Action::phase_of(&base, Phase::Fulfilled, value.clone()).into());
                    Ok(value)
                }
                Err(rejection) => {
                    debug!(kind = %base, error = rejection.is_error(), "deferred action rejected");
                    dispatch(
                        Action::phase_of(&base, Phase::Rejected, rejection.to_payload()).into(),
                    );
                    match rejection {
                        Rejection::Error(error) => Err(error),
                        Rejection::Reason(reason) => Ok(reason),
                    }
                }
            }
        });

        Dispatched::Settling(Settlement::new(action, task))
    }
}

/// Runs dispatched thunks immediately and returns what they return.
#[derive(Debug, Clone, Default)]
pub struct ThunkMiddleware {
    extra: Extra,
}

impl ThunkMiddleware {
    pub fn new() -> Self {
        ThunkMiddleware::default()
    }

    pub fn with_extra(extra: Extra) -> Self {
        ThunkMiddleware { extra }
    }
}

impl Middleware for ThunkMiddleware {
    fn handle(&self, action: Dispatchable, next: &DispatchFn, api: &MiddlewareApi) -> Dispatched {
        match action {
            Dispatchable::Thunk(thunk) => Dispatched::Returned(thunk.call(api, &self.extra)),
            action => next(action),
        }
    }
}
