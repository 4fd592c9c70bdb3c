mod action;
mod classify;
mod compare;
mod component;
mod connect;
mod deferred;
mod error;
mod middleware;
mod provider;
mod reducer;
mod store;
mod value;
pub mod macros;
pub mod mock;

pub use action::*;
pub use classify::*;
pub use compare::*;
pub use component::*;
pub use connect::*;
pub use deferred::*;
pub use error::*;
pub use middleware::*;
pub use provider::*;
pub use reducer::*;
pub use store::*;
pub use value::*;

#[cfg(test)]
mod unit_tests;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
