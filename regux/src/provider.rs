use crate::component::{Component, Scope};
use crate::lock;
use crate::store::{StoreRef, Unsubscribe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The host's "next tick" primitive.
pub trait Tick: Send + Sync + 'static {
    fn next_tick(&self, task: Box<dyn FnOnce() + Send>);
}

/// Runs the task after yielding once to the tokio scheduler.
///
/// Outside a runtime the task runs inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTick;

impl Tick for TokioTick {
    fn next_tick(&self, task: Box<dyn FnOnce() + Send>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, running the refresh inline");
            task();
            return;
        };
        runtime.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

/// Single-slot refresh queue: any number of marks between two flushes yield one refresh.
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    dirty: AtomicBool,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        RefreshScheduler::default()
    }

    /// Returns true if this mark made the slot dirty, i.e. a flush must be scheduled.
    pub fn mark_dirty(&self) -> bool {
        !self.dirty.swap(true, Ordering::AcqRel)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Runs `refresh` and clears the slot if it was dirty.
    pub fn flush_if_dirty<F: FnOnce()>(&self, refresh: F) -> bool {
        if self.dirty.swap(false, Ordering::AcqRel) {
            refresh();
            true
        } else {
            false
        }
    }
}

/// The top of a connected view tree.
///
/// Provides its store to descendants through [`scope`](StoreProvider::scope) and
/// refreshes the view at most once per tick however many notifications arrive.
pub struct StoreProvider {
    store: StoreRef,
    scheduler: Arc<RefreshScheduler>,
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl StoreProvider {
    pub fn mount(store: StoreRef, view: Arc<dyn Component>) -> Self {
        StoreProvider::mount_with(store, view, Arc::new(TokioTick))
    }

    pub fn mount_with(store: StoreRef, view: Arc<dyn Component>, tick: Arc<dyn Tick>) -> Self {
        let scheduler = Arc::new(RefreshScheduler::new());
        let listener = {
            let scheduler = scheduler.clone();
            Arc::new(move || {
                if !scheduler.mark_dirty() {
                    return;
                }
                let scheduler = scheduler.clone();
                let view = view.clone();
                tick.next_tick(Box::new(move || {
                    scheduler.flush_if_dirty(|| view.refresh());
                }));
            })
        };
        let unsubscribe = store.subscribe(listener);

        StoreProvider {
            store,
            scheduler,
            unsubscribe: Mutex::new(Some(unsubscribe)),
        }
    }

    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// The scope descendants are mounted in.
    pub fn scope(&self) -> Scope {
        Scope::with_store(self.store.clone())
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn destroy(&self) {
        if let Some(unsubscribe) = lock(&self.unsubscribe).take() {
            unsubscribe.unsubscribe();
            debug!("store provider destroyed");
        }
    }
}

impl Drop for StoreProvider {
    fn drop(&mut self) {
        self.destroy();
    }
}
