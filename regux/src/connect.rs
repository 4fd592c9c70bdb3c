use crate::action::{ActionCreator, Dispatched};
use crate::classify::is_immutable_value;
use crate::compare::{compare, ChangePatch, MappedState};
use crate::component::{Binding, BoundAction, Component, Scope};
use crate::error::ConnectError;
use crate::lock;
use crate::store::{dispatch_fn, DispatchFn, Store, StoreRef, Unsubscribe};
use crate::value::{same_opt, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub const CONNECTED_EVENT: &str = "rdx-connected";
pub const AFTER_CHANGED_EVENT: &str = "rdx-afterchanged";
pub const INJECTED_EVENT: &str = "rdx-injected";
pub const DEFAULT_DISPATCH_BINDING: &str = "$dispatch";
pub const DEFAULT_INJECTED_WAIT: Duration = Duration::from_millis(100);

type ProjectFn = dyn Fn(&Value, &Value) -> MappedState + Send + Sync;
type ShouldUpdateFn = dyn Fn(&Value, &Value) -> bool + Send + Sync;
type MapDispatchFn = dyn Fn(DispatchFn) -> Vec<(String, BoundAction)> + Send + Sync;

/// How store state becomes a component's mapped state.
#[derive(Clone)]
pub enum MapState {
    /// Called with `(next_state, previous_state)`.
    Project(Arc<ProjectFn>),
    /// A precomputed mapping. Expected to be immutable.
    Value(Value),
}

impl MapState {
    fn project(&self, next: &Value, previous: &Value) -> MappedState {
        match self {
            MapState::Project(project) => project(next, previous),
            MapState::Value(value) if is_immutable_value(value) => match value.to_plain() {
                Value::Map(mapped) => mapped,
                _ => MappedState::new(),
            },
            MapState::Value(value) => {
                error!("expected map_state to be a function or an immutable value");
                match value {
                    Value::Map(mapped) => mapped.clone(),
                    _ => MappedState::new(),
                }
            }
        }
    }
}

#[derive(Clone, Default)]
pub enum MapDispatch {
    #[default]
    None,
    /// Each creator is bound under its type string.
    Creators(Vec<ActionCreator>),
    /// Builds named bindings from the store's dispatch.
    With(Arc<MapDispatchFn>),
}

/// A state location whose change lets an update through.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WatchPath {
    Key(String),
    Path(Vec<String>),
}

impl WatchPath {
    /// Accepts a key, a dotted path string or a list of keys.
    pub fn parse(entry: &Value) -> Result<WatchPath, ConnectError> {
        match entry {
            Value::Str(path) if path.contains('.') => {
                Ok(WatchPath::Path(path.split('.').map(String::from).collect()))
            }
            Value::Str(key) => Ok(WatchPath::Key(key.clone())),
            Value::List(keys) => keys
                .iter()
                .map(|key| {
                    key.as_str()
                        .map(String::from)
                        .ok_or_else(|| ConnectError::InvalidWatchPath(format!("{entry:?}")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(WatchPath::Path),
            other => Err(ConnectError::InvalidWatchPath(format!("{other:?}"))),
        }
    }

    pub fn unchanged(&self, previous: &Value, next: &Value) -> bool {
        match self {
            WatchPath::Key(key) => same_opt(previous.get(key), next.get(key)),
            WatchPath::Path(path) => same_opt(previous.get_in(path), next.get_in(path)),
        }
    }
}

/// Everything `connect` can be configured with.
#[derive(Clone)]
pub struct ConnectOptions {
    map_state: MapState,
    should_update: Arc<ShouldUpdateFn>,
    watch: Vec<Value>,
    map_dispatch: MapDispatch,
    dispatch_binding: Option<String>,
    emit_events: bool,
    injected_wait: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            map_state: MapState::Project(Arc::new(|_, _| MappedState::new())),
            should_update: Arc::new(|_, _| true),
            watch: Vec::new(),
            map_dispatch: MapDispatch::None,
            dispatch_binding: Some(DEFAULT_DISPATCH_BINDING.to_string()),
            emit_events: false,
            injected_wait: DEFAULT_INJECTED_WAIT,
        }
    }
}

impl ConnectOptions {
    pub fn new() -> Self {
        ConnectOptions::default()
    }

    pub fn map_state<F>(self, project: F) -> Self
    where
        F: Fn(&Value, &Value) -> MappedState + Send + Sync + 'static,
    {
        ConnectOptions {
            map_state: MapState::Project(Arc::new(project)),
            ..self
        }
    }

    pub fn map_state_value(self, mapped: impl Into<Value>) -> Self {
        ConnectOptions {
            map_state: MapState::Value(mapped.into()),
            ..self
        }
    }

    /// Gate over `(previous_state, next_state)`; returning false skips the update.
    pub fn should_update<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        ConnectOptions {
            should_update: Arc::new(predicate),
            ..self
        }
    }

    /// Updates are skipped while every watched path is unchanged.
    pub fn watch<I, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        ConnectOptions {
            watch: entries.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn map_dispatch(self, creators: Vec<ActionCreator>) -> Self {
        ConnectOptions {
            map_dispatch: MapDispatch::Creators(creators),
            ..self
        }
    }

    pub fn map_dispatch_with<F>(self, bind: F) -> Self
    where
        F: Fn(DispatchFn) -> Vec<(String, BoundAction)> + Send + Sync + 'static,
    {
        ConnectOptions {
            map_dispatch: MapDispatch::With(Arc::new(bind)),
            ..self
        }
    }

    /// Installs the store's dispatch under `name` instead of `$dispatch`.
    pub fn dispatch_as(self, name: impl Into<String>) -> Self {
        ConnectOptions {
            dispatch_binding: Some(name.into()),
            ..self
        }
    }

    pub fn without_dispatch(self) -> Self {
        ConnectOptions {
            dispatch_binding: None,
            ..self
        }
    }

    pub fn emit_events(self, emit_events: bool) -> Self {
        ConnectOptions {
            emit_events,
            ..self
        }
    }

    pub fn injected_wait(self, injected_wait: Duration) -> Self {
        ConnectOptions {
            injected_wait,
            ..self
        }
    }
}

pub fn connect(options: ConnectOptions) -> Connector {
    Connector {
        options: Arc::new(options),
    }
}

/// Binds components to the store of the scope they are mounted in.
#[derive(Clone)]
pub struct Connector {
    options: Arc<ConnectOptions>,
}

impl Connector {
    /// Connects `component` to the nearest store in `scope`.
    ///
    /// The first projection is applied unconditionally. The returned subscription keeps
    /// the component connected until it is destroyed or dropped.
    pub fn mount(
        &self,
        scope: &Scope,
        component: Arc<dyn Component>,
    ) -> Result<Subscription, ConnectError> {
        let store = scope.resolve_store()?;

        let mut reconciler = Reconciler::new(self.options.clone());
        let mount_effects = reconciler.activate(store.get_state())?;

        self.install_bindings(&store, component.as_ref());

        let link = Arc::new(Mutex::new(reconciler));
        let listener = {
            let link = Arc::downgrade(&link);
            let store: Weak<dyn Store> = Arc::downgrade(&store);
            let component = component.clone();
            Arc::new(move || {
                let (Some(link), Some(store)) = (link.upgrade(), store.upgrade()) else {
                    return;
                };
                let next = store.get_state();
                // Released before touching the component so it may dispatch re-entrantly.
                let effects = lock(&link).notify(next);
                if let Some(effects) = effects {
                    effects.apply(component.as_ref());
                }
            })
        };
        let unsubscribe = store.subscribe(listener);

        // Bound and subscribed, so handlers of the mount events can dispatch.
        if let Some(effects) = mount_effects {
            effects.apply(component.as_ref());
        }

        if self.options.emit_events {
            let timer = InjectedTimer::schedule(component.clone(), self.options.injected_wait);
            lock(&link).injected_timer = Some(timer);
        }

        Ok(Subscription {
            link,
            store,
            unsubscribe: Mutex::new(Some(unsubscribe)),
        })
    }

    fn install_bindings(&self, store: &StoreRef, component: &dyn Component) {
        let dispatch = dispatch_fn(store.clone());

        if let Some(name) = &self.options.dispatch_binding {
            component.bind(name, Binding::Dispatch(dispatch.clone()));
        }

        match &self.options.map_dispatch {
            MapDispatch::None => {}
            MapDispatch::Creators(creators) => {
                for creator in creators {
                    let name = creator.to_string();
                    let creator = creator.clone();
                    let dispatch = dispatch.clone();
                    let bound: BoundAction = Arc::new(move |args: &[Value]| match creator.create(args) {
                        Some(action) => dispatch(action.into()),
                        None => Dispatched::Dropped,
                    });
                    component.bind(&name, Binding::Action(bound));
                }
            }
            MapDispatch::With(bind) => {
                for (name, bound) in bind(dispatch) {
                    component.bind(&name, Binding::Action(bound));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LinkState {
    Uninitialized,
    Active,
    Destroyed,
}

/// What a reconciliation wants done to the component.
#[derive(Default)]
struct Effects {
    patch: Option<ChangePatch>,
    events: Vec<&'static str>,
}

impl Effects {
    fn apply(self, component: &dyn Component) {
        if let Some(patch) = self.patch {
            component.apply_patch(patch);
        }
        for event in self.events {
            component.emit(event);
        }
    }
}

struct Reconciler {
    state: LinkState,
    options: Arc<ConnectOptions>,
    watch: Vec<WatchPath>,
    last_snapshot: Value,
    last_mapped: MappedState,
    has_emitted_connected: bool,
    injected_timer: Option<InjectedTimer>,
}

impl Reconciler {
    fn new(options: Arc<ConnectOptions>) -> Self {
        Reconciler {
            state: LinkState::Uninitialized,
            options,
            watch: Vec::new(),
            last_snapshot: Value::Null,
            last_mapped: MappedState::new(),
            has_emitted_connected: false,
            injected_timer: None,
        }
    }

    fn activate(&mut self, snapshot: Value) -> Result<Option<Effects>, ConnectError> {
        self.watch = self
            .options
            .watch
            .iter()
            .map(WatchPath::parse)
            .collect::<Result<_, _>>()?;
        self.last_snapshot = snapshot.clone();
        self.state = LinkState::Active;
        Ok(self.reconcile(snapshot, true))
    }

    fn notify(&mut self, next: Value) -> Option<Effects> {
        if self.state != LinkState::Active {
            return None;
        }
        if is_immutable_value(&self.last_snapshot) && self.last_snapshot.same(&next) {
            debug!("state unchanged, skipping notification");
            return None;
        }
        self.reconcile(next, false)
    }

    fn watched_unchanged(&self, previous: &Value, next: &Value) -> bool {
        !self.watch.is_empty() && self.watch.iter().all(|path| path.unchanged(previous, next))
    }

    /// `first` bypasses both gates.
    fn reconcile(&mut self, next: Value, first: bool) -> Option<Effects> {
        let previous = &self.last_snapshot;
        let accepted = (self.options.should_update)(previous, &next)
            && !self.watched_unchanged(previous, &next);
        if !accepted && !first {
            return None;
        }

        let mapped = self.options.map_state.project(&next, previous);
        let patch = compare(&self.last_mapped, &mapped);
        self.last_mapped = mapped;
        self.last_snapshot = next;

        let mut effects = Effects {
            patch: (!patch.is_empty()).then_some(patch),
            events: Vec::new(),
        };
        if self.options.emit_events {
            effects.events.push(AFTER_CHANGED_EVENT);
            if !self.has_emitted_connected {
                self.has_emitted_connected = true;
                effects.events.push(CONNECTED_EVENT);
            }
        }
        Some(effects)
    }
}

/// One-shot `rdx-injected` emission: on the next tick if child elements exist,
/// otherwise when the fallback wait elapses.
struct InjectedTimer {
    token: CancellationToken,
}

struct InjectedOnce {
    component: Arc<dyn Component>,
    fired: AtomicBool,
}

impl InjectedOnce {
    fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.component.emit(INJECTED_EVENT);
        }
    }
}

impl InjectedTimer {
    fn schedule(component: Arc<dyn Component>, wait: Duration) -> Self {
        let token = CancellationToken::new();
        let once = Arc::new(InjectedOnce {
            component,
            fired: AtomicBool::new(false),
        });

        if tokio::runtime::Handle::try_current().is_err() {
            warn!("no tokio runtime, emitting {INJECTED_EVENT} immediately");
            once.fire();
            token.cancel();
            return InjectedTimer { token };
        }

        let fallback = token.clone();
        let fallback_once = once.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = fallback.cancelled() => {}
                _ = tokio::time::sleep(wait) => fallback_once.fire(),
            }
        });

        let tick = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            if tick.is_cancelled() {
                return;
            }
            if once.component.has_refs() {
                tick.cancel();
                once.fire();
            }
        });

        InjectedTimer { token }
    }

    fn cancel(&self) {
        self.token.cancel();
    }
}

/// A mounted component's connection to its store.
pub struct Subscription {
    link: Arc<Mutex<Reconciler>>,
    store: StoreRef,
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl Subscription {
    pub fn state(&self) -> LinkState {
        lock(&self.link).state
    }

    pub fn is_active(&self) -> bool {
        self.state() == LinkState::Active
    }

    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Disconnects the component. Only the first call has an effect.
    pub fn destroy(&self) {
        let Some(unsubscribe) = lock(&self.unsubscribe).take() else {
            return;
        };
        {
            let mut link = lock(&self.link);
            link.state = LinkState::Destroyed;
            if let Some(timer) = link.injected_timer.take() {
                timer.cancel();
            }
        }
        unsubscribe.unsubscribe();
        debug!("connected component destroyed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.destroy();
    }
}
