//! # Runtime
//!
//! Tree-walking interpreter for compiled [`Program`](crate::codegen::Program)s. A [`Runtime`]
//! bundles the standard library, the event bus, the variable store and the cancellation token
//! that the lifecycle `stop` event trips.
//!
//! Everything runs on one task: subscriber bodies are queued when their event fires and driven
//! concurrently by [`Runtime::execute`] until none remain.

mod cancel;
pub mod eval;
mod event_bus;
mod executor;
pub mod stdlib;
mod variables;

pub use cancel::CancellationToken;
pub use eval::{eval_statement, EvalOperator};
pub use event_bus::{EventBus, Subscriber};
pub use executor::{DeferredBody, ExecutionSummary};
pub use stdlib::{Builtin, SegmentInputs, StandardLibrary};
pub use variables::VariableStore;

use crate::codegen::{BoundInput, Chain};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tokio::sync::Notify;

/// Fired once every top-level chain has registered its subscriptions.
pub const START_EVENT: &str = "start";
/// Trips the cancellation token; loops exit before their next iteration.
pub const STOP_EVENT: &str = "stop";

/// A body waiting to be driven by the executor.
struct PendingBody {
    chain: Rc<Chain>,
    label: String,
}

struct RuntimeInner {
    config: RuntimeConfig,
    library: StandardLibrary,
    bus: EventBus,
    variables: RefCell<VariableStore>,
    token: RefCell<CancellationToken>,
    pending: RefCell<VecDeque<PendingBody>>,
    wake: Notify,
    calls: Cell<usize>,
    failures: Cell<usize>,
}

/// Cheap-clone handle to one program's execution environment.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_library(StandardLibrary::new(), config)
    }

    pub fn with_library(library: StandardLibrary, config: RuntimeConfig) -> Self {
        let runtime = Self {
            inner: Rc::new(RuntimeInner {
                config,
                library,
                bus: EventBus::new(),
                variables: RefCell::new(VariableStore::new()),
                token: RefCell::new(CancellationToken::new()),
                pending: RefCell::new(VecDeque::new()),
                wake: Notify::new(),
                calls: Cell::new(0),
                failures: Cell::new(0),
            }),
        };

        let weak = runtime.downgrade();
        runtime.inner.bus.subscribe(STOP_EVENT, move |_| {
            if let Some(runtime) = Runtime::upgrade(&weak) {
                tracing::info!("[RUNTIME] Stop requested");
                runtime.cancellation_token().cancel();
            }
            Ok(())
        });

        runtime
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn library(&self) -> &StandardLibrary {
        &self.inner.library
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn variables(&self) -> Ref<'_, VariableStore> {
        self.inner.variables.borrow()
    }

    pub fn variables_mut(&self) -> RefMut<'_, VariableStore> {
        self.inner.variables.borrow_mut()
    }

    /// Value bound to `key`, if both exist.
    pub fn variable(&self, key: Option<&str>) -> Option<String> {
        let key = key?;
        self.inner.variables.borrow().get(key).map(str::to_string)
    }

    pub fn set_variable(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.variables.borrow_mut().set(key, value);
    }

    /// Store a value coming from untyped host data.
    pub fn set_variable_json(
        &self,
        key: &serde_json::Value,
        value: &serde_json::Value,
    ) -> Result<(), RuntimeError> {
        self.inner.variables.borrow_mut().set_json(key, value)?;
        Ok(())
    }

    /// Token tripped by the `stop` event. Hosts may cancel it directly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.borrow().clone()
    }

    /// Install a fresh token so a stopped runtime can execute again.
    pub fn reset_cancellation(&self) {
        *self.inner.token.borrow_mut() = CancellationToken::new();
    }

    pub fn emit(&self, event: &str, args: &[BoundInput]) -> usize {
        self.inner.bus.emit(event, args)
    }

    /// Run `chain` as a fresh body every time `event` fires.
    pub fn subscribe_body(&self, event: impl Into<String>, chain: Chain, label: impl Into<String>) {
        let weak = self.downgrade();
        let chain = Rc::new(chain);
        let label = label.into();

        self.inner.bus.subscribe(event, move |_| {
            if let Some(runtime) = Runtime::upgrade(&weak) {
                runtime.queue_body(chain.clone(), label.clone());
            }
            Ok(())
        });
    }

    fn queue_body(&self, chain: Rc<Chain>, label: String) {
        tracing::debug!("[RUNTIME] Queued body of '{}'", label);
        self.inner
            .pending
            .borrow_mut()
            .push_back(PendingBody { chain, label });
        self.inner.wake.notify_one();
    }

    fn take_pending(&self) -> Option<DeferredBody> {
        let pending = self.inner.pending.borrow_mut().pop_front()?;
        Some(DeferredBody::new(self.clone(), pending.chain, pending.label))
    }

    fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<RuntimeInner>) -> Option<Runtime> {
        weak.upgrade().map(|inner| Runtime { inner })
    }

    fn record_call(&self) {
        self.inner.calls.set(self.inner.calls.get() + 1);
    }

    fn record_failure(&self) {
        self.inner.failures.set(self.inner.failures.get() + 1);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("bus", &self.inner.bus)
            .field("variables", &self.inner.variables.borrow().len())
            .field("cancelled", &self.cancellation_token().is_cancelled())
            .finish()
    }
}
