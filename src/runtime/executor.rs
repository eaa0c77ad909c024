use super::{Runtime, START_EVENT};
use crate::codegen::{CallNode, Chain, Program};
use crate::error::RuntimeError;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::rc::Rc;
use std::time::Duration;

/// Counters for one [`Runtime::execute`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Standard library calls made.
    pub calls: usize,
    /// Bodies that ended with an error.
    pub failed_bodies: usize,
}

/// A nested chain handed to a standard library call, run on demand.
#[derive(Clone)]
pub struct DeferredBody {
    runtime: Runtime,
    chain: Rc<Chain>,
    label: String,
}

impl DeferredBody {
    pub(crate) fn new(runtime: Runtime, chain: Rc<Chain>, label: String) -> Self {
        Self {
            runtime,
            chain,
            label,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn invoke(&self) -> Result<(), RuntimeError> {
        self.runtime.run_chain(&self.chain).await
    }

    /// Run the body, logging and counting an error instead of returning it.
    pub async fn invoke_isolated(&self) -> bool {
        match self.invoke().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[RUNTIME] Body of '{}' failed: {}", self.label, e);
                self.runtime.record_failure();
                false
            }
        }
    }
}

impl std::fmt::Debug for DeferredBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredBody")
            .field("label", &self.label)
            .field("calls", &self.chain.len())
            .finish()
    }
}

impl Runtime {
    /// Run every entry chain, fire `start`, then drive subscriber bodies until none are left.
    ///
    /// Errors never escape: a failing entry chain or body is logged and counted in the summary.
    pub async fn execute(&self, program: &Program) -> ExecutionSummary {
        let calls_before = self.inner.calls.get();
        let failures_before = self.inner.failures.get();

        tracing::info!("[RUNTIME] Executing program with {} entry chains", program.entries.len());

        // Phase 1: Registration
        for chain in &program.entries {
            if let Err(e) = self.run_chain(chain).await {
                tracing::warn!("[RUNTIME] Entry chain failed: {}", e);
                self.record_failure();
            }
        }

        // Phase 2: Start
        let started = self.emit(START_EVENT, &[]);
        tracing::info!("[RUNTIME] Started {} agents", started);

        // Phase 3: Drive bodies
        self.drive().await;

        let summary = ExecutionSummary {
            calls: self.inner.calls.get() - calls_before,
            failed_bodies: self.inner.failures.get() - failures_before,
        };
        tracing::info!(
            "[RUNTIME] Execution finished ({} calls, {} failed bodies)",
            summary.calls,
            summary.failed_bodies
        );
        summary
    }

    /// Like [`execute`](Self::execute), but cancels the program if it is still running after
    /// `limit`.
    pub async fn execute_for(&self, program: &Program, limit: Duration) -> ExecutionSummary {
        let token = self.cancellation_token();
        let execution = self.execute(program);
        let deadline = async {
            tokio::time::sleep(limit).await;
            tracing::info!("[RUNTIME] Time limit of {:?} reached", limit);
            token.cancel();
        };

        tokio::pin!(execution);
        tokio::select! {
            summary = &mut execution => summary,
            _ = deadline => execution.await,
        }
    }

    async fn drive(&self) {
        let mut running: FuturesUnordered<LocalBoxFuture<'static, ()>> = FuturesUnordered::new();

        loop {
            while let Some(body) = self.take_pending() {
                running.push(
                    async move {
                        body.invoke_isolated().await;
                    }
                    .boxed_local(),
                );
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                _ = running.next() => {}
                _ = self.inner.wake.notified() => {}
            }
        }
    }

    /// Run each call of `chain` in order. The first failing call ends the chain.
    pub fn run_chain<'a>(
        &'a self,
        chain: &'a Chain,
    ) -> LocalBoxFuture<'a, Result<(), RuntimeError>> {
        async move {
            for call in &chain.calls {
                self.run_call(call).await?;
            }
            Ok(())
        }
        .boxed_local()
    }

    async fn run_call(&self, call: &CallNode) -> Result<(), RuntimeError> {
        let function = self
            .inner
            .library
            .get(&call.target)
            .ok_or_else(|| RuntimeError::UnknownFunction(call.target.clone()))?;

        tracing::debug!("[RUNTIME] Calling '{}' for block {}", call.target, call.block);
        self.record_call();
        function.call(self, call).await
    }

    /// Wrap a nested chain of the current call as a deferred body.
    pub fn body(&self, chain: &Chain, label: impl Into<String>) -> DeferredBody {
        DeferredBody::new(self.clone(), Rc::new(chain.clone()), label.into())
    }
}
