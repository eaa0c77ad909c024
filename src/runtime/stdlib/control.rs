use super::{branch_body, Builtin, SegmentInputs};
use crate::codegen::CallNode;
use crate::error::RuntimeError;
use crate::runtime::Runtime;
use async_trait::async_trait;

/// Runs its body once when the condition holds.
pub struct If;

#[async_trait(?Send)]
impl Builtin for If {
    fn name(&self) -> &'static str {
        "if"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let inputs = SegmentInputs::resolve(self.name(), call, "if", 3)?;
        let Some(body) = branch_body(runtime, call, "if") else {
            tracing::debug!("[STD] if: no body");
            return Ok(());
        };

        if inputs.condition_holds(runtime) {
            body.invoke_isolated().await;
        }
        Ok(())
    }
}

/// Two conditions, each guarding its own body. Both are evaluated, so both bodies may run.
pub struct IfElse;

#[async_trait(?Send)]
impl Builtin for IfElse {
    fn name(&self) -> &'static str {
        "ifElse"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let first = SegmentInputs::resolve(self.name(), call, "if", 3)?;
        let second = SegmentInputs::resolve(self.name(), call, "elif", 3)?;

        for (segment_name, inputs) in [("if", first), ("elif", second)] {
            let Some(body) = branch_body(runtime, call, segment_name) else {
                continue;
            };
            if inputs.condition_holds(runtime) {
                body.invoke_isolated().await;
            }
        }
        Ok(())
    }
}

/// Re-checks its condition before every pass. Exits when the condition fails or on stop.
pub struct While;

#[async_trait(?Send)]
impl Builtin for While {
    fn name(&self) -> &'static str {
        "while"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let inputs = SegmentInputs::resolve(self.name(), call, "while", 3)?;
        let Some(body) = branch_body(runtime, call, "while") else {
            tracing::debug!("[STD] while: no body");
            return Ok(());
        };

        let mut passes = 0usize;
        while runtime.loop_pause().await && inputs.condition_holds(runtime) {
            body.invoke_isolated().await;
            passes += 1;
        }
        tracing::debug!("[STD] while: exited after {} passes", passes);
        Ok(())
    }
}

/// Runs its body until stop.
pub struct Forever;

#[async_trait(?Send)]
impl Builtin for Forever {
    fn name(&self) -> &'static str {
        "forever"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let Some(body) = branch_body(runtime, call, "forever") else {
            tracing::debug!("[STD] forever: no body");
            return Ok(());
        };

        while runtime.loop_pause().await {
            body.invoke_isolated().await;
        }
        tracing::info!("[STD] forever: stopping");
        Ok(())
    }
}

impl Runtime {
    /// Suspend before a loop iteration. Returns false once the program has been stopped.
    pub(crate) async fn loop_pause(&self) -> bool {
        let token = self.cancellation_token();
        if token.is_cancelled() {
            return false;
        }

        let interval = self.config().loop_interval();
        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        !token.is_cancelled()
    }
}
