use super::{Builtin, SegmentInputs};
use crate::codegen::CallNode;
use crate::error::RuntimeError;
use crate::runtime::{Runtime, START_EVENT, STOP_EVENT};
use async_trait::async_trait;

/// Emits the channel named by its bound variable.
pub struct Broadcast;

#[async_trait(?Send)]
impl Builtin for Broadcast {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let inputs = SegmentInputs::resolve(self.name(), call, "broadcast", 1)?;
        let Some(channel) = runtime.variable(inputs.key("channel")) else {
            tracing::info!("[STD] broadcast: channel variable not set");
            return Ok(());
        };

        let delivered = runtime.emit(&channel, inputs.as_slice());
        tracing::info!("[STD] broadcast: '{}' reached {} listeners", channel, delivered);
        Ok(())
    }
}

/// Runs its scope every time the channel named by its bound variable is broadcast.
pub struct OnMessage;

#[async_trait(?Send)]
impl Builtin for OnMessage {
    fn name(&self) -> &'static str {
        "onMessage"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let inputs = SegmentInputs::resolve(self.name(), call, "onMessage", 1)?;
        let Some(channel) = runtime.variable(inputs.key("channel")) else {
            tracing::info!("[STD] onMessage: channel variable not set");
            return Ok(());
        };
        let Some(scope) = &call.scope else {
            tracing::debug!("[STD] onMessage: no body for '{}'", channel);
            return Ok(());
        };

        tracing::info!("[STD] onMessage: listening on '{}'", channel);
        runtime.subscribe_body(channel, scope.clone(), self.name());
        Ok(())
    }
}

/// Runs its scope when the program starts.
pub struct StartAgent;

#[async_trait(?Send)]
impl Builtin for StartAgent {
    fn name(&self) -> &'static str {
        "startAgent"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let Some(scope) = &call.scope else {
            tracing::info!("[STD] startAgent: no body to execute");
            return Ok(());
        };

        runtime.subscribe_body(START_EVENT, scope.clone(), self.name());
        Ok(())
    }
}

/// Stops the program.
pub struct EndAgent;

#[async_trait(?Send)]
impl Builtin for EndAgent {
    fn name(&self) -> &'static str {
        "endAgent"
    }

    async fn call(&self, runtime: &Runtime, _call: &CallNode) -> Result<(), RuntimeError> {
        runtime.emit(STOP_EVENT, &[]);
        Ok(())
    }
}
