use super::{Builtin, SegmentInputs};
use crate::codegen::CallNode;
use crate::error::RuntimeError;
use crate::runtime::Runtime;
use async_trait::async_trait;

/// Copies the value bound to `data` into the key bound to `variable`.
pub struct SetVariableTo;

#[async_trait(?Send)]
impl Builtin for SetVariableTo {
    fn name(&self) -> &'static str {
        "setVariableTo"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let inputs = SegmentInputs::resolve(self.name(), call, "setVariableTo", 2)?;
        let target = inputs
            .key("variable")
            .ok_or_else(|| RuntimeError::InvalidInputs {
                function: self.name().to_string(),
                reason: "no variable bound to write".to_string(),
            })?;

        let Some(value) = runtime.variable(inputs.key("data")) else {
            tracing::info!("[STD] setVariableTo: no value to copy into '{}'", target);
            return Ok(());
        };

        tracing::debug!("[STD] setVariableTo: {} = {}", target, value);
        runtime.set_variable(target, value);
        Ok(())
    }
}

pub struct LogVariable;

#[async_trait(?Send)]
impl Builtin for LogVariable {
    fn name(&self) -> &'static str {
        "logVariable"
    }

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError> {
        let inputs = SegmentInputs::resolve(self.name(), call, "logVariable", 1)?;
        let key = inputs.key("var");
        match runtime.variable(key) {
            Some(value) => tracing::info!("[STD] {} = {}", key.unwrap_or_default(), value),
            None => tracing::info!("[STD] {} is not set", key.unwrap_or("<unbound>")),
        }
        Ok(())
    }
}
