//! # Standard Library
//!
//! One [`Builtin`] per block name. Each resolves its bound inputs through the variable store and,
//! for control blocks, decides whether to run its deferred bodies.

mod control;
mod messaging;
mod variables;

pub use control::{Forever, If, IfElse, While};
pub use messaging::{Broadcast, EndAgent, OnMessage, StartAgent};
pub use variables::{LogVariable, SetVariableTo};

use super::{eval_statement, DeferredBody, Runtime};
use crate::codegen::{BoundInput, CallNode};
use crate::error::RuntimeError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::rc::Rc;

#[async_trait(?Send)]
pub trait Builtin {
    /// Block name this function answers to.
    fn name(&self) -> &'static str;

    async fn call(&self, runtime: &Runtime, call: &CallNode) -> Result<(), RuntimeError>;
}

/// Registry of builtins keyed by block name.
#[derive(Clone)]
pub struct StandardLibrary {
    functions: HashMap<String, Rc<dyn Builtin>>,
}

impl StandardLibrary {
    /// Library with a function for every block in the default catalog.
    pub fn new() -> Self {
        let mut library = Self::empty();
        library.register(StartAgent);
        library.register(EndAgent);
        library.register(Broadcast);
        library.register(OnMessage);
        library.register(SetVariableTo);
        library.register(LogVariable);
        library.register(While);
        library.register(Forever);
        library.register(IfElse);
        library.register(If);
        library
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Add or replace a function.
    pub fn register(&mut self, function: impl Builtin + 'static) {
        self.functions
            .insert(function.name().to_string(), Rc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Builtin>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for StandardLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StandardLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("StandardLibrary").field("functions", &names).finish()
    }
}

/// The bound inputs of one segment, looked up by internal name.
#[derive(Debug, Clone, Copy)]
pub struct SegmentInputs<'c> {
    inputs: &'c [BoundInput],
}

impl<'c> SegmentInputs<'c> {
    /// Inputs of the segment `segment_name`, which must declare exactly `expected` of them.
    pub fn resolve(
        function: &str,
        call: &'c CallNode,
        segment_name: &str,
        expected: usize,
    ) -> Result<Self, RuntimeError> {
        let inputs = call
            .segment_inputs(segment_name)
            .ok_or_else(|| RuntimeError::InvalidInputs {
                function: function.to_string(),
                reason: format!("no inputs for segment '{}'", segment_name),
            })?;

        if inputs.len() != expected {
            return Err(RuntimeError::InvalidInputs {
                function: function.to_string(),
                reason: format!(
                    "segment '{}' has {} inputs, expected {}",
                    segment_name,
                    inputs.len(),
                    expected
                ),
            });
        }
        Ok(Self { inputs })
    }

    pub fn input(&self, internal_name: &str) -> Option<&'c BoundInput> {
        self.inputs
            .iter()
            .find(|input| input.internal_name == internal_name)
    }

    /// Variable store key bound to `internal_name`.
    pub fn key(&self, internal_name: &str) -> Option<&'c str> {
        self.input(internal_name)?.key.as_deref()
    }

    pub fn as_slice(&self) -> &'c [BoundInput] {
        self.inputs
    }

    /// Evaluate the `varA eval varB` condition these inputs describe.
    pub fn condition_holds(&self, runtime: &Runtime) -> bool {
        eval_statement(
            runtime.variable(self.key("varA")).as_deref(),
            runtime.variable(self.key("varB")).as_deref(),
            runtime.variable(self.key("eval")).as_deref(),
        )
    }
}

/// Deferred body of the branch hanging from segment `segment_name`.
pub(crate) fn branch_body(
    runtime: &Runtime,
    call: &CallNode,
    segment_name: &str,
) -> Option<DeferredBody> {
    call.branch(segment_name)
        .map(|branch| runtime.body(&branch.body, format!("{}.{}", call.target, segment_name)))
}
