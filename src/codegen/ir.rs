//! # Program IR
//!
//! The compiled form of a block chain: a tree of calls, each naming a standard library
//! function, carrying its resolved input bindings and the deferred bodies of its nested scopes.

use crate::graph::BlockId;
use crate::metadata::{InputMode, InputType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An input as the runtime sees it: which variable store key to read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundInput {
    pub id: String,
    pub name: String,
    pub internal_name: String,
    pub input_type: InputType,
    pub mode: InputMode,
    pub key: Option<String>,
    pub segment_name: String,
}

/// A nested scope body, run on demand by the call that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub segment_name: String,
    pub body: Chain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNode {
    /// Standard library function, i.e. the block name.
    pub target: String,
    pub block: BlockId,
    /// Bound inputs keyed by owning segment id.
    pub inputs: BTreeMap<String, Vec<BoundInput>>,
    /// Nested scope bodies keyed by the segment id of their notch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub branches: BTreeMap<String, Branch>,
    /// Sole body of a force-scope block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Chain>,
}

impl CallNode {
    /// Inputs of the segment called `segment_name`.
    pub fn segment_inputs(&self, segment_name: &str) -> Option<&[BoundInput]> {
        self.inputs
            .values()
            .find(|inputs| inputs.first().is_some_and(|input| input.segment_name == segment_name))
            .map(Vec::as_slice)
    }

    pub fn branch(&self, segment_name: &str) -> Option<&Branch> {
        self.branches
            .values()
            .find(|branch| branch.segment_name == segment_name)
    }
}

/// Statements run one after another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub calls: Vec<CallNode>,
}

impl Chain {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}

/// Every entry chain of a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub entries: Vec<Chain>,
}

impl Program {
    pub fn single(chain: Chain) -> Self {
        Self {
            entries: vec![chain],
        }
    }

    /// Pretty-printed program text.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

const INDENT: &str = "    ";

fn write_chain(f: &mut fmt::Formatter<'_>, chain: &Chain, depth: usize) -> fmt::Result {
    for call in &chain.calls {
        write_call(f, call, depth)?;
    }
    Ok(())
}

fn write_call(f: &mut fmt::Formatter<'_>, call: &CallNode, depth: usize) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    write!(f, "{}{}(", indent, call.target)?;

    let mut first = true;
    for (segment_id, inputs) in &call.inputs {
        if !first {
            write!(f, "; ")?;
        }
        first = false;
        write!(f, "{}:", segment_id)?;
        for input in inputs {
            write!(
                f,
                " {}={}",
                input.internal_name,
                input.key.as_deref().unwrap_or("_")
            )?;
        }
    }
    write!(f, ")")?;

    if call.branches.is_empty() && call.scope.is_none() {
        return writeln!(f);
    }

    writeln!(f, " {{")?;
    for (segment_id, branch) in &call.branches {
        writeln!(f, "{}{}[{}] => {{", indent, INDENT, segment_id)?;
        write_chain(f, &branch.body, depth + 2)?;
        writeln!(f, "{}{}}}", indent, INDENT)?;
    }
    if let Some(scope) = &call.scope {
        write_chain(f, scope, depth + 1)?;
    }
    writeln!(f, "{}}}", indent)
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, self, 0)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, chain) in self.entries.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write_chain(f, chain, 0)?;
        }
        Ok(())
    }
}
