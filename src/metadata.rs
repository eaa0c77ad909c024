//! # Block Metadata
//!
//! Static block definitions and the default catalog. A definition is immutable once a block
//! has been created from it; the graph copies it into the block.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structural role of a segment inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Header,
    Divider,
    Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    Variable,
    EvalOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    Read,
    Write,
}

/// An input slot declared by a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDeclaration {
    pub id: String,
    /// Name the standard library looks the input up by.
    pub internal_name: String,
    /// Label shown on the block.
    pub name: String,
    pub input_type: InputType,
    pub mode: InputMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDefinition {
    pub id: String,
    pub name: String,
    pub kind: SegmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub notch: bool,
    #[serde(default)]
    pub divot: bool,
    #[serde(default)]
    pub inputs: Vec<InputDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfiguration {
    pub color: String,
    /// The block's primary continuation becomes its single body instead of a sibling statement.
    #[serde(default)]
    pub force_scope: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    pub name: String,
    #[serde(default)]
    pub is_entry: bool,
    pub segments: Vec<SegmentDefinition>,
    pub configuration: BlockConfiguration,
}

impl BlockDefinition {
    pub fn segment(&self, id: &str) -> Option<&SegmentDefinition> {
        self.segments.iter().find(|segment| segment.id == id)
    }
}

mod colors {
    pub const FLOW_CONTROL: &str = "#FFFFAA";
    pub const LOOPS: &str = "#8be0ff";
    pub const VARIABLE: &str = "#8bffb9";
    pub const MESSAGE: &str = "#ffc396";
    pub const START: &str = "#CBFF8B";
    pub const END: &str = "#FF8B8B";
}

/// Registry of block definitions, keyed by block name.
#[derive(Debug, Clone)]
pub struct BlockMetadataProvider {
    definitions: BTreeMap<String, BlockDefinition>,
}

impl BlockMetadataProvider {
    /// Provider preloaded with the default catalog.
    pub fn new() -> Self {
        let mut provider = Self::empty();
        for definition in default_catalog() {
            provider.register(definition);
        }
        provider
    }

    pub fn empty() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }

    /// Add or replace a definition.
    pub fn register(&mut self, definition: BlockDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get_block_definition(&self, name: &str) -> Option<&BlockDefinition> {
        self.definitions.get(name)
    }

    /// Every definition, in name order. Editors build their block palette from this.
    pub fn definitions(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.definitions.values()
    }
}

impl Default for BlockMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct SegmentBuilder {
    segment: SegmentDefinition,
}

fn segment(block: &str, name: &str, kind: SegmentKind) -> SegmentBuilder {
    SegmentBuilder {
        segment: SegmentDefinition {
            id: format!("{}.{}", block, name),
            name: name.to_string(),
            kind,
            text: None,
            notch: false,
            divot: false,
            inputs: Vec::new(),
        },
    }
}

impl SegmentBuilder {
    fn text(mut self, text: &str) -> Self {
        self.segment.text = Some(text.to_string());
        self
    }

    fn notch(mut self) -> Self {
        self.segment.notch = true;
        self
    }

    fn divot(mut self) -> Self {
        self.segment.divot = true;
        self
    }

    fn input(
        mut self,
        internal_name: &str,
        name: &str,
        input_type: InputType,
        mode: InputMode,
    ) -> Self {
        self.segment.inputs.push(InputDeclaration {
            id: format!("{}.{}", self.segment.id, internal_name),
            internal_name: internal_name.to_string(),
            name: name.to_string(),
            input_type,
            mode,
        });
        self
    }

    fn condition(self) -> Self {
        self.input("varA", "Variable A", InputType::Variable, InputMode::Read)
            .input("eval", "Eval", InputType::EvalOperator, InputMode::Read)
            .input("varB", "Variable B", InputType::Variable, InputMode::Read)
    }

    fn build(self) -> SegmentDefinition {
        self.segment
    }
}

fn definition(name: &str, color: &str, segments: Vec<SegmentDefinition>) -> BlockDefinition {
    BlockDefinition {
        name: name.to_string(),
        is_entry: false,
        segments,
        configuration: BlockConfiguration {
            color: color.to_string(),
            force_scope: false,
        },
    }
}

fn entry(mut definition: BlockDefinition) -> BlockDefinition {
    definition.is_entry = true;
    definition.configuration.force_scope = true;
    definition
}

/// The blocks every editor starts with.
pub fn default_catalog() -> Vec<BlockDefinition> {
    use SegmentKind::*;

    vec![
        entry(definition(
            "startAgent",
            colors::START,
            vec![segment("startAgent", "startAgent", Header)
                .text("Agent Initiated")
                .notch()
                .build()],
        )),
        definition(
            "endAgent",
            colors::END,
            vec![segment("endAgent", "endAgent", Header)
                .text("Agent Terminated")
                .divot()
                .build()],
        ),
        definition(
            "broadcast",
            colors::MESSAGE,
            vec![segment("broadcast", "broadcast", Header)
                .text("Broadcast")
                .notch()
                .divot()
                .input("channel", "Message", InputType::Variable, InputMode::Read)
                .build()],
        ),
        entry(definition(
            "onMessage",
            colors::MESSAGE,
            vec![segment("onMessage", "onMessage", Header)
                .text("On Message")
                .notch()
                .input("channel", "Message", InputType::Variable, InputMode::Read)
                .build()],
        )),
        definition(
            "setVariableTo",
            colors::VARIABLE,
            vec![segment("setVariableTo", "setVariableTo", Header)
                .text("Set Variable")
                .notch()
                .divot()
                .input("data", "Data", InputType::Variable, InputMode::Read)
                .input("variable", "Variable", InputType::Variable, InputMode::Write)
                .build()],
        ),
        definition(
            "logVariable",
            colors::VARIABLE,
            vec![segment("logVariable", "logVariable", Header)
                .text("Log Variable")
                .notch()
                .divot()
                .input("var", "Variable", InputType::Variable, InputMode::Read)
                .build()],
        ),
        definition(
            "while",
            colors::LOOPS,
            vec![
                segment("while", "while", Header).text("While").notch().divot().condition().build(),
                segment("while", "while-footer", Footer).notch().build(),
            ],
        ),
        definition(
            "forever",
            colors::LOOPS,
            vec![
                segment("forever", "forever", Header).text("Forever").notch().divot().build(),
                segment("forever", "forever-footer", Footer).build(),
            ],
        ),
        definition(
            "ifElse",
            colors::FLOW_CONTROL,
            vec![
                segment("ifElse", "if", Header).text("If").notch().divot().condition().build(),
                segment("ifElse", "elif", Divider).text("Else If").notch().condition().build(),
                segment("ifElse", "if-footer", Footer).notch().build(),
            ],
        ),
        definition(
            "if",
            colors::FLOW_CONTROL,
            vec![
                segment("if", "if", Header).text("If").notch().divot().condition().build(),
                segment("if", "if-footer", Footer).notch().build(),
            ],
        ),
    ]
}
