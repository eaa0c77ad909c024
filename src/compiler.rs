//! # Block Compiler
//!
//! Main entry points for compiling block graphs to program IR.

use crate::codegen::{ChainCodeGenerator, Program};
use crate::error::CodegenError;
use crate::graph::{BlockId, Graph};

/// Compile the chain rooted at `root` and render it as program text.
///
/// This is the editor-facing entry point: the text is the pretty-printed IR, which
/// [`Program::from_text`] turns back into a runnable [`Program`].
///
/// # Examples
///
/// ```rust,no_run
/// use blockflow::{generate_program, BlockMetadataProvider, Graph, Point};
///
/// let mut graph = Graph::new(BlockMetadataProvider::new());
/// let root = graph.insert_block("startAgent", Point::new(0.0, 0.0))?;
/// let text = generate_program(&graph, &root)?;
/// println!("{}", text);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn generate_program(graph: &Graph, root: &BlockId) -> Result<String, CodegenError> {
    let program = compile_chain(graph, root)?;
    Ok(program.to_text()?)
}

/// Compile the chain rooted at `root` into a single-entry program.
pub fn compile_chain(graph: &Graph, root: &BlockId) -> Result<Program, CodegenError> {
    tracing::info!("[COMPILER] Compiling chain from block {}", root);

    let mut generator = ChainCodeGenerator::new(graph);
    let chain = generator.generate_chain(root)?;

    tracing::info!("[COMPILER] Generated {} top-level calls", chain.len());
    Ok(Program::single(chain))
}

/// Compile every entry chain of the graph into one program.
///
/// Entry chains are root blocks whose definition is an entry point (`startAgent`, `onMessage`).
/// Chains are compiled in block id order.
pub fn compile_graph(graph: &Graph) -> Result<Program, CodegenError> {
    tracing::info!("[COMPILER] Starting graph compilation");
    tracing::info!("[COMPILER] Graph: {} blocks", graph.len());

    // Phase 1: Find entry blocks
    tracing::info!("[COMPILER] Phase 1: Finding entry blocks...");
    let entries: Vec<BlockId> = graph
        .roots()
        .into_iter()
        .filter(|block| block.definition.is_entry)
        .map(|block| block.id.clone())
        .collect();

    if entries.is_empty() {
        return Err(CodegenError::NoEntryBlocks);
    }
    tracing::info!("[COMPILER] Found {} entry blocks", entries.len());

    // Phase 2: Generate chains
    tracing::info!("[COMPILER] Phase 2: Generating chains...");
    let mut generator = ChainCodeGenerator::new(graph);
    let mut program = Program::default();
    for entry in &entries {
        let chain = generator.generate_chain(entry)?;
        tracing::debug!("[COMPILER]   - entry {}: {} calls", entry, chain.len());
        program.entries.push(chain);
    }

    tracing::info!("[COMPILER] Compilation successful!");
    Ok(program)
}
