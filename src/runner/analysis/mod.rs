//! Static analysis that runs between parsing and code generation.
//!
//! Three passes fill one [`Analysis`] arena:
//!
//! 1. the variable marker classifies every identifier occurrence and records which
//!    bindings nested functions capture,
//! 2. the closure builder lays out one closure record per capturing body,
//! 3. the type marker infers value types so uncaptured locals can live unboxed.

pub mod closure;
pub mod marker;
pub mod type_marker;
pub mod variable;

use std::collections::HashMap;

use tracing::debug_span;

use crate::parser::ast::{FunctionId, IdentifierData, NodeId, ProgramData};
use crate::runner::analysis::marker::VariableMarker;
use crate::runner::analysis::variable::{
    BlockInfo, Closure, ClosureId, Variable, VariableId, VariableType,
};
use crate::runner::ds::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Treat every body as strict code.
    pub strict: bool,
    /// Infer value types. Off means every variable is boxed.
    pub specialize: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            strict: false,
            specialize: true,
        }
    }
}

#[derive(Debug)]
pub struct Analysis {
    pub variables: Vec<Variable>,
    /// Indexed by `FunctionId`.
    pub blocks: Vec<BlockInfo>,
    pub closures: Vec<Closure>,
    /// Identifier occurrence to the variable it denotes.
    pub references: HashMap<NodeId, VariableId>,
    /// `with` statement to the synthetic local holding its target object.
    pub with_variables: HashMap<NodeId, VariableId>,
    pub this_variable: VariableId,
}

impl Analysis {
    pub fn new(function_count: usize) -> Self {
        let function_count = function_count.max(1);
        Analysis {
            variables: vec![Variable::new("this", VariableType::This, 0)],
            blocks: (0..function_count).map(BlockInfo::new).collect(),
            closures: vec![],
            references: HashMap::new(),
            with_variables: HashMap::new(),
            this_variable: 0,
        }
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn block(&self, id: FunctionId) -> &BlockInfo {
        &self.blocks[id]
    }

    pub fn closure(&self, id: ClosureId) -> &Closure {
        &self.closures[id]
    }

    pub fn reference(&self, identifier: &IdentifierData) -> Result<VariableId, CompileError> {
        self.references
            .get(&identifier.id)
            .copied()
            .ok_or_else(|| CompileError::UnresolvedIdentifier(identifier.name.clone()))
    }

    pub fn with_variable(&self, id: NodeId) -> Result<VariableId, CompileError> {
        self.with_variables
            .get(&id)
            .copied()
            .ok_or_else(|| CompileError::UnresolvedIdentifier(format!("%with@{}", id)))
    }

    /// Names of the variables of `block` that nested functions capture, sorted.
    pub fn captured_names(&self, block: FunctionId) -> Vec<String> {
        let mut names: Vec<String> = self.blocks[block]
            .closed_over
            .iter()
            .map(|v| self.variables[*v].name.clone())
            .collect();
        names.sort();
        names
    }

    /// First variable named `name` declared directly in `block`.
    pub fn find_declared(&self, block: FunctionId, name: &str) -> Option<&Variable> {
        self.blocks[block]
            .declared
            .get(name)
            .map(|v| &self.variables[v])
    }
}

/// Runs every analysis pass over a parsed program.
pub fn analyze(program: &ProgramData, options: &AnalysisOptions) -> Result<Analysis, CompileError> {
    let mut analysis = Analysis::new(program.function_count);
    {
        let _span = debug_span!("mark_variables").entered();
        VariableMarker::new(&mut analysis, options.strict).mark_program(program)?;
    }
    {
        let _span = debug_span!("build_closures").entered();
        closure::build_closures(&mut analysis);
    }
    {
        let _span = debug_span!("mark_types", specialize = options.specialize).entered();
        if options.specialize {
            type_marker::mark_types(&mut analysis, program);
        } else {
            type_marker::mark_all_unknown(&mut analysis);
        }
    }
    Ok(analysis)
}
