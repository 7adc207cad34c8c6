use tracing::debug;

use crate::parser::ast::FunctionId;
use crate::runner::analysis::variable::{Closure, ClosureField, ClosureId, VariableType};
use crate::runner::analysis::Analysis;

/// Name of the single field that stands for every captured parameter and for
/// `arguments` itself. Parameters are reached through the arguments object it holds.
pub const ARGUMENTS_FIELD: &str = "arguments";

/// Builds a closure layout for every block with captured variables, links each
/// layout to the nearest capturing ancestor and points captured variables at their
/// fields.
pub(crate) fn build_closures(analysis: &mut Analysis) {
    let pending: Vec<FunctionId> = analysis
        .blocks
        .iter()
        .filter(|b| !b.closed_over.is_empty())
        .map(|b| b.function_id)
        .collect();
    for block in pending {
        ensure_closure(analysis, block);
    }
    for fid in 0..analysis.blocks.len() {
        let parent_closure = nearest_capturing_ancestor(analysis, fid);
        analysis.blocks[fid].parent_closure = parent_closure;
    }
    fix_up_fields(analysis);
}

fn field_name(analysis: &Analysis, variable: usize) -> String {
    let v = &analysis.variables[variable];
    match v.var_type {
        VariableType::Parameter | VariableType::Arguments => ARGUMENTS_FIELD.to_string(),
        _ => v.storage_name.clone(),
    }
}

/// Walks up the lexical parents, building the first capturing ancestor's closure
/// first if needed.
fn nearest_capturing_ancestor(analysis: &mut Analysis, block: FunctionId) -> Option<ClosureId> {
    let mut parent = analysis.blocks[block].parent;
    while let Some(p) = parent {
        if let Some(c) = ensure_closure(analysis, p) {
            return Some(c);
        }
        parent = analysis.blocks[p].parent;
    }
    None
}

fn ensure_closure(analysis: &mut Analysis, block: FunctionId) -> Option<ClosureId> {
    if analysis.blocks[block].closed_over.is_empty() {
        return None;
    }
    if let Some(c) = analysis.blocks[block].closure {
        return Some(c);
    }
    let parent = nearest_capturing_ancestor(analysis, block);
    let fields = {
        let a: &Analysis = analysis;
        let mut fields: Vec<String> = a.blocks[block]
            .closed_over
            .iter()
            .map(|v| field_name(a, *v))
            .collect();
        fields.sort();
        fields.dedup();
        fields
    };

    let id = analysis.closures.len();
    debug!(
        closure = id,
        block,
        parent = ?parent,
        fields = ?fields,
        "closure layout built"
    );
    analysis.closures.push(Closure {
        id,
        block,
        parent,
        fields,
    });
    analysis.blocks[block].closure = Some(id);
    Some(id)
}

fn fix_up_fields(analysis: &mut Analysis) {
    for fid in 0..analysis.blocks.len() {
        let closure = match analysis.blocks[fid].closure {
            Some(c) => c,
            None => continue,
        };
        let captured = analysis.blocks[fid].closed_over.clone();
        for v in captured {
            let name = field_name(analysis, v);
            if let Some(index) = analysis.closures[closure].field_index(&name) {
                analysis.variables[v].closure_field = Some(ClosureField { closure, index });
            }
        }
    }
}
