//! Lowering of the analyzed AST into trees of Rust closures.
//!
//! Every function body becomes a [`CompiledFunction`]: a prologue that wires up
//! closure records, the arguments object and hoisted declarations, and a body made
//! of nested closures specialized on the static types the analysis inferred.

pub mod code;
mod expression;
pub mod function;
pub mod operators;
pub mod scope;
mod statement;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::parser::ast::{FunctionBodyData, FunctionData, ProgramData, PROGRAM_FUNCTION_ID};
use crate::runner::analysis::closure::ARGUMENTS_FIELD;
use crate::runner::analysis::{analyze, Analysis, AnalysisOptions};
use crate::runner::compiler::code::{Code, TypedCode};
use crate::runner::compiler::function::CompiledFunction;
use crate::runner::compiler::scope::FunctionScope;
use crate::runner::ds::error::CompileError;
use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Compile every function as strict code.
    pub strict: bool,
    /// Use the inferred value types to keep locals unboxed.
    pub specialize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            strict: false,
            specialize: true,
        }
    }
}

impl From<&CompileOptions> for AnalysisOptions {
    fn from(o: &CompileOptions) -> Self {
        AnalysisOptions {
            strict: o.strict,
            specialize: o.specialize,
        }
    }
}

/// A compiled script, ready to run against any realm.
#[derive(Debug)]
pub struct CompiledProgram {
    pub code: Rc<CompiledFunction>,
    pub analysis: Analysis,
}

pub fn compile_program(
    program: &ProgramData,
    options: &CompileOptions,
) -> Result<CompiledProgram, CompileError> {
    let analysis = analyze(program, &options.into())?;
    let code = {
        let _span = debug_span!("lower").entered();
        FunctionCompiler::new(&analysis, PROGRAM_FUNCTION_ID, true).compile_program(program)?
    };
    debug!(
        variables = analysis.variables.len(),
        closures = analysis.closures.len(),
        "program compiled"
    );
    Ok(CompiledProgram { code, analysis })
}

pub(crate) struct FunctionCompiler<'a> {
    analysis: &'a Analysis,
    scope: FunctionScope<'a>,
}

fn sequence(steps: Vec<Code<()>>) -> Code<()> {
    Box::new(move |a| {
        for step in &steps {
            step(a)?;
        }
        Ok(())
    })
}

impl<'a> FunctionCompiler<'a> {
    fn new(analysis: &'a Analysis, function_id: usize, is_program: bool) -> Self {
        FunctionCompiler {
            analysis,
            scope: FunctionScope::new(analysis, function_id, is_program),
        }
    }

    fn compile_program(mut self, program: &ProgramData) -> Result<Rc<CompiledFunction>, CompileError> {
        let body = self.compile_statements(&program.body.statements)?;
        let prologue = self.compile_prologue(&program.body, None)?;
        Ok(Rc::new(CompiledFunction {
            name: String::new(),
            function_id: PROGRAM_FUNCTION_ID,
            param_count: 0,
            strict: self.scope.strict,
            is_program: true,
            layout: self.scope.layout(),
            prologue,
            body,
        }))
    }

    pub(crate) fn compile_function(
        analysis: &'a Analysis,
        f: &FunctionData,
    ) -> Result<Rc<CompiledFunction>, CompileError> {
        let _span = debug_span!("function", name = f.name(), id = f.function_id).entered();
        let mut compiler = FunctionCompiler::new(analysis, f.function_id, false);
        let body = compiler.compile_statements(&f.body.statements)?;
        let prologue = compiler.compile_prologue(&f.body, Some(f))?;
        let layout = compiler.scope.layout();
        debug!(?layout, "function lowered");
        Ok(Rc::new(CompiledFunction {
            name: f.name().to_string(),
            function_id: f.function_id,
            param_count: f.params.len(),
            strict: compiler.scope.strict,
            is_program: false,
            layout,
            prologue,
            body,
        }))
    }

    /// Built after the body so every slot and closure alias it needs is known.
    fn compile_prologue(
        &mut self,
        body: &FunctionBodyData,
        function: Option<&FunctionData>,
    ) -> Result<Code<()>, CompileError> {
        let analysis = self.analysis;
        let block = analysis.block(self.scope.function_id);
        let strict = self.scope.strict;
        let mut steps: Vec<Code<()>> = vec![];

        if let Some(closure) = block.closure {
            if let Some(field) = analysis.closure(closure).field_index(ARGUMENTS_FIELD) {
                steps.push(Box::new(move |a| {
                    if let Some(own) = &a.own_closure {
                        own.set(field, a.arguments.clone());
                    }
                    Ok(())
                }));
            }
        }
        if let Some(arguments) = block.arguments {
            if let Some(slot) = self.scope.allocated_slot(arguments) {
                steps.push(Box::new(move |a| {
                    a.values[slot.index] = a.arguments.clone();
                    Ok(())
                }));
            }
        }
        if let Some(self_binding) = block.self_binding {
            let callee = TypedCode::Boxed(Box::new(|a| {
                Ok(a.callee.clone().map(JsValue::Object).unwrap_or(JsValue::Undefined))
            }));
            let access = self.scope.access(self_binding)?.into_initializer();
            steps.push(access.store(callee, strict)?.into_effect());
        }
        if function.is_none() {
            let mut names: Vec<Rc<str>> = body
                .declared_variables
                .iter()
                .map(|n| Rc::from(n.as_str()))
                .collect();
            names.extend(body.hoisted_functions.iter().map(|f| Rc::from(f.name())));
            steps.push(Box::new(move |a| {
                for name in &names {
                    if !a.realm.has_global(name) {
                        a.realm.put_global(name, JsValue::Undefined)?;
                    }
                }
                Ok(())
            }));
        }
        for f in &body.hoisted_functions {
            let id = match &f.id {
                Some(id) => id,
                None => continue,
            };
            let code = FunctionCompiler::compile_function(analysis, f)?;
            let access = self.scope.access(analysis.reference(id)?)?;
            let instantiate = TypedCode::Boxed(Box::new(move |a| {
                let scope = a.head_closure();
                Ok(JsValue::Object(a.realm.new_script_function(code.clone(), scope)))
            }));
            steps.push(access.store(instantiate, strict)?.into_effect());
        }

        // Aliases last: every step above may have asked for one.
        let aliases = self.scope.aliases().to_vec();
        if !aliases.is_empty() {
            steps.insert(
                0,
                Box::new(move |a| {
                    let head = a.head_closure();
                    for (hops, alias) in &aliases {
                        a.closures[*alias] = head.as_ref().and_then(|h| h.ancestor(*hops));
                    }
                    Ok(())
                }),
            );
        }
        Ok(sequence(steps))
    }
}
