//! The embedding API: parse, compile and run scripts against a persistent realm.

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info_span};

use crate::parser::ast::ProgramData;
use crate::parser::{JsParser, Rule};
use crate::runner::compiler::{compile_program, CompileOptions, CompiledProgram};
use crate::runner::config::EngineConfig;
use crate::runner::ds::error::{CompileError, JErrorType};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::register_builtins;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Parse error: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    #[error("SyntaxError: {0}")]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] JErrorType),
}

impl From<pest::error::Error<Rule>> for EngineError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        EngineError::Parse(Box::new(e))
    }
}

/// A realm with the built-ins installed plus the options scripts are compiled with.
/// Globals persist across `eval` and `run` calls.
pub struct Engine {
    realm: Rc<Realm>,
    options: CompileOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let realm = Realm::new(config.max_call_depth);
        register_builtins(&realm);
        Engine {
            realm,
            options: config.compile_options(),
        }
    }

    pub fn realm(&self) -> &Rc<Realm> {
        &self.realm
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, program: &ProgramData) -> Result<CompiledProgram, EngineError> {
        Ok(compile_program(program, &self.options)?)
    }

    /// Runs a compiled program, yielding the value of its last expression statement.
    pub fn run(&self, program: &CompiledProgram) -> Result<JsValue, EngineError> {
        Ok(program.code.run_program(&self.realm)?)
    }

    pub fn eval(&self, source: &str) -> Result<JsValue, EngineError> {
        let _span = info_span!("eval", bytes = source.len()).entered();
        let program = JsParser::parse_to_ast_from_str(source)?;
        let compiled = self.compile(&program)?;
        let result = self.run(&compiled);
        debug!(ok = result.is_ok(), "eval finished");
        result
    }

    /// Reads a global binding, `None` when it does not exist.
    pub fn global(&self, name: &str) -> Option<JsValue> {
        self.realm.get_global(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_survive_between_evals() {
        let engine = Engine::new();
        engine.eval("var counter = 1;").unwrap();
        engine.eval("counter += 2;").unwrap();
        assert_eq!(engine.global("counter"), Some(JsValue::Number(3.0)));
    }

    #[test]
    fn each_stage_reports_its_own_error() {
        let engine = Engine::new();
        assert!(matches!(engine.eval("var = ;"), Err(EngineError::Parse(_))));
        assert!(matches!(
            engine.eval("return 1;"),
            Err(EngineError::Compile(CompileError::IllegalReturn))
        ));
        assert!(matches!(
            engine.eval("missing;"),
            Err(EngineError::Runtime(JErrorType::ReferenceError(_)))
        ));
    }

    #[test]
    fn strict_config_applies_to_every_script() {
        let config = EngineConfig {
            strict: true,
            ..EngineConfig::default()
        };
        let engine = Engine::with_config(&config);
        assert!(matches!(
            engine.eval("with ({}) {}"),
            Err(EngineError::Compile(CompileError::WithInStrictMode))
        ));
    }
}
